//! Declared media type allow-list
//!
//! Membership is an exact, case-sensitive string comparison against the
//! type the client declared. Payload bytes are never sniffed, so a mislabeled
//! file is accepted.

use std::collections::BTreeSet;

use super::FilePart;

/// Read-only set of accepted media type strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMimeSet {
    types: BTreeSet<String>,
}

impl AcceptedMimeSet {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, mime_type: &str) -> bool {
        self.types.contains(mime_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for AcceptedMimeSet {
    fn default() -> Self {
        Self::new([
            ::mime::IMAGE_JPEG.as_ref(),
            ::mime::IMAGE_PNG.as_ref(),
            ::mime::IMAGE_GIF.as_ref(),
            ::mime::TEXT_PLAIN.as_ref(),
        ])
    }
}

/// Checks a part's declared media type against the allow-list
#[derive(Debug, Clone)]
pub struct MimeValidator {
    accepted: AcceptedMimeSet,
}

impl MimeValidator {
    pub fn new(accepted: AcceptedMimeSet) -> Self {
        Self { accepted }
    }

    pub fn is_accepted(&self, part: &FilePart) -> bool {
        self.accepted.contains(part.content_type())
    }
}
