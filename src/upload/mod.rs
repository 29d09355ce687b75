//! Upload module
//!
//! The intake pipeline: multipart parsing, media type validation, naming,
//! durable storage and the per-part outcomes reported back to the client.

use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;

pub mod intake;
pub mod mime;
pub mod multipart;
pub mod naming;
pub mod report;
pub mod storage;

pub use intake::{IntakeMode, IntakeResult, UploadIntake};
pub use report::{ResponseReporter, UploadReport};
pub use storage::{DiskStorageWriter, StorageError, StorageWriter};

/// Media type assumed for file segments that do not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One file-bearing segment of a multipart request.
///
/// Built by the transport once a segment is fully read; immutable afterwards.
#[derive(Debug, Clone)]
pub struct FilePart {
    field_name: String,
    original_name: Option<String>,
    content_type: String,
    payload: Bytes,
}

impl FilePart {
    pub fn new(
        field_name: impl Into<String>,
        original_name: Option<String>,
        content_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_name,
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// Form field the part arrived under
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Client-supplied filename, if the transport found one
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Declared media type, verbatim
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// A file part persisted under the destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub original_name: String,
    pub size: u64,
}

/// Why a part was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The expected form field was absent
    FieldMissing,
    /// Declared media type is not in the allow-list
    InvalidMimeType,
    /// The part carries no usable filename
    MissingMetadata,
    /// Persisting the bytes failed
    IoFailure,
    /// A single-file route received a part it does not take
    UnexpectedField,
}

impl FailureKind {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::FieldMissing => "field_missing",
            FailureKind::InvalidMimeType => "invalid_mime_type",
            FailureKind::MissingMetadata => "missing_metadata",
            FailureKind::IoFailure => "io_failure",
            FailureKind::UnexpectedField => "unexpected_field",
        }
    }
}

/// Failure detail for one part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeFailure {
    pub kind: FailureKind,
    pub reason: String,
    pub field: String,
}

impl IntakeFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            field: field.into(),
        }
    }

    pub fn field_missing(field: &str) -> Self {
        Self::new(
            FailureKind::FieldMissing,
            format!("expected form field '{}' is missing", field),
            field,
        )
    }

    pub fn invalid_mime_type(field: &str) -> Self {
        Self::new(FailureKind::InvalidMimeType, "invalid mime type", field)
    }

    pub fn missing_metadata(field: &str) -> Self {
        Self::new(
            FailureKind::MissingMetadata,
            "empty/corrupt/invalid file",
            field,
        )
    }

    pub fn io_failure(field: &str, reason: impl Into<String>) -> Self {
        Self::new(FailureKind::IoFailure, reason, field)
    }

    /// `field` is where the extra part arrived, `expected` the route's only field
    pub fn unexpected_field(field: &str, expected: &str) -> Self {
        Self::new(
            FailureKind::UnexpectedField,
            format!("unexpected field '{}', only one '{}' file is accepted", field, expected),
            field,
        )
    }
}

/// Result of processing exactly one submitted part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Success(StoredFile),
    Failure(IntakeFailure),
}

impl IntakeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, IntakeOutcome::Failure(_))
    }
}
