//! multipart/form-data transport
//!
//! Turns a request body stream into [`FilePart`]s. A segment counts as a file
//! when it carries a `filename` parameter or its own `Content-Type`; plain form
//! fields are skipped. Any failure here rejects the whole request before the
//! intake pipeline runs.

use bytes::Bytes;
use futures::Stream;
use hyper::header::CONTENT_TYPE;
use thiserror::Error;

use super::{FilePart, DEFAULT_CONTENT_TYPE};

/// Transport-level errors for a whole request
#[derive(Error, Debug)]
pub enum MultipartError {
    #[error("Content-Type is not multipart/form-data")]
    NotFormData,

    #[error("multipart boundary not found in Content-Type")]
    BoundaryNotFound,

    #[error("Size limit exceeded: {0}")]
    SizeLimitExceeded(String),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Malformed multipart body: {0}")]
    Malformed(String),
}

impl From<multer::Error> for MultipartError {
    fn from(err: multer::Error) -> Self {
        match &err {
            multer::Error::NoMultipart | multer::Error::DecodeContentType(_) => {
                MultipartError::NotFormData
            }
            multer::Error::NoBoundary => MultipartError::BoundaryNotFound,
            multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
                MultipartError::SizeLimitExceeded(err.to_string())
            }
            multer::Error::StreamReadFailed(_) => MultipartError::BodyRead(err.to_string()),
            _ => MultipartError::Malformed(err.to_string()),
        }
    }
}

/// Byte limits applied while reading a request
#[derive(Debug, Clone, Copy)]
pub struct MultipartLimits {
    pub max_file_bytes: u64,
    pub max_request_bytes: u64,
}

impl MultipartLimits {
    fn constraints(&self) -> multer::Constraints {
        multer::Constraints::new().size_limit(
            multer::SizeLimit::new()
                .whole_stream(self.max_request_bytes)
                .per_field(self.max_file_bytes),
        )
    }
}

/// Read every file segment of a multipart body, in submission order
pub async fn read_file_parts<S, O, E>(
    content_type: Option<&str>,
    body: S,
    limits: MultipartLimits,
) -> Result<Vec<FilePart>, MultipartError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = content_type.ok_or(MultipartError::NotFormData)?;
    let boundary = multer::parse_boundary(content_type)?;
    let mut multipart = multer::Multipart::with_constraints(body, boundary, limits.constraints());

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        // Keep the declared type verbatim; the parsed Mime is normalized
        let declared_type = field
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        if file_name.is_none() && declared_type.is_none() {
            tracing::debug!(field = %field_name, "Skipping non-file form field");
            continue;
        }

        let payload = field.bytes().await?;
        tracing::debug!(
            field = %field_name,
            filename = ?file_name,
            bytes = payload.len(),
            "Read file part"
        );

        parts.push(FilePart::new(
            field_name,
            file_name,
            declared_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            payload,
        ));
    }

    Ok(parts)
}
