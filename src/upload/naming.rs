//! Destination filename resolution
//!
//! The stored name is the client's original filename, unchanged. Two uploads
//! with the same name overwrite each other (last write wins).

use thiserror::Error;

use super::FilePart;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("file part under field '{0}' has no usable filename")]
    MissingMetadata(String),
}

/// Resolve the on-disk filename for a part
pub fn resolve_name(part: &FilePart) -> Result<String, NamingError> {
    match part.original_name() {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(NamingError::MissingMetadata(part.field_name().to_string())),
    }
}
