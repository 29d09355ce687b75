//! Upload route table
//!
//! Maps request paths to the intake mode and media type policy of each
//! upload endpoint. All upload routes accept `POST` with a
//! `multipart/form-data` body.

use hyper::Method;
use thiserror::Error;

use crate::upload::intake::{IntakeMode, MimePolicy};

/// Router errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouterError {
    #[error("No upload route for path: {0}")]
    NotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },
}

/// One upload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRoute {
    pub path: &'static str,
    pub mode: IntakeMode,
    pub policy: MimePolicy,
}

impl UploadRoute {
    pub fn method(&self) -> Method {
        Method::POST
    }

    /// Short description used in the startup route listing
    pub fn describe(&self) -> String {
        let mode = match self.mode {
            IntakeMode::Single { field } => format!("single field '{}'", field),
            IntakeMode::Batch => "batch, any field".to_string(),
        };
        let policy = match self.policy {
            MimePolicy::Any => "any media type",
            MimePolicy::AllowListed => "allow-listed media types",
        };
        format!("{} {} ({}, {})", self.method(), self.path, mode, policy)
    }
}

pub static UPLOAD_ROUTES: [UploadRoute; 4] = [
    UploadRoute {
        path: "/uploadFile",
        mode: IntakeMode::Single {
            field: "file_to_upload",
        },
        policy: MimePolicy::Any,
    },
    UploadRoute {
        path: "/uploadImage",
        mode: IntakeMode::Single {
            field: "image_to_upload",
        },
        policy: MimePolicy::AllowListed,
    },
    UploadRoute {
        path: "/uploadSeveralFiles",
        mode: IntakeMode::Batch,
        policy: MimePolicy::Any,
    },
    UploadRoute {
        path: "/uploadSeveralImages",
        mode: IntakeMode::Batch,
        policy: MimePolicy::AllowListed,
    },
];

/// Registered upload routes, for diagnostics
pub fn routes() -> &'static [UploadRoute] {
    &UPLOAD_ROUTES
}

/// Resolve an upload route by method and path
pub fn resolve(method: &Method, path: &str) -> Result<&'static UploadRoute, RouterError> {
    let route = UPLOAD_ROUTES
        .iter()
        .find(|route| route.path == path)
        .ok_or_else(|| RouterError::NotFound(path.to_string()))?;

    if *method != route.method() {
        return Err(RouterError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
        });
    }

    Ok(route)
}
