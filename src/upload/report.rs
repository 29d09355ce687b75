//! JSON reports for upload routes
//!
//! [`ResponseReporter`] is the only writer of upload route response bodies.
//!
//! Wire shapes:
//!
//! ```text
//! {"error": false, "message": "File uploaded to /tmp/tmpmulter/cat.png"}
//! {"error": false, "filesUploaded": ["/tmp/tmpmulter/a.txt", ...]}
//! {"error": true, "error_object": {"kind": "invalid_mime_type", ...}}
//! {"error": true, "filesUploaded": [...], "error_object": {"total": 3, "failed": 1, "outcomes": [...]}}
//! {"error": true, "message": "File uploaded to ...", "error_object": {"total": 2, "failed": 1, "outcomes": [...]}}
//! ```

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::intake::IntakeResult;
use super::{IntakeFailure, IntakeOutcome, StoredFile};

/// Aggregate response for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "filesUploaded", skip_serializing_if = "Option::is_none")]
    pub files_uploaded: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_object: Option<ErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorObject {
    /// Single-file route failure
    Part(IntakeFailure),
    /// Batch route with at least one failed part
    Batch(BatchFailure),
    /// The request was rejected before intake
    Request(RequestFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub total: usize,
    pub failed: usize,
    pub outcomes: Vec<OutcomeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeEntry {
    Stored { path: String, size: u64 },
    Failed(IntakeFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestFailure {
    pub kind: &'static str,
    pub reason: String,
}

fn display_path(stored: &StoredFile) -> String {
    stored.path.display().to_string()
}

fn batch_failure(outcomes: &[IntakeOutcome]) -> BatchFailure {
    let entries: Vec<OutcomeEntry> = outcomes
        .iter()
        .map(|outcome| match outcome {
            IntakeOutcome::Success(stored) => OutcomeEntry::Stored {
                path: display_path(stored),
                size: stored.size,
            },
            IntakeOutcome::Failure(failure) => OutcomeEntry::Failed(failure.clone()),
        })
        .collect();

    BatchFailure {
        total: outcomes.len(),
        failed: outcomes.iter().filter(|o| o.is_failure()).count(),
        outcomes: entries,
    }
}

impl UploadReport {
    pub fn from_result(result: &IntakeResult) -> Self {
        match result {
            IntakeResult::Single(outcomes) => Self::from_single(outcomes),
            IntakeResult::Batch(outcomes) => Self::from_batch(outcomes),
        }
    }

    fn from_single(outcomes: &[IntakeOutcome]) -> Self {
        let message = match outcomes.first() {
            Some(IntakeOutcome::Success(stored)) => {
                Some(format!("File uploaded to {}", display_path(stored)))
            }
            _ => None,
        };

        match outcomes {
            [IntakeOutcome::Failure(failure)] => Self {
                error: true,
                message: None,
                files_uploaded: None,
                error_object: Some(ErrorObject::Part(failure.clone())),
            },
            [_] | [] => Self {
                error: false,
                message,
                files_uploaded: None,
                error_object: None,
            },
            // Extra parts were submitted; every one of them is listed
            _ => Self {
                error: true,
                message,
                files_uploaded: None,
                error_object: Some(ErrorObject::Batch(batch_failure(outcomes))),
            },
        }
    }

    fn from_batch(outcomes: &[IntakeOutcome]) -> Self {
        let files_uploaded: Vec<String> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                IntakeOutcome::Success(stored) => Some(display_path(stored)),
                IntakeOutcome::Failure(_) => None,
            })
            .collect();

        if files_uploaded.len() == outcomes.len() {
            return Self {
                error: false,
                message: None,
                files_uploaded: Some(files_uploaded),
                error_object: None,
            };
        }

        Self {
            error: true,
            message: None,
            files_uploaded: Some(files_uploaded),
            error_object: Some(ErrorObject::Batch(batch_failure(outcomes))),
        }
    }

    /// Report for a request that never reached intake
    pub fn request_rejected(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            error: true,
            message: None,
            files_uploaded: None,
            error_object: Some(ErrorObject::Request(RequestFailure {
                kind,
                reason: reason.into(),
            })),
        }
    }
}

/// Serializes reports into JSON HTTP responses
pub struct ResponseReporter;

impl ResponseReporter {
    const SERIALIZE_FAILURE: &'static str =
        r#"{"error":true,"error_object":{"kind":"internal","reason":"failed to serialize report"}}"#;

    pub fn respond(status: StatusCode, report: &UploadReport) -> Response<Full<Bytes>> {
        let (status, body) = match serde_json::to_vec(report) {
            Ok(body) => (status, Bytes::from(body)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize upload report");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(Self::SERIALIZE_FAILURE.as_bytes()),
                )
            }
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
