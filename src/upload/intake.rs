//! Upload intake pipeline
//!
//! Runs each submitted [`FilePart`] through validation, naming and storage and
//! records exactly one [`IntakeOutcome`] per part. Per-part errors never
//! escape as `Err`; they become `Failure` outcomes.
//!
//! # Example
//!
//! ```no_run
//! use upload_intake::config::Config;
//! use upload_intake::upload::{FilePart, IntakeMode, UploadIntake};
//! use upload_intake::upload::intake::MimePolicy;
//!
//! # async fn example() {
//! let intake = UploadIntake::new(Config::default().intake_settings());
//! let part = FilePart::new("file_to_upload", Some("a.txt".into()), "text/plain", "hi");
//! let result = intake
//!     .run(IntakeMode::Single { field: "file_to_upload" }, MimePolicy::Any, vec![part])
//!     .await;
//! assert!(!result.has_failure());
//! # }
//! ```

use futures::StreamExt;
use std::sync::Arc;

use super::mime::MimeValidator;
use super::naming::{resolve_name, NamingError};
use super::storage::{DiskStorageWriter, StorageWriter};
use super::{FilePart, IntakeFailure, IntakeOutcome};
use crate::config::IntakeSettings;
use crate::metrics;

/// How many parts a request is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// Exactly one part, taken from the named form field
    Single { field: &'static str },
    /// Zero or more parts from any field, processed independently
    Batch,
}

/// Whether the declared media type is checked against the allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimePolicy {
    Any,
    AllowListed,
}

/// Outcomes of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeResult {
    /// Outcome for the designated field first, then one failure per extra part
    /// in submission order
    Single(Vec<IntakeOutcome>),
    /// One entry per submitted part, in submission order
    Batch(Vec<IntakeOutcome>),
}

impl IntakeResult {
    pub fn outcomes(&self) -> &[IntakeOutcome] {
        match self {
            IntakeResult::Single(outcomes) | IntakeResult::Batch(outcomes) => outcomes,
        }
    }

    pub fn has_failure(&self) -> bool {
        self.outcomes().iter().any(IntakeOutcome::is_failure)
    }
}

/// Validates, names and stores file parts
pub struct UploadIntake {
    settings: Arc<IntakeSettings>,
    validator: MimeValidator,
    writer: Arc<dyn StorageWriter>,
}

impl UploadIntake {
    /// Create an intake that stores to the local filesystem
    pub fn new(settings: Arc<IntakeSettings>) -> Self {
        let writer = Arc::new(DiskStorageWriter::new(settings.write_timeout));
        Self::with_writer(settings, writer)
    }

    /// Create an intake with a custom storage writer
    pub fn with_writer(settings: Arc<IntakeSettings>, writer: Arc<dyn StorageWriter>) -> Self {
        Self {
            validator: MimeValidator::new(settings.accepted_mime_types.clone()),
            settings,
            writer,
        }
    }

    pub fn settings(&self) -> &IntakeSettings {
        &self.settings
    }

    /// Process the parts of one request
    pub async fn run(
        &self,
        mode: IntakeMode,
        policy: MimePolicy,
        parts: Vec<FilePart>,
    ) -> IntakeResult {
        match mode {
            IntakeMode::Single { field } => {
                IntakeResult::Single(self.run_single(field, policy, parts).await)
            }
            IntakeMode::Batch => IntakeResult::Batch(self.run_batch(policy, parts).await),
        }
    }

    /// The first part under `field` is processed. Every other part is
    /// recorded as an `unexpected_field` failure without being stored.
    async fn run_single(
        &self,
        field: &str,
        policy: MimePolicy,
        parts: Vec<FilePart>,
    ) -> Vec<IntakeOutcome> {
        let designated = parts.iter().position(|p| p.field_name() == field);
        let mut primary = None;
        let mut unexpected = Vec::new();

        for (index, part) in parts.into_iter().enumerate() {
            if Some(index) == designated {
                primary = Some(self.process_part(part, policy).await);
            } else {
                unexpected.push(reject_unexpected(&part, field));
            }
        }

        let primary = primary.unwrap_or_else(|| {
            tracing::warn!(field = %field, "Expected file field is missing");
            let failure = IntakeFailure::field_missing(field);
            metrics::record_part_failure(failure.kind);
            IntakeOutcome::Failure(failure)
        });

        let mut outcomes = Vec::with_capacity(unexpected.len() + 1);
        outcomes.push(primary);
        outcomes.extend(unexpected);
        outcomes
    }

    async fn run_batch(&self, policy: MimePolicy, parts: Vec<FilePart>) -> Vec<IntakeOutcome> {
        // `buffered` keeps results in submission order
        futures::stream::iter(parts)
            .map(|part| self.process_part(part, policy))
            .buffered(self.settings.concurrent_writes.max(1))
            .collect()
            .await
    }

    /// Validate, name and store one part
    #[tracing::instrument(
        name = "intake.part",
        skip(self, part),
        fields(
            upload.field = %part.field_name(),
            upload.filename = ?part.original_name(),
            upload.content_type = %part.content_type(),
            upload.bytes = part.size()
        )
    )]
    pub async fn process_part(&self, part: FilePart, policy: MimePolicy) -> IntakeOutcome {
        let outcome = self.try_process_part(part, policy).await;

        match &outcome {
            IntakeOutcome::Success(stored) => {
                metrics::record_part_stored(stored.size);
                tracing::info!(path = %stored.path.display(), bytes = stored.size, "File part stored");
            }
            IntakeOutcome::Failure(failure) => {
                metrics::record_part_failure(failure.kind);
                tracing::warn!(
                    kind = failure.kind.as_str(),
                    reason = %failure.reason,
                    "File part rejected"
                );
            }
        }

        outcome
    }

    async fn try_process_part(&self, part: FilePart, policy: MimePolicy) -> IntakeOutcome {
        if policy == MimePolicy::AllowListed && !self.validator.is_accepted(&part) {
            return IntakeOutcome::Failure(IntakeFailure::invalid_mime_type(part.field_name()));
        }

        let filename = match resolve_name(&part) {
            Ok(name) => name,
            Err(NamingError::MissingMetadata(field)) => {
                return IntakeOutcome::Failure(IntakeFailure::missing_metadata(&field));
            }
        };

        match self
            .writer
            .store(&self.settings.destination_dir, &filename, part.payload().clone())
            .await
        {
            Ok(stored) => IntakeOutcome::Success(stored),
            Err(e) => IntakeOutcome::Failure(IntakeFailure::io_failure(
                part.field_name(),
                e.to_string(),
            )),
        }
    }
}

fn reject_unexpected(part: &FilePart, expected: &str) -> IntakeOutcome {
    let failure = IntakeFailure::unexpected_field(part.field_name(), expected);
    metrics::record_part_failure(failure.kind);
    tracing::warn!(
        field = %part.field_name(),
        filename = ?part.original_name(),
        expected = %expected,
        "Rejected extra part on single-file route"
    );
    IntakeOutcome::Failure(failure)
}
