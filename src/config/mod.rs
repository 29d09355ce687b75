//! Configuration module for Upload Intake
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Every section has a default,
//! so a missing file section (or no file at all) yields a runnable service.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::upload::mime::AcceptedMimeSet;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

lazy_static::lazy_static! {
    static ref ENV_VAR_PATTERN: regex_lite::Regex =
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}")
            .expect("env var pattern is a valid regex");
}

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("MY_VAR", "value");
/// let result = expand_env_vars("prefix-${MY_VAR}-suffix");
/// assert_eq!(result, "prefix-value-suffix");
///
/// let result = expand_env_vars("${MISSING:-default}");
/// assert_eq!(result, "default");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in ENV_VAR_PATTERN.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.address.parse::<SocketAddr>().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid server address '{}': {}",
                self.server.address, e
            ))
        })?;

        if self.storage.destination_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.destination_dir cannot be empty".into(),
            ));
        }

        if self.storage.write_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "storage.write_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.upload.accepted_mime_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.accepted_mime_types must list at least one media type".into(),
            ));
        }

        for mime_type in &self.upload.accepted_mime_types {
            if !mime_type.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid media type '{}': expected 'type/subtype'",
                    mime_type
                )));
            }
        }

        if self.upload.concurrent_writes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.concurrent_writes must be at least 1".into(),
            ));
        }

        if self.upload.max_file_bytes > self.upload.max_request_bytes {
            return Err(ConfigError::ValidationError(format!(
                "upload.max_file_bytes ({}) exceeds upload.max_request_bytes ({})",
                self.upload.max_file_bytes, self.upload.max_request_bytes
            )));
        }

        if self.metrics.enabled {
            self.metrics.address.parse::<SocketAddr>().map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Invalid metrics address '{}': {}",
                    self.metrics.address, e
                ))
            })?;
        }

        Ok(())
    }

    /// Build the immutable settings shared by every intake operation
    pub fn intake_settings(&self) -> Arc<IntakeSettings> {
        Arc::new(IntakeSettings {
            destination_dir: PathBuf::from(&self.storage.destination_dir),
            accepted_mime_types: AcceptedMimeSet::new(
                self.upload.accepted_mime_types.iter().cloned(),
            ),
            write_timeout: Duration::from_secs(self.storage.write_timeout_secs),
            concurrent_writes: self.upload.concurrent_writes,
        })
    }
}

/// Process-wide intake settings, fixed at startup and never mutated.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub destination_dir: PathBuf,
    pub accepted_mime_types: AcceptedMimeSet,
    pub write_timeout: Duration,
    pub concurrent_writes: usize,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
        }
    }
}

fn default_server_address() -> String {
    "0.0.0.0:9021".to_string()
}

/// Destination directory configuration
///
/// ```yaml
/// storage:
///   destination_dir: "${UPLOAD_DIR:-/tmp/tmpmulter}"
///   create_if_missing: true
///   write_timeout_secs: 30
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_destination_dir")]
    pub destination_dir: String,
    /// Create the directory at startup when it does not exist. Default: true
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
    /// Upper bound for persisting one file part. Default: 30
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_destination_dir(),
            create_if_missing: default_create_if_missing(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

fn default_destination_dir() -> String {
    "/tmp/tmpmulter".to_string()
}

fn default_create_if_missing() -> bool {
    true
}

fn default_write_timeout() -> u64 {
    30
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Media types accepted by image-restricted routes (exact match)
    #[serde(default = "default_accepted_mime_types")]
    pub accepted_mime_types: Vec<String>,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
    /// Parts of one batch request persisted at the same time
    #[serde(default = "default_concurrent_writes")]
    pub concurrent_writes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accepted_mime_types: default_accepted_mime_types(),
            max_file_bytes: default_max_file_bytes(),
            max_request_bytes: default_max_request_bytes(),
            concurrent_writes: default_concurrent_writes(),
        }
    }
}

fn default_accepted_mime_types() -> Vec<String> {
    AcceptedMimeSet::default().iter().map(String::from).collect()
}

fn default_max_file_bytes() -> u64 {
    52428800 // 50MB
}

fn default_max_request_bytes() -> u64 {
    209715200 // 200MB
}

fn default_concurrent_writes() -> usize {
    4
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}
