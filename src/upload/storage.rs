//! Durable storage of file parts
//!
//! Bytes are written to a hidden `.partial` file in the destination directory,
//! synced, then renamed over the final name. A reader never observes a
//! truncated file under the final name. If the write fails, times out or the
//! future is dropped (client gone), the partial file is removed on drop.
//! The write timeout does not cover the final rename.
//!
//! # Example
//!
//! ```no_run
//! use upload_intake::upload::storage::{DiskStorageWriter, StorageWriter};
//! use bytes::Bytes;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let writer = DiskStorageWriter::new(Duration::from_secs(30));
//! let stored = writer
//!     .store(Path::new("/tmp/tmpmulter"), "hello.txt", Bytes::from("Hello"))
//!     .await?;
//! println!("Stored at {}", stored.path.display());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::StoredFile;

/// Storage errors. All of them are reported to clients as an IO failure.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Rejected filename '{0}': must be a single plain path component")]
    UnsafeFilename(String),

    #[error("Write timed out after {0:?}")]
    Timeout(Duration),
}

/// Persists one part's bytes under a resolved name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageWriter: Send + Sync {
    /// Write `payload` to `destination_dir/filename`, replacing any existing file.
    ///
    /// The destination directory is assumed to exist and be writable.
    async fn store(
        &self,
        destination_dir: &Path,
        filename: &str,
        payload: Bytes,
    ) -> Result<StoredFile, StorageError>;
}

/// Local filesystem writer using write-then-rename
#[derive(Debug, Clone)]
pub struct DiskStorageWriter {
    write_timeout: Duration,
}

impl DiskStorageWriter {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }
}

#[async_trait]
impl StorageWriter for DiskStorageWriter {
    #[tracing::instrument(
        name = "storage.store",
        skip(self, payload),
        fields(
            storage.dir = %destination_dir.display(),
            storage.filename = %filename,
            storage.bytes = payload.len()
        ),
        err
    )]
    async fn store(
        &self,
        destination_dir: &Path,
        filename: &str,
        payload: Bytes,
    ) -> Result<StoredFile, StorageError> {
        check_filename(filename)?;

        let target = destination_dir.join(filename);
        let size = payload.len() as u64;

        // Fixed-length temp name so any name the directory accepts can be stored
        let partial =
            PartialFile::new(destination_dir.join(format!(".{}.partial", uuid::Uuid::new_v4())));
        let file = tokio::fs::File::create(partial.path()).await?;

        // Only the write is bounded; once the bytes are synced the rename runs to completion
        match tokio::time::timeout(self.write_timeout, write_and_sync(file, &payload)).await {
            Ok(result) => result?,
            Err(_) => return Err(StorageError::Timeout(self.write_timeout)),
        }
        partial.persist(&target).await?;

        tracing::debug!(path = %target.display(), bytes = size, "File stored");

        Ok(StoredFile {
            path: target,
            original_name: filename.to_string(),
            size,
        })
    }
}

/// Only a single normal component is allowed: no separators, `..`, `.` or roots.
fn check_filename(filename: &str) -> Result<(), StorageError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == OsStr::new(filename) => Ok(()),
        _ => Err(StorageError::UnsafeFilename(filename.to_string())),
    }
}

async fn write_and_sync(mut file: tokio::fs::File, payload: &[u8]) -> std::io::Result<()> {
    file.write_all(payload).await?;
    file.sync_all().await
}

/// Partially written file, removed on drop unless committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self) {
        self.committed = true;
    }

    /// Rename over `target`, replacing any existing file
    async fn persist(mut self, target: &Path) -> Result<(), StorageError> {
        tokio::fs::rename(&self.path, target).await?;
        self.commit();
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up partial file"
                );
            }
        }
    }
}
