use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::DatabaseError;

/// Name of the shared counter file inside the managed directory.
pub const COUNTS_FILE_NAME: &str = "downloadCounts.json";

/// Artifact file name -> number of downloads.
pub type DownloadCounts = HashMap<String, u64>;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Download counts keyed by artifact file name. Missing keys count as zero.
#[async_trait]
pub trait DownloadCounter: Send + Sync {
    async fn count(&self, artifact_file: &str) -> Result<u64, CounterError>;
    /// Add one download and return the new count.
    async fn increment(&self, artifact_file: &str) -> Result<u64, CounterError>;
    /// Move a count to a new key. A missing source is a no-op.
    async fn rename(&self, old_file: &str, new_file: &str) -> Result<(), CounterError>;
    async fn forget(&self, artifact_file: &str) -> Result<(), CounterError>;
    async fn snapshot(&self) -> Result<DownloadCounts, CounterError>;
    /// Drop every count. Returns how many keys were dropped.
    async fn clear(&self) -> Result<u64, CounterError>;
}

/// Counts kept in a single JSON object file, read and rewritten whole on
/// every mutation.
///
/// There is no locking: two increments that interleave between load and
/// store lose one of the updates, even when they touch different keys.
/// Counts not touched by either writer are never lost.
pub struct JsonFileCounter {
    path: PathBuf,
}

impl JsonFileCounter {
    pub fn new<P: AsRef<Path>>(files_dir: P) -> Self {
        Self {
            path: files_dir.as_ref().join(COUNTS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole mapping. A missing or malformed file reads as empty.
    pub async fn load(&self) -> Result<DownloadCounts, CounterError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DownloadCounts::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&data) {
            Ok(counts) => Ok(counts),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable download counts");
                Ok(DownloadCounts::new())
            }
        }
    }

    /// Replace the whole mapping on disk.
    ///
    /// The new mapping is written to a sibling file and renamed over the old
    /// one, so a concurrent `load` sees either the previous or the next
    /// complete file, never a truncated one.
    pub async fn store(&self, counts: &DownloadCounts) -> Result<(), CounterError> {
        let data = serde_json::to_vec_pretty(counts)?;
        let tmp_path = self
            .path
            .with_file_name(format!(".{COUNTS_FILE_NAME}.{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp_path, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                tracing::warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove temporary counts file");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl DownloadCounter for JsonFileCounter {
    async fn count(&self, artifact_file: &str) -> Result<u64, CounterError> {
        Ok(self.load().await?.get(artifact_file).copied().unwrap_or(0))
    }

    async fn increment(&self, artifact_file: &str) -> Result<u64, CounterError> {
        let mut counts = self.load().await?;
        let count = counts.entry(artifact_file.to_string()).or_insert(0);
        *count += 1;
        let new_count = *count;
        self.store(&counts).await?;
        Ok(new_count)
    }

    async fn rename(&self, old_file: &str, new_file: &str) -> Result<(), CounterError> {
        if old_file == new_file {
            return Ok(());
        }
        let mut counts = self.load().await?;
        if let Some(count) = counts.remove(old_file) {
            counts.insert(new_file.to_string(), count);
            self.store(&counts).await?;
        }
        Ok(())
    }

    async fn forget(&self, artifact_file: &str) -> Result<(), CounterError> {
        let mut counts = self.load().await?;
        if counts.remove(artifact_file).is_some() {
            self.store(&counts).await?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<DownloadCounts, CounterError> {
        self.load().await
    }

    async fn clear(&self) -> Result<u64, CounterError> {
        let dropped = self.load().await?.len() as u64;
        self.store(&DownloadCounts::new()).await?;
        Ok(dropped)
    }
}
