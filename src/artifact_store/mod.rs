mod local;

pub use local::LocalArtifactStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Extension (without the dot) of every library artifact.
pub const ARTIFACT_EXTENSION: &str = "excalidrawlib";

#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("Artifact already exists: {0}")]
    NameCollision(String),
    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),
}

/// File name of the artifact with the given base name.
pub fn file_name(base_name: &str) -> String {
    format!("{base_name}.{ARTIFACT_EXTENSION}")
}

/// Base name of an artifact file name. `None` unless `name` ends in the
/// artifact extension and has something in front of it.
///
/// Exactly one extension is removed: `a.excalidrawlib.excalidrawlib` is the
/// file of artifact `a.excalidrawlib`.
pub fn strip_extension(name: &str) -> Option<&str> {
    name.strip_suffix(ARTIFACT_EXTENSION)?
        .strip_suffix('.')
        .filter(|base| !base.is_empty())
}

/// Whether `name` carries the artifact extension.
pub fn is_artifact_file(name: &str) -> bool {
    strip_extension(name).is_some()
}

/// Storage for library artifacts, keyed by base name.
///
/// Every operation is check-then-act against the backing store; nothing here
/// serializes concurrent callers.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a new artifact. Fails with `NameCollision` if one already exists.
    async fn put(&self, base_name: &str, data: Bytes) -> Result<(), ArtifactStoreError>;
    /// Replace (or create) the content of an artifact.
    async fn overwrite(&self, base_name: &str, data: Bytes) -> Result<(), ArtifactStoreError>;
    async fn get(&self, base_name: &str) -> Result<Bytes, ArtifactStoreError>;
    async fn rename(&self, old_base: &str, new_base: &str) -> Result<(), ArtifactStoreError>;
    /// Remove an artifact. Removing a missing artifact is a no-op.
    async fn remove(&self, base_name: &str) -> Result<(), ArtifactStoreError>;
    async fn exists(&self, base_name: &str) -> Result<bool, ArtifactStoreError>;
    /// Base names of all stored artifacts, in no particular order.
    async fn list_all(&self) -> Result<Vec<String>, ArtifactStoreError>;
    async fn modified_at(
        &self,
        base_name: &str,
    ) -> Result<Option<DateTime<Utc>>, ArtifactStoreError>;

    /// First free name among `base`, `base(1)`, `base(2)`, ...
    async fn free_name(&self, base_name: &str) -> Result<String, ArtifactStoreError> {
        if !self.exists(base_name).await? {
            return Ok(base_name.to_string());
        }
        let mut n: u32 = 1;
        loop {
            let candidate = format!("{base_name}({n})");
            if !self.exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Rename, picking a disambiguated target if `new_base` is already taken
    /// by a different artifact. Returns the name actually used.
    async fn rename_disambiguated(
        &self,
        old_base: &str,
        new_base: &str,
    ) -> Result<String, ArtifactStoreError> {
        if old_base == new_base {
            if !self.exists(old_base).await? {
                return Err(ArtifactStoreError::NotFound(old_base.to_string()));
            }
            return Ok(new_base.to_string());
        }
        let target = self.free_name(new_base).await?;
        self.rename(old_base, &target).await?;
        Ok(target)
    }
}
