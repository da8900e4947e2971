use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{file_name, strip_extension, ArtifactStore, ArtifactStoreError};
use crate::paths::resolve_within;

/// Artifacts stored as `<root>/<base name>.excalidrawlib`.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, base_name: &str) -> Result<PathBuf, ArtifactStoreError> {
        resolve_within(&self.root, &file_name(base_name))
            .ok_or_else(|| ArtifactStoreError::InvalidPath(base_name.to_string()))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, base_name: &str, data: Bytes) -> Result<(), ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ArtifactStoreError::NameCollision(base_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn overwrite(&self, base_name: &str, data: Bytes) -> Result<(), ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, base_name: &str) -> Result<Bytes, ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ArtifactStoreError::NotFound(base_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, old_base: &str, new_base: &str) -> Result<(), ArtifactStoreError> {
        let from = self.artifact_path(old_base)?;
        let to = self.artifact_path(new_base)?;

        if !tokio::fs::try_exists(&from).await? {
            return Err(ArtifactStoreError::NotFound(old_base.to_string()));
        }
        if from == to {
            return Ok(());
        }
        if tokio::fs::try_exists(&to).await? {
            return Err(ArtifactStoreError::NameCollision(new_base.to_string()));
        }

        tokio::fs::rename(&from, &to).await?;
        Ok(())
    }

    async fn remove(&self, base_name: &str) -> Result<(), ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, base_name: &str) -> Result<bool, ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn list_all(&self) -> Result<Vec<String>, ArtifactStoreError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Some(base_name) = strip_extension(&name) {
                names.push(base_name.to_string());
            }
        }
        Ok(names)
    }

    async fn modified_at(
        &self,
        base_name: &str,
    ) -> Result<Option<DateTime<Utc>>, ArtifactStoreError> {
        let path = self.artifact_path(base_name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.modified().ok().map(DateTime::<Utc>::from)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
