//! Scratch space for multipart uploads that have been received but not yet
//! accepted into the library.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory holding in-flight uploads under random names.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

/// An uploaded file sitting in the staging area.
///
/// Whoever consumes it is responsible for calling [`StagedUpload::discard`].
#[derive(Debug)]
pub struct StagedUpload {
    pub path: PathBuf,
    /// File name as sent by the client.
    pub original_name: String,
}

impl StagingArea {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, std::io::Error> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh path for an upload. Nothing is written yet.
    pub fn allocate(&self, original_name: &str) -> StagedUpload {
        StagedUpload {
            path: self.dir.join(format!("upload-{}", uuid::Uuid::new_v4())),
            original_name: original_name.to_string(),
        }
    }

    /// Stage an upload from in-memory content.
    pub async fn stage_bytes(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StagedUpload, std::io::Error> {
        let staged = self.allocate(original_name);
        tokio::fs::write(&staged.path, data).await?;
        Ok(staged)
    }
}

impl StagedUpload {
    /// Extension of the client-side file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
    }

    /// Client-side file name with any directory part dropped.
    pub fn file_name(&self) -> &str {
        self.original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.original_name)
    }

    pub async fn read(&self) -> Result<bytes::Bytes, std::io::Error> {
        Ok(bytes::Bytes::from(tokio::fs::read(&self.path).await?))
    }

    /// Remove the staged file. Best-effort: failures are logged, never returned.
    pub async fn discard(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}
