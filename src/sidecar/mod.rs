//! Side-car metadata stored next to each artifact.
//!
//! Layout, keyed by artifact base name:
//! - `<files_dir>/<base>_title.txt`
//! - `<files_dir>/<base>_description.txt`
//! - `<preview_dir>/<base>.<ext>` for one of [`PREVIEW_EXTENSIONS`]
//!
//! Download counts live in one shared mapping behind [`DownloadCounter`],
//! keyed by artifact file name rather than base name.

mod counter;

pub use counter::{CounterError, DownloadCounter, DownloadCounts, JsonFileCounter, COUNTS_FILE_NAME};

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::paths::resolve_within;

/// Preview image extensions, in lookup order. The first existing one wins.
pub const PREVIEW_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid sidecar path: {0}")]
    InvalidPath(String),
    #[error("Unsupported preview image type: {0}")]
    UnsupportedImage(String),
    #[error(transparent)]
    Counter(#[from] CounterError),
}

/// The metadata of one artifact. Every field is independently present or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    /// File name of the preview image inside the preview directory.
    pub preview: Option<String>,
}

enum TextSidecar {
    Title,
    Description,
}

impl TextSidecar {
    fn file_name(&self, base_name: &str) -> String {
        match self {
            TextSidecar::Title => format!("{base_name}_title.txt"),
            TextSidecar::Description => format!("{base_name}_description.txt"),
        }
    }
}

/// Normalize an image extension (leading dot and case are ignored) and check
/// it against [`PREVIEW_EXTENSIONS`].
pub fn preview_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    PREVIEW_EXTENSIONS.iter().copied().find(|known| *known == ext)
}

pub struct SidecarStore {
    files_dir: PathBuf,
    preview_dir: PathBuf,
    counter: Arc<dyn DownloadCounter>,
}

impl SidecarStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        files_dir: P,
        preview_dir: Q,
        counter: Arc<dyn DownloadCounter>,
    ) -> Result<Self, std::io::Error> {
        let files_dir = files_dir.as_ref().to_path_buf();
        let preview_dir = preview_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&files_dir)?;
        std::fs::create_dir_all(&preview_dir)?;
        Ok(Self {
            files_dir,
            preview_dir,
            counter,
        })
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    fn text_path(&self, kind: &TextSidecar, base_name: &str) -> Result<PathBuf, SidecarError> {
        let name = kind.file_name(base_name);
        resolve_within(&self.files_dir, &name).ok_or(SidecarError::InvalidPath(name))
    }

    fn preview_path(&self, base_name: &str, ext: &str) -> Result<PathBuf, SidecarError> {
        let name = format!("{base_name}.{ext}");
        resolve_within(&self.preview_dir, &name).ok_or(SidecarError::InvalidPath(name))
    }

    async fn write_text(
        &self,
        kind: TextSidecar,
        base_name: &str,
        text: &str,
    ) -> Result<(), SidecarError> {
        let path = self.text_path(&kind, base_name)?;
        tokio::fs::write(&path, text).await?;
        Ok(())
    }

    async fn read_text(
        &self,
        kind: TextSidecar,
        base_name: &str,
    ) -> Result<Option<String>, SidecarError> {
        let path = self.text_path(&kind, base_name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write_title(&self, base_name: &str, text: &str) -> Result<(), SidecarError> {
        self.write_text(TextSidecar::Title, base_name, text).await
    }

    pub async fn read_title(&self, base_name: &str) -> Result<Option<String>, SidecarError> {
        self.read_text(TextSidecar::Title, base_name).await
    }

    pub async fn write_description(
        &self,
        base_name: &str,
        text: &str,
    ) -> Result<(), SidecarError> {
        self.write_text(TextSidecar::Description, base_name, text)
            .await
    }

    pub async fn read_description(
        &self,
        base_name: &str,
    ) -> Result<Option<String>, SidecarError> {
        self.read_text(TextSidecar::Description, base_name).await
    }

    /// Write a preview image as `<base>.<ext>`. Any preview stored under a
    /// different extension is left alone; see [`Self::remove_preview`].
    pub async fn write_preview(
        &self,
        base_name: &str,
        image: Bytes,
        ext: &str,
    ) -> Result<(), SidecarError> {
        let ext =
            preview_extension(ext).ok_or_else(|| SidecarError::UnsupportedImage(ext.to_string()))?;
        let path = self.preview_path(base_name, ext)?;
        tokio::fs::write(&path, &image).await?;
        Ok(())
    }

    /// Path of the preview image, trying each extension in order.
    pub async fn read_preview_path(
        &self,
        base_name: &str,
    ) -> Result<Option<PathBuf>, SidecarError> {
        for ext in PREVIEW_EXTENSIONS {
            let path = self.preview_path(base_name, ext)?;
            if tokio::fs::try_exists(&path).await? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Resolve a preview by its file name, as requested over HTTP.
    pub async fn preview_file(&self, file_name: &str) -> Result<Option<PathBuf>, SidecarError> {
        let has_known_ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(preview_extension)
            .is_some();
        if !has_known_ext {
            return Ok(None);
        }
        let path = resolve_within(&self.preview_dir, file_name)
            .ok_or_else(|| SidecarError::InvalidPath(file_name.to_string()))?;
        if tokio::fs::try_exists(&path).await? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Delete every preview stored for `base_name`, whatever its extension.
    pub async fn remove_preview(&self, base_name: &str) -> Result<(), SidecarError> {
        for ext in PREVIEW_EXTENSIONS {
            remove_if_present(&self.preview_path(base_name, ext)?).await?;
        }
        Ok(())
    }

    /// Read all side-cars of one artifact.
    pub async fn read_record(&self, base_name: &str) -> Result<MetadataRecord, SidecarError> {
        let preview = self.read_preview_path(base_name).await?.and_then(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_string())
        });
        Ok(MetadataRecord {
            title: self.read_title(base_name).await?,
            description: self.read_description(base_name).await?,
            preview,
        })
    }

    /// Move every existing side-car from `old_base` to `new_base`. Side-cars
    /// that do not exist are skipped.
    pub async fn rename_all(&self, old_base: &str, new_base: &str) -> Result<(), SidecarError> {
        if old_base == new_base {
            return Ok(());
        }

        for kind in [TextSidecar::Title, TextSidecar::Description] {
            let from = self.text_path(&kind, old_base)?;
            let to = self.text_path(&kind, new_base)?;
            rename_if_present(&from, &to).await?;
        }

        for ext in PREVIEW_EXTENSIONS {
            let from = self.preview_path(old_base, ext)?;
            let to = self.preview_path(new_base, ext)?;
            rename_if_present(&from, &to).await?;
        }

        tracing::debug!(old_base = %old_base, new_base = %new_base, "Renamed sidecars");
        Ok(())
    }

    /// Delete every side-car of `base_name`. Idempotent.
    pub async fn remove_all(&self, base_name: &str) -> Result<(), SidecarError> {
        for kind in [TextSidecar::Title, TextSidecar::Description] {
            remove_if_present(&self.text_path(&kind, base_name)?).await?;
        }
        self.remove_preview(base_name).await
    }

    pub async fn read_download_count(&self, artifact_file: &str) -> Result<u64, SidecarError> {
        Ok(self.counter.count(artifact_file).await?)
    }

    pub async fn increment_download_count(
        &self,
        artifact_file: &str,
    ) -> Result<u64, SidecarError> {
        Ok(self.counter.increment(artifact_file).await?)
    }

    /// All counts at once, for building listings.
    pub async fn download_counts(&self) -> Result<DownloadCounts, SidecarError> {
        Ok(self.counter.snapshot().await?)
    }

    pub async fn rename_download_count(
        &self,
        old_file: &str,
        new_file: &str,
    ) -> Result<(), SidecarError> {
        Ok(self.counter.rename(old_file, new_file).await?)
    }

    pub async fn forget_download_count(&self, artifact_file: &str) -> Result<(), SidecarError> {
        Ok(self.counter.forget(artifact_file).await?)
    }

    pub async fn clear_download_counts(&self) -> Result<u64, SidecarError> {
        Ok(self.counter.clear().await?)
    }
}

async fn rename_if_present(from: &Path, to: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn remove_if_present(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
