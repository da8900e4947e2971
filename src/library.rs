//! Multi-step library operations: upload, metadata edit, artifact
//! replacement, removal and download.
//!
//! Each operation validates as much as it can before touching the store.
//! Once a mutation has happened, later failures are reported to the caller
//! but earlier steps are not rolled back. Staged uploads handed to an
//! operation are always discarded before it returns.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::artifact_store::{self, ArtifactStore};
use crate::error::LibraryError;
use crate::sanitize::{sanitize_description, sanitize_title};
use crate::sidecar::{preview_extension, SidecarStore};
use crate::staging::StagedUpload;

/// Title used when an upload arrives without one.
pub const DEFAULT_TITLE: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_title_length: usize,
    pub max_description_length: usize,
    /// Reject uploads that come without a preview image.
    pub require_preview: bool,
}

#[derive(Debug, Default)]
pub struct UploadRequest {
    pub file: Option<StagedUpload>,
    pub image: Option<StagedUpload>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
pub struct EditRequest {
    pub title: String,
    pub description: String,
    pub image: Option<StagedUpload>,
}

#[derive(Debug)]
pub struct Download {
    pub file_name: String,
    pub data: Bytes,
}

pub struct Library {
    artifacts: Arc<dyn ArtifactStore>,
    sidecars: Arc<SidecarStore>,
    limits: Limits,
}

impl UploadRequest {
    async fn discard(&self) {
        for staged in [&self.file, &self.image].into_iter().flatten() {
            staged.discard().await;
        }
    }
}

impl Library {
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        sidecars: Arc<SidecarStore>,
        limits: Limits,
    ) -> Self {
        Self {
            artifacts,
            sidecars,
            limits,
        }
    }

    /// Accept a new artifact with its title, description and optional
    /// preview. Returns the base name it was stored under.
    pub async fn upload(&self, request: UploadRequest) -> Result<String, LibraryError> {
        let result = self.accept_upload(&request).await;
        request.discard().await;
        if let Err(ref e) = result {
            debug!(error = %e, "Upload rejected");
        }
        result
    }

    async fn accept_upload(&self, request: &UploadRequest) -> Result<String, LibraryError> {
        let file = request
            .file
            .as_ref()
            .ok_or_else(|| LibraryError::InvalidInput("No file uploaded".to_string()))?;
        if self.limits.require_preview && request.image.is_none() {
            return Err(LibraryError::InvalidInput(
                "Both file and preview image must be uploaded".to_string(),
            ));
        }
        if !artifact_store::is_artifact_file(file.file_name()) {
            return Err(LibraryError::InvalidInput(format!(
                "Only .{} files are allowed",
                artifact_store::ARTIFACT_EXTENSION
            )));
        }
        let image_ext = request.image.as_ref().map(image_extension).transpose()?;

        let content = file.read().await?;
        parse_json(&content)?;

        let raw_title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let title = sanitize_title(raw_title, self.limits.max_title_length)?;
        let description = sanitize_description(
            request.description.as_deref().unwrap_or(""),
            self.limits.max_description_length,
        )?;

        // Case-sensitive, and only as good as the moment it runs.
        if self.artifacts.exists(&title).await? {
            return Err(LibraryError::NameCollision(format!(
                "A template named \"{title}\" already exists"
            )));
        }

        self.artifacts.put(&title, content).await?;
        debug!(base_name = %title, "Stored artifact");

        self.sidecars.write_title(&title, &title).await?;
        if !description.is_empty() {
            self.sidecars.write_description(&title, &description).await?;
        }
        if let (Some(image), Some(ext)) = (&request.image, image_ext) {
            let data = image.read().await?;
            self.sidecars.write_preview(&title, data, ext).await?;
            debug!(base_name = %title, ext, "Stored preview");
        }

        info!(base_name = %title, "Uploaded template");
        Ok(title)
    }

    /// Overwrite title and description, and optionally the preview image, of
    /// an existing artifact. The artifact itself is not renamed.
    pub async fn edit_metadata(
        &self,
        base_name: &str,
        request: EditRequest,
    ) -> Result<(), LibraryError> {
        let result = self.apply_edit(base_name, &request).await;
        if let Some(image) = &request.image {
            image.discard().await;
        }
        result
    }

    async fn apply_edit(&self, base_name: &str, request: &EditRequest) -> Result<(), LibraryError> {
        if request.title.trim().is_empty() || request.description.trim().is_empty() {
            return Err(LibraryError::InvalidInput(
                "Title and description must not be empty".to_string(),
            ));
        }

        let title = sanitize_title(&request.title, self.limits.max_title_length)?;
        let description =
            sanitize_description(&request.description, self.limits.max_description_length)?;
        let image_ext = request.image.as_ref().map(image_extension).transpose()?;

        if !self.artifacts.exists(base_name).await? {
            return Err(LibraryError::NotFound(base_name.to_string()));
        }

        self.sidecars.write_title(base_name, &title).await?;
        self.sidecars
            .write_description(base_name, &description)
            .await?;

        if let (Some(image), Some(ext)) = (&request.image, image_ext) {
            let data = image.read().await?;
            self.sidecars.remove_preview(base_name).await?;
            self.sidecars.write_preview(base_name, data, ext).await?;
            debug!(base_name = %base_name, ext, "Replaced preview");
        }

        info!(base_name = %base_name, "Updated template metadata");
        Ok(())
    }

    /// Replace the content of an artifact with a newly uploaded library file.
    ///
    /// The new base name comes from the uploaded file's own name. If that
    /// name belongs to another artifact, a `(n)` suffix is appended; the
    /// side-cars and download count follow the artifact to its new name.
    /// Returns the base name the content ended up under.
    pub async fn replace_artifact(
        &self,
        base_name: &str,
        file: StagedUpload,
    ) -> Result<String, LibraryError> {
        let result = self.apply_replacement(base_name, &file).await;
        file.discard().await;
        result
    }

    async fn apply_replacement(
        &self,
        old_base: &str,
        file: &StagedUpload,
    ) -> Result<String, LibraryError> {
        let new_base = artifact_store::strip_extension(file.file_name()).ok_or_else(|| {
            LibraryError::InvalidInput(format!(
                "Only .{} files are allowed",
                artifact_store::ARTIFACT_EXTENSION
            ))
        })?;

        let content = file.read().await?;
        let document = parse_json(&content)?;
        if !document
            .get("libraryItems")
            .is_some_and(serde_json::Value::is_array)
        {
            return Err(LibraryError::ContentValidation(
                "expected a top-level libraryItems array".to_string(),
            ));
        }

        if !self.artifacts.exists(old_base).await? {
            return Err(LibraryError::NotFound(old_base.to_string()));
        }

        let target = self
            .artifacts
            .rename_disambiguated(old_base, new_base)
            .await?;

        if target != old_base {
            debug!(old_base = %old_base, new_base = %target, "Renamed artifact");
            self.sidecars.rename_all(old_base, &target).await?;
            self.sidecars
                .rename_download_count(
                    &artifact_store::file_name(old_base),
                    &artifact_store::file_name(&target),
                )
                .await?;
        }

        self.artifacts.overwrite(&target, content).await?;
        info!(base_name = %target, "Replaced library file");
        Ok(target)
    }

    /// Remove an artifact and everything stored alongside it. Components that
    /// are already gone are skipped, so removing an unknown name succeeds.
    pub async fn delete(&self, base_name: &str) -> Result<(), LibraryError> {
        self.remove_components(base_name).await
    }

    async fn remove_components(&self, base_name: &str) -> Result<(), LibraryError> {
        // Each component is attempted even if an earlier one failed.
        let artifact = self
            .artifacts
            .remove(base_name)
            .await
            .map_err(LibraryError::from);
        let sidecars = self
            .sidecars
            .remove_all(base_name)
            .await
            .map_err(LibraryError::from);
        let count = self
            .sidecars
            .forget_download_count(&artifact_store::file_name(base_name))
            .await
            .map_err(LibraryError::from);

        artifact.and(sidecars).and(count)?;
        info!(base_name = %base_name, "Removed template");
        Ok(())
    }

    /// Fetch an artifact by file name and count the download.
    pub async fn download(&self, file_name: &str) -> Result<Download, LibraryError> {
        let base_name = artifact_store::strip_extension(file_name)
            .ok_or_else(|| LibraryError::NotFound(file_name.to_string()))?;
        let data = self.artifacts.get(base_name).await?;

        match self.sidecars.increment_download_count(file_name).await {
            Ok(count) => debug!(file_name = %file_name, count, "Counted download"),
            Err(e) => warn!(file_name = %file_name, error = %e, "Failed to count download"),
        }

        Ok(Download {
            file_name: file_name.to_string(),
            data,
        })
    }

    /// Resolve a preview image file name to its on-disk path.
    pub async fn preview_file(&self, file_name: &str) -> Result<std::path::PathBuf, LibraryError> {
        self.sidecars
            .preview_file(file_name)
            .await?
            .ok_or_else(|| LibraryError::NotFound(file_name.to_string()))
    }

    /// Remove every artifact in the library, along with counts left behind
    /// by files removed out of band. Returns how many artifacts were removed.
    pub async fn purge(&self) -> Result<usize, LibraryError> {
        let base_names = self.artifacts.list_all().await?;
        for base_name in &base_names {
            self.remove_components(base_name).await?;
        }
        let orphaned = self.sidecars.clear_download_counts().await?;
        debug!(orphaned, "Cleared remaining download counts");
        Ok(base_names.len())
    }
}

fn parse_json(content: &[u8]) -> Result<serde_json::Value, LibraryError> {
    serde_json::from_slice(content)
        .map_err(|e| LibraryError::ContentValidation(format!("not valid JSON: {e}")))
}

fn image_extension(image: &StagedUpload) -> Result<&'static str, LibraryError> {
    image
        .extension()
        .and_then(preview_extension)
        .ok_or_else(|| {
            LibraryError::InvalidInput(format!(
                "Unsupported preview image: {}",
                image.file_name()
            ))
        })
}
