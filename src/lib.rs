//! template-library - an internal library of `.excalidrawlib` templates
//!
//! This crate keeps uploaded library files consistent with their side-car
//! metadata and serves them with:
//! - Loose-file storage: artifacts, title/description side-cars and preview images
//! - Download counting in a shared JSON file or an embedded redb database
//! - A searchable, sortable, paginated catalog plus an admin listing
//! - REST API with multipart upload and a basic-auth protected admin area

pub mod api;
pub mod artifact_store;
pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod paths;
pub mod sanitize;
pub mod sidecar;
pub mod staging;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;
use thiserror::Error;

use artifact_store::{ArtifactStore, LocalArtifactStore};
use catalog::Catalog;
use config::{Config, CounterBackend};
use library::{Library, Limits};
use sidecar::{DownloadCounter, JsonFileCounter, SidecarStore};
use staging::StagingArea;
use storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to prepare directory {path}: {source}")]
    Directory {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to open counter database: {0}")]
    Database(#[from] DatabaseError),
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub library: Library,
    pub staging: StagingArea,
}

impl AppState {
    /// Create the managed directories and wire the stores together.
    pub fn open(config: Config) -> Result<Self, StartupError> {
        let storage = &config.storage;
        let dir_error = |path: &std::path::Path| {
            let path = path.display().to_string();
            move |source| StartupError::Directory { path, source }
        };

        let artifacts: Arc<dyn ArtifactStore> = Arc::new(
            LocalArtifactStore::new(&storage.files_dir).map_err(dir_error(&storage.files_dir))?,
        );

        let counter: Arc<dyn DownloadCounter> = match storage.counter_backend {
            CounterBackend::Json => Arc::new(JsonFileCounter::new(&storage.files_dir)),
            CounterBackend::Redb => Arc::new(Database::open(&storage.data_dir)?),
        };

        let sidecars = Arc::new(
            SidecarStore::new(&storage.files_dir, &storage.preview_dir, counter)
                .map_err(dir_error(&storage.preview_dir))?,
        );

        let staging =
            StagingArea::new(&storage.upload_dir).map_err(dir_error(&storage.upload_dir))?;

        let limits = Limits {
            max_title_length: config.catalog.max_title_length,
            max_description_length: config.catalog.max_description_length,
            require_preview: config.catalog.require_preview,
        };

        Ok(Self {
            catalog: Catalog::new(Arc::clone(&artifacts), Arc::clone(&sidecars)),
            library: Library::new(artifacts, sidecars, limits),
            staging,
            config,
        })
    }
}
