use thiserror::Error;

use crate::artifact_store::ArtifactStoreError;
use crate::sanitize::SanitizeError;
use crate::sidecar::{CounterError, SidecarError};

/// Caller-visible failure of a library operation.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Name already in use: {0}")]
    NameCollision(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid file content: {0}")]
    ContentValidation(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LibraryError {
    fn from(e: std::io::Error) -> Self {
        LibraryError::Io(e.to_string())
    }
}

impl From<ArtifactStoreError> for LibraryError {
    fn from(e: ArtifactStoreError) -> Self {
        match e {
            ArtifactStoreError::Io(e) => LibraryError::Io(e.to_string()),
            ArtifactStoreError::NotFound(name) => LibraryError::NotFound(name),
            ArtifactStoreError::NameCollision(name) => LibraryError::NameCollision(name),
            ArtifactStoreError::InvalidPath(name) => LibraryError::InvalidPath(name),
        }
    }
}

impl From<SidecarError> for LibraryError {
    fn from(e: SidecarError) -> Self {
        match e {
            SidecarError::Io(e) => LibraryError::Io(e.to_string()),
            SidecarError::InvalidPath(name) => LibraryError::InvalidPath(name),
            SidecarError::UnsupportedImage(ext) => {
                LibraryError::InvalidInput(format!("Unsupported preview image type: {ext}"))
            }
            SidecarError::Counter(e) => e.into(),
        }
    }
}

impl From<CounterError> for LibraryError {
    fn from(e: CounterError) -> Self {
        LibraryError::Io(e.to_string())
    }
}

impl From<SanitizeError> for LibraryError {
    fn from(e: SanitizeError) -> Self {
        LibraryError::InvalidInput(e.to_string())
    }
}
