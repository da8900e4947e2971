mod admin;
mod catalog;
mod multipart;
mod static_files;
mod upload;

pub use admin::{admin_purge, edit_metadata, health, remove_artifact, replace_artifact};
pub use catalog::{admin_listing, list_catalog};
pub use static_files::{serve_artifact, serve_preview};
pub use upload::upload;
