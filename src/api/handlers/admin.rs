use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::multipart::read_form;
use crate::api::response::{ApiError, JSend};
use crate::artifact_store;
use crate::library::EditRequest;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub base_name: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub artifacts_deleted: usize,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Route: POST /admin/edit/:filename (multipart: title, description, image)
pub async fn edit_metadata(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<JSend<()>>, ApiError> {
    let base_name = artifact_base(&filename)?;
    let mut form = read_form(
        &mut multipart,
        &state.staging,
        state.config.server.max_upload_size,
    )
    .await?;

    let request = EditRequest {
        title: form.take_text("title").unwrap_or_default(),
        description: form.take_text("description").unwrap_or_default(),
        image: form.take_file("image"),
    };
    form.discard().await;

    state.library.edit_metadata(base_name, request).await?;
    Ok(JSend::success(()))
}

/// Route: POST /admin/edit-excalidrawlib/:filename (multipart: file)
pub async fn replace_artifact(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<JSend<ReplaceResponse>>, ApiError> {
    let old_base = artifact_base(&filename)?;
    let mut form = read_form(
        &mut multipart,
        &state.staging,
        state.config.server.max_upload_size,
    )
    .await?;

    let file = form.take_file("file");
    form.discard().await;
    let file = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let base_name = state.library.replace_artifact(old_base, file).await?;
    Ok(JSend::success(ReplaceResponse {
        file_name: artifact_store::file_name(&base_name),
        base_name,
    }))
}

/// Route: POST /admin/remove/:filename
pub async fn remove_artifact(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.library.delete(artifact_base(&filename)?).await?;
    Ok(JSend::success(()))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let removed = state.library.purge().await?;

    tracing::warn!(artifacts = removed, "Purged all data");

    Ok(JSend::success(PurgeResponse {
        artifacts_deleted: removed,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Admin routes address artifacts by their full file name.
fn artifact_base(file_name: &str) -> Result<&str, ApiError> {
    artifact_store::strip_extension(file_name)
        .ok_or_else(|| ApiError::not_found(format!("Not found: {file_name}")))
}
