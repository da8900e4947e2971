use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::multipart::read_form;
use crate::api::response::{ApiError, JSend};
use crate::artifact_store;
use crate::catalog::public_path;
use crate::library::UploadRequest;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub base_name: String,
    pub file_name: String,
    pub public_path: String,
}

/// Route: POST /upload (multipart: file, image, title, description)
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    let mut form = read_form(
        &mut multipart,
        &state.staging,
        state.config.server.max_upload_size,
    )
    .await?;

    let request = UploadRequest {
        file: form.take_file("file"),
        image: form.take_file("image"),
        title: form.take_text("title"),
        description: form.take_text("description"),
    };
    form.discard().await;

    let base_name = state.library.upload(request).await?;
    let file_name = artifact_store::file_name(&base_name);

    Ok(JSend::success(UploadResponse {
        public_path: public_path(&file_name),
        file_name,
        base_name,
    }))
}
