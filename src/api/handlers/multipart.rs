use std::collections::HashMap;
use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::api::response::ApiError;
use crate::staging::{StagedUpload, StagingArea};

/// A multipart form whose file parts have been streamed into the staging area.
///
/// Files that are not taken out of the form are removed by [`UploadForm::discard`].
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, StagedUpload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn take_file(&mut self, name: &str) -> Option<StagedUpload> {
        self.files.remove(name)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub async fn discard(self) {
        for staged in self.files.values() {
            staged.discard().await;
        }
    }
}

/// Read every part of a multipart body. File parts larger than `max_file_size`
/// are rejected and nothing staged so far is kept.
pub async fn read_form(
    multipart: &mut Multipart,
    staging: &StagingArea,
    max_file_size: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    match collect_parts(multipart, staging, max_file_size, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn collect_parts(
    multipart: &mut Multipart,
    staging: &StagingArea,
    max_file_size: u64,
    form: &mut UploadForm,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart data", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field.file_name().map(|s| s.to_string()) {
            // Browsers send an empty, unnamed part for an untouched file input.
            Some(file_name) if file_name.is_empty() => {}
            Some(file_name) => {
                let staged = staging.allocate(&file_name);
                let written = stream_to_file(&mut field, &staged.path, max_file_size).await;
                if let Some(previous) = form.files.insert(field_name, staged) {
                    previous.discard().await;
                }
                written?;
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(&format!("Invalid {field_name}"), e))?;
                form.fields.insert(field_name, text);
            }
        }
    }
    Ok(())
}

async fn stream_to_file(
    field: &mut Field<'_>,
    path: &Path,
    max_file_size: u64,
) -> Result<(), ApiError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {e}")))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error("Failed to read file", e))?
    {
        written += chunk.len() as u64;
        if written > max_file_size {
            return Err(ApiError::payload_too_large(format!(
                "File exceeds maximum upload size of {max_file_size} bytes"
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to stage upload: {e}")))?;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {e}")))?;
    Ok(())
}

fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body is too large")
    } else {
        ApiError::bad_request(format!("{context}: {e}"))
    }
}
