use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::response::ApiError;
use crate::AppState;

/// Download an artifact by file name, counting the download.
/// Route: GET /files/:filename
pub async fn serve_artifact(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let download = state.library.download(&filename).await?;
    tracing::info!(file_name = %download.file_name, "File being downloaded");

    let byte_size = download.data.len() as u64;
    let mut response = (StatusCode::OK, download.data).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&download.file_name).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));

    // Non-ASCII names cannot go into a plain header value; the client then
    // falls back to the URL's last segment.
    if let Ok(value) = format!("attachment; filename=\"{}\"", download.file_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok(response)
}

/// Serve a preview image.
/// Route: GET /uploads/previews/:filename
pub async fn serve_preview(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.library.preview_file(&filename).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to open preview: {e}")))?;
    let byte_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read preview: {e}")))?
        .len();

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));

    // Previews are replaced in place by admin edits, so keep caching short.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=300"),
    );

    Ok(response)
}
