use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{auth, handlers};
use crate::AppState;

/// Headroom for the non-file parts of a multipart body.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // A form carries at most a library file and a preview image.
    let body_limit = (state.config.server.max_upload_size as usize)
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD);

    let mut admin = Router::new()
        .route("/admin", get(handlers::admin_listing))
        .route("/admin/edit/:filename", post(handlers::edit_metadata))
        .route(
            "/admin/edit-excalidrawlib/:filename",
            post(handlers::replace_artifact),
        )
        .route("/admin/remove/:filename", post(handlers::remove_artifact));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled: purge route is available.");
        admin = admin.route("/admin/purge", delete(handlers::admin_purge));
    }

    let admin = admin
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_admin,
        ));

    Router::new()
        // Catalog
        .route("/", get(handlers::list_catalog))
        .route("/api/catalog", get(handlers::list_catalog))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Downloads
        .route("/files/:filename", get(handlers::serve_artifact))
        .route("/uploads/previews/:filename", get(handlers::serve_preview))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .merge(admin)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
