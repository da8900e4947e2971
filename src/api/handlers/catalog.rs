use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::catalog::{library_link, AdminEntry, CatalogEntry, PageQuery, SortKey};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    /// 1-based; 0 or absent means the first page
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogEntryResponse {
    pub base_name: String,
    pub description: String,
    pub download_count: u64,
    pub file_name: String,
    pub library_url: Option<String>,
    pub preview_url: String,
    pub public_path: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogPageResponse {
    pub entries: Vec<CatalogEntryResponse>,
    pub pagination: Pagination,
    pub search: String,
    pub sort: SortKey,
}

#[derive(Debug, Serialize)]
pub struct AdminListingResponse {
    pub entries: Vec<AdminEntry>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: GET / and GET /api/catalog
pub async fn list_catalog(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<CatalogParams>,
) -> Result<Json<JSend<CatalogPageResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let query = PageQuery {
        search: params.search.unwrap_or_default(),
        sort: SortKey::parse(params.sort.as_deref().unwrap_or("")),
        page: page - 1,
        page_size: state.config.catalog.page_size,
        token: params.token.map(|t| t.trim().to_string()).unwrap_or_default(),
    };

    let model = state.catalog.build_page(&query).await?;
    let links = state.config.library_links();

    let entries = model
        .entries
        .into_iter()
        .map(|entry| entry_to_response(entry, links))
        .collect();

    Ok(JSend::success(CatalogPageResponse {
        entries,
        pagination: Pagination {
            page,
            page_size: model.page_size,
            total: model.total_entries,
            total_pages: model.total_pages,
        },
        search: model.search,
        sort: model.sort,
    }))
}

/// Route: GET /admin
pub async fn admin_listing(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<AdminListingResponse>>, ApiError> {
    let entries = state.catalog.admin_listing().await?;
    Ok(JSend::success(AdminListingResponse { entries }))
}

// ============================================================================
// Helpers
// ============================================================================

fn entry_to_response(entry: CatalogEntry, links: Option<(&str, &str)>) -> CatalogEntryResponse {
    let library_url = links.map(|(base_app, base_library_url)| {
        library_link(base_app, base_library_url, &entry.file_name, &entry.token)
    });

    CatalogEntryResponse {
        base_name: entry.base_name,
        description: entry.description,
        download_count: entry.download_count,
        file_name: entry.file_name,
        library_url,
        preview_url: entry.preview_url,
        public_path: entry.public_path,
        title: entry.title,
    }
}
