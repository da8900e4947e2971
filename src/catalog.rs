//! Listing views over the library: the public, searchable and paginated
//! catalog, and the unfiltered admin listing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::artifact_store::{self, ArtifactStore};
use crate::error::LibraryError;
use crate::sidecar::{MetadataRecord, SidecarStore};

/// URL prefix under which artifacts are downloadable.
pub const ARTIFACT_URL_PREFIX: &str = "/files";
/// URL prefix under which preview images are served.
pub const PREVIEW_URL_PREFIX: &str = "/uploads/previews";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Ascending by base name.
    #[default]
    Name,
    /// Most downloaded first.
    Popular,
    /// Descending by base name.
    Reverse,
}

impl SortKey {
    /// Unknown or empty keys fall back to name order.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "popular" => SortKey::Popular,
            "reverse" => SortKey::Reverse,
            _ => SortKey::Name,
        }
    }

    fn compare(self, a: (&str, u64), b: (&str, u64)) -> Ordering {
        match self {
            SortKey::Name => a.0.cmp(b.0),
            SortKey::Reverse => b.0.cmp(a.0),
            SortKey::Popular => b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageQuery {
    pub search: String,
    pub sort: SortKey,
    /// Zero-based page index.
    pub page: usize,
    pub page_size: usize,
    /// Opaque access token handed through to each entry.
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub base_name: String,
    pub file_name: String,
    pub title: String,
    pub description: String,
    /// Empty when the artifact has no preview.
    pub preview_url: String,
    pub download_count: u64,
    pub public_path: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageModel {
    pub entries: Vec<CatalogEntry>,
    pub page: usize,
    pub page_size: usize,
    pub total_entries: usize,
    pub total_pages: usize,
    pub search: String,
    pub sort: SortKey,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminEntry {
    pub base_name: String,
    pub file_name: String,
    /// Empty when the title side-car is missing.
    pub title: String,
    pub description: String,
    pub preview_url: String,
    pub download_count: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

pub struct Catalog {
    artifacts: Arc<dyn ArtifactStore>,
    sidecars: Arc<SidecarStore>,
}

impl Catalog {
    pub fn new(artifacts: Arc<dyn ArtifactStore>, sidecars: Arc<SidecarStore>) -> Self {
        Self {
            artifacts,
            sidecars,
        }
    }

    /// Build one page of the public catalog.
    ///
    /// Artifacts without a non-empty title are not published and never
    /// appear here, though they stay downloadable by name.
    pub async fn build_page(&self, query: &PageQuery) -> Result<PageModel, LibraryError> {
        if query.page_size == 0 {
            return Err(LibraryError::InvalidInput(
                "page size must be greater than 0".to_string(),
            ));
        }

        let needle = query.search.trim().to_lowercase();
        let counts = self.sidecars.download_counts().await?;

        let mut entries = Vec::new();
        for base_name in self.artifacts.list_all().await? {
            let record = self.sidecars.read_record(&base_name).await?;
            let Some(title) = published_title(&record) else {
                continue;
            };
            let description = record.description.as_deref().unwrap_or("").trim();
            if !matches_search(&base_name, description, &needle) {
                continue;
            }

            let file_name = artifact_store::file_name(&base_name);
            entries.push(CatalogEntry {
                title: title.to_string(),
                description: description.to_string(),
                preview_url: preview_url(&record),
                download_count: counts.get(&file_name).copied().unwrap_or(0),
                public_path: public_path(&file_name),
                token: query.token.clone(),
                file_name,
                base_name,
            });
        }

        entries.sort_by(|a, b| {
            query.sort.compare(
                (a.base_name.as_str(), a.download_count),
                (b.base_name.as_str(), b.download_count),
            )
        });

        let total_entries = entries.len();
        let total_pages = total_entries.div_ceil(query.page_size);
        let entries = entries
            .into_iter()
            .skip(query.page.saturating_mul(query.page_size))
            .take(query.page_size)
            .collect();

        Ok(PageModel {
            entries,
            page: query.page,
            page_size: query.page_size,
            total_entries,
            total_pages,
            search: query.search.trim().to_string(),
            sort: query.sort,
            token: query.token.clone(),
        })
    }

    /// Every artifact on disk, titled or not, ascending by base name.
    pub async fn admin_listing(&self) -> Result<Vec<AdminEntry>, LibraryError> {
        let counts = self.sidecars.download_counts().await?;
        let mut base_names = self.artifacts.list_all().await?;
        base_names.sort();

        let mut entries = Vec::with_capacity(base_names.len());
        for base_name in base_names {
            let record = self.sidecars.read_record(&base_name).await?;
            let file_name = artifact_store::file_name(&base_name);
            entries.push(AdminEntry {
                title: record.title.as_deref().unwrap_or("").trim().to_string(),
                description: record.description.as_deref().unwrap_or("").trim().to_string(),
                preview_url: preview_url(&record),
                download_count: counts.get(&file_name).copied().unwrap_or(0),
                modified_at: self.artifacts.modified_at(&base_name).await?,
                file_name,
                base_name,
            });
        }
        Ok(entries)
    }
}

fn published_title(record: &MetadataRecord) -> Option<&str> {
    record
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Case-insensitive substring match against the base name or description.
/// `needle` must already be lowercased; an empty needle matches everything.
fn matches_search(base_name: &str, description: &str, needle: &str) -> bool {
    needle.is_empty()
        || base_name.to_lowercase().contains(needle)
        || description.to_lowercase().contains(needle)
}

fn preview_url(record: &MetadataRecord) -> String {
    record
        .preview
        .as_deref()
        .map(|name| format!("{PREVIEW_URL_PREFIX}/{}", urlencoding::encode(name)))
        .unwrap_or_default()
}

/// Public download path of an artifact.
pub fn public_path(file_name: &str) -> String {
    format!("{ARTIFACT_URL_PREFIX}/{}", urlencoding::encode(file_name))
}

/// Deep link that makes the external drawing app import an artifact.
pub fn library_link(base_app: &str, base_library_url: &str, file_name: &str, token: &str) -> String {
    let library_url = format!(
        "{}{ARTIFACT_URL_PREFIX}/{file_name}",
        base_library_url.trim_end_matches('/')
    );
    format!(
        "https://{base_app}#addLibrary={}&token={}",
        urlencoding::encode(&library_url),
        urlencoding::encode(token)
    )
}
