use std::path::PathBuf;
use thiserror::Error;

use crate::sanitize::{DEFAULT_MAX_DESCRIPTION_LENGTH, DEFAULT_MAX_TITLE_LENGTH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admin: AdminConfig,
    pub catalog: CatalogConfig,
    pub links: LinkConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Maximum size in bytes of a single uploaded file
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub max_title_length: usize,
    pub max_description_length: usize,
    pub require_preview: bool,
}

/// Inputs for deep links into the external drawing app.
#[derive(Debug, Clone, Default)]
pub struct LinkConfig {
    /// Host of the drawing app, e.g. `draw.example.com`
    pub base_app: Option<String>,
    /// Public origin of this service, e.g. `https://library.example.com`
    pub base_library_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterBackend {
    /// Shared `downloadCounts.json` in the files directory, last write wins.
    Json,
    /// redb under `data_dir`, one transaction per increment.
    Redb,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub counter_backend: CounterBackend,
    /// Only used by the redb counter backend
    pub data_dir: PathBuf,
    /// Managed directory for artifacts and text side-cars
    pub files_dir: PathBuf,
    pub preview_dir: PathBuf,
    /// Staging directory for in-flight uploads
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: String::new(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_title_length: DEFAULT_MAX_TITLE_LENGTH,
            max_description_length: DEFAULT_MAX_DESCRIPTION_LENGTH,
            require_preview: false,
        }
    }
}

impl StorageConfig {
    /// Derive the preview and upload directories from the files directory.
    pub fn under(files_dir: impl Into<PathBuf>) -> Self {
        let files_dir = files_dir.into();
        Self {
            counter_backend: CounterBackend::Json,
            data_dir: PathBuf::from("./data"),
            preview_dir: files_dir.join("previews"),
            upload_dir: files_dir.join(".uploads"),
            files_dir,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::under("./files")
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Result<Option<usize>, ConfigError> {
            lookup(key)
                .map(|v| {
                    v.trim().parse().map_err(|_| {
                        ConfigError::ValidationError(format!("{key} must be a non-negative integer"))
                    })
                })
                .transpose()
        };
        let flag = |key: &str| {
            lookup(key)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
        };

        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let max_upload_size = parsed("MAX_UPLOAD_SIZE")?
            .map(|n| n as u64)
            .unwrap_or(10 * 1024 * 1024); // 10MB

        let files_dir = PathBuf::from(lookup("FILES_DIR").unwrap_or_else(|| "./files".to_string()));
        let mut storage = StorageConfig::under(files_dir);
        if let Some(dir) = lookup("PREVIEW_DIR") {
            storage.preview_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            storage.data_dir = PathBuf::from(dir);
        }
        storage.counter_backend = match lookup("COUNTER_BACKEND")
            .unwrap_or_else(|| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "redb" => CounterBackend::Redb,
            _ => CounterBackend::Json,
        };

        let defaults = CatalogConfig::default();
        let catalog = CatalogConfig {
            page_size: parsed("PAGE_SIZE")?.unwrap_or(defaults.page_size),
            max_title_length: parsed("MAX_TITLE_LENGTH")?.unwrap_or(defaults.max_title_length),
            max_description_length: parsed("MAX_DESCRIPTION_LENGTH")?
                .unwrap_or(defaults.max_description_length),
            require_preview: flag("REQUIRE_PREVIEW"),
        };

        let admin = AdminConfig {
            username: lookup("ADMIN_USER").unwrap_or_else(|| "admin".to_string()),
            password: lookup("ADMIN_PASSWORD")
                .or_else(|| lookup("ADMINPWD"))
                .unwrap_or_default(),
        };

        let links = LinkConfig {
            base_app: lookup("BASE_APP").filter(|s| !s.trim().is_empty()),
            base_library_url: lookup("BASE_LIBRARY_URL").filter(|s| !s.trim().is_empty()),
        };

        let config = Config {
            admin,
            catalog,
            links,
            server: ServerConfig {
                bind_address,
                max_upload_size,
            },
            storage,
            test_mode: flag("TEST_MODE"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("PAGE_SIZE", self.catalog.page_size),
            ("MAX_TITLE_LENGTH", self.catalog.max_title_length),
            ("MAX_DESCRIPTION_LENGTH", self.catalog.max_description_length),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be greater than 0"
                )));
            }
        }

        if self.admin.password.is_empty() && !self.test_mode {
            return Err(ConfigError::ValidationError(
                "ADMIN_PASSWORD is required".to_string(),
            ));
        }

        if self.links.base_app.is_some() != self.links.base_library_url.is_some() {
            tracing::warn!(
                "Only one of BASE_APP and BASE_LIBRARY_URL is set; library links are disabled"
            );
        }

        Ok(())
    }

    /// Whether catalog entries can carry deep links into the drawing app.
    pub fn library_links(&self) -> Option<(&str, &str)> {
        match (&self.links.base_app, &self.links.base_library_url) {
            (Some(app), Some(url)) => Some((app.as_str(), url.as_str())),
            _ => None,
        }
    }
}
