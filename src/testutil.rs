//! Shared helpers for in-crate tests.

use std::sync::Arc;

use crate::config::{AdminConfig, Config, CounterBackend, StorageConfig};
use crate::AppState;

pub const TEST_ADMIN_USER: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "secret";

/// Create a test AppState rooted in a temporary directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with(temp_dir, |_| {})
}

/// Like [`test_state`], letting the caller adjust the config first.
pub fn test_state_with<F>(temp_dir: &tempfile::TempDir, adjust: F) -> Arc<AppState>
where
    F: FnOnce(&mut Config),
{
    let mut storage = StorageConfig::under(temp_dir.path().join("files"));
    storage.data_dir = temp_dir.path().join("data");
    storage.counter_backend = CounterBackend::Json;

    let mut config = Config {
        admin: AdminConfig {
            username: TEST_ADMIN_USER.to_string(),
            password: TEST_ADMIN_PASSWORD.to_string(),
        },
        catalog: Default::default(),
        links: Default::default(),
        server: Default::default(),
        storage,
        test_mode: true,
    };
    adjust(&mut config);

    Arc::new(AppState::open(config).expect("Failed to open test state"))
}
