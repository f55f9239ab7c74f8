use crate::config::AppConfig;
use crate::storage::StorageRegistry;

/// Process-wide read-only state shared by every handler / 全局只读状态
pub struct AppState {
    pub config: AppConfig,
    pub storages: StorageRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, storages: StorageRegistry) -> Self {
        Self { config, storages }
    }
}
