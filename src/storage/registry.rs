use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use anyhow::Result;

use super::StorageAdapter;
use crate::config::AppConfig;
use crate::drivers::{cos::CosAdapter, oss::OssAdapter, upyun::UpyunAdapter};

pub type AdapterBox = Arc<dyn StorageAdapter>;

/// Supported backend selectors / 支持的存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Cos,
    Oss,
    Ups,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Cos, Backend::Oss, Backend::Ups];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cos => "cos",
            Backend::Oss => "oss",
            Backend::Ups => "ups",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL.into_iter().find(|b| b.as_str() == s).ok_or(())
    }
}

/// Adapters built once at startup, shared read-only across requests / 存储适配器注册表
#[derive(Clone, Default)]
pub struct StorageRegistry {
    adapters: HashMap<Backend, AdapterBox>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an adapter for every configured backend / 根据配置创建适配器
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut registry = Self::new();
        if let Some(cos) = &config.cos {
            registry.register(Backend::Cos, Arc::new(CosAdapter::new(cos.clone())?));
        }
        if let Some(oss) = &config.oss {
            registry.register(Backend::Oss, Arc::new(OssAdapter::new(oss.clone())?));
        }
        if let Some(ups) = &config.ups {
            registry.register(Backend::Ups, Arc::new(UpyunAdapter::new(ups.clone())?));
        }
        if registry.adapters.is_empty() {
            tracing::warn!("No storage backend configured, /api requests will be rejected");
        }
        Ok(registry)
    }

    pub fn register(&mut self, backend: Backend, adapter: AdapterBox) {
        tracing::info!("Storage backend registered: {} ({})", backend, adapter.name());
        self.adapters.insert(backend, adapter);
    }

    pub fn get(&self, backend: Backend) -> Option<AdapterBox> {
        self.adapters.get(&backend).cloned()
    }
}
