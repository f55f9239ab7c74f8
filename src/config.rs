//! Application configuration module / 应用配置模块
//!
//! Loads the gateway configuration from a YAML file once at startup.
//! The file holds the listen address, auth tokens and one block per backend.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file path / 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "CLOUDGATE_CONFIG";

/// Configuration loading errors / 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config for {backend}: {reason}")]
    Invalid { backend: &'static str, reason: String },
}

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Tencent Cloud COS / 腾讯云COS
    #[serde(default, alias = "Cos")]
    pub cos: Option<CosConfig>,
    /// Aliyun OSS / 阿里云OSS
    #[serde(default, alias = "Oss")]
    pub oss: Option<OssConfig>,
    /// UpYun USS / 又拍云
    #[serde(default, alias = "Ups")]
    pub ups: Option<UpyunConfig>,
    /// Flat top-level keys of the older config layout / 旧版配置的顶层字段
    #[serde(flatten)]
    pub(crate) legacy: LegacyKeys,
}

/// `Port`, `Token`, `UToken` and `Default` at the top level, folded into
/// `server` and `auth` after parsing / 旧版顶层字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct LegacyKeys {
    #[serde(rename = "Port", default, skip_serializing_if = "Option::is_none")]
    port: Option<serde_yaml::Value>,
    #[serde(rename = "Token", default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "UToken", default, skip_serializing_if = "Option::is_none")]
    utoken: Option<String>,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

/// `Port` was a string (`"8080"` or `":8080"`); plain numbers are accepted too
fn legacy_port(value: &serde_yaml::Value) -> Option<u16> {
    match value {
        serde_yaml::Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        serde_yaml::Value::String(s) => s.trim().trim_start_matches(':').parse().ok(),
        _ => None,
    }
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for unmatched routes (bundled front-end) / 前端静态文件目录
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Upload body limit in MiB / 上传大小限制
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_max_upload_mb() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

/// Token configuration / 令牌配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Full access token / 管理令牌
    #[serde(default)]
    pub token: String,
    /// Upload-only token / 上传令牌
    #[serde(default)]
    pub utoken: String,
    /// Default upload target handed out by /get_upload_config / 默认上传目标
    #[serde(default)]
    pub default: String,
}

/// COS connection parameters / COS配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosConfig {
    #[serde(alias = "SecretID")]
    pub secret_id: String,
    #[serde(alias = "SecretKey")]
    pub secret_key: String,
    /// Bucket name, e.g. `test-1250000000`
    #[serde(alias = "Bucket")]
    pub bucket: String,
    /// Region, e.g. `ap-nanjing`
    #[serde(default, alias = "Region")]
    pub region: String,
    /// Custom public domain (with trailing slash) / 自定义域名
    #[serde(default, alias = "Domain")]
    pub domain: String,
    /// Override for the bucket API address / API地址
    #[serde(default, alias = "APIAddress")]
    pub api_address: String,
}

/// OSS connection parameters / OSS配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OssConfig {
    #[serde(alias = "Ak")]
    pub access_key_id: String,
    #[serde(alias = "Sk")]
    pub access_key_secret: String,
    #[serde(alias = "Bucket")]
    pub bucket: String,
    /// Public region endpoint (not the bucket domain), e.g. `oss-cn-hangzhou.aliyuncs.com`
    #[serde(alias = "Endpoint")]
    pub endpoint: String,
    #[serde(default, alias = "Domain")]
    pub domain: String,
}

/// UpYun connection parameters / 又拍云配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpyunConfig {
    /// Service name / 服务名称
    #[serde(alias = "Bucket")]
    pub bucket: String,
    #[serde(alias = "Operator")]
    pub operator: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(default, alias = "Domain")]
    pub domain: String,
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Parse configuration from YAML text / 从YAML文本解析配置
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_legacy_keys()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_legacy_keys(&mut self) -> Result<(), ConfigError> {
        let legacy = std::mem::take(&mut self.legacy);
        if let Some(port) = legacy.port {
            self.server.port = legacy_port(&port).ok_or_else(|| ConfigError::Invalid {
                backend: "server",
                reason: format!("`Port` is not a port number: {:?}", port),
            })?;
        }
        if let Some(token) = legacy.token {
            self.auth.token = token;
        }
        if let Some(utoken) = legacy.utoken {
            self.auth.utoken = utoken;
        }
        if let Some(default) = legacy.default {
            self.auth.default = default;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(cos) = &self.cos {
            require("cos", "bucket", &cos.bucket)?;
            require("cos", "secret_id", &cos.secret_id)?;
            require("cos", "secret_key", &cos.secret_key)?;
            if cos.api_address.is_empty() {
                require("cos", "region", &cos.region)?;
            }
        }
        if let Some(oss) = &self.oss {
            require("oss", "bucket", &oss.bucket)?;
            require("oss", "endpoint", &oss.endpoint)?;
            require("oss", "access_key_id", &oss.access_key_id)?;
            require("oss", "access_key_secret", &oss.access_key_secret)?;
        }
        if let Some(ups) = &self.ups {
            require("ups", "bucket", &ups.bucket)?;
            require("ups", "operator", &ups.operator)?;
            require("ups", "password", &ups.password)?;
        }
        Ok(())
    }
}

fn require(backend: &'static str, field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            backend,
            reason: format!("`{}` must not be empty", field),
        });
    }
    Ok(())
}

/// Get the config file path / 获取配置文件路径
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"))
}

/// Load configuration from file; any failure is fatal for the caller / 加载配置文件
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_path();
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = AppConfig::from_yaml(&content, &path)?;
    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}
