//! Key and path helpers shared by the adapters / 路径工具函数

use anyhow::{anyhow, Result};
use chrono::Utc;

/// Remove the query prefix from a listed key exactly once / 去除查询前缀（仅一次）
///
/// Only the first occurrence is removed, so `a/b/a/` listed under `a/` yields `b/a/`.
pub fn strip_query_prefix(key: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return key.to_string();
    }
    key.replacen(prefix, "", 1)
}

/// Object key for a file uploaded under `prefix` / 上传目标键
pub fn join_key(prefix: &str, filename: &str) -> String {
    format!("{}{}", prefix, filename)
}

/// Marker key for an emulated directory, always ending in `/` / 目录占位对象键
pub fn dir_marker_key(prefix: &str, dirname: &str) -> String {
    let mut key = join_key(prefix, dirname);
    if !key.ends_with('/') {
        key.push('/');
    }
    key
}

/// Object key without leading slashes; an empty key would address the bucket itself / 校验对象键
pub fn object_key(path: &str) -> Result<&str> {
    let key = path.trim_start_matches('/');
    if key.is_empty() {
        return Err(anyhow!("object path must not be empty: {:?}", path));
    }
    Ok(key)
}

/// Percent-encode every segment of an object key, keeping `/` / URL编码对象键
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute path form used by UpYun (leading `/`, root is `/`) / 又拍云路径
pub fn absolute_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Get HTTP date string (RFC 1123, GMT) / 获取HTTP日期字符串
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Host part of a URL, used by signers that cover the Host header / 提取主机名
pub fn url_host(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Split an endpoint into (scheme, host), defaulting to https / 拆分端点
pub fn split_endpoint(endpoint: &str) -> (&str, &str) {
    let endpoint = endpoint.trim_end_matches('/');
    if let Some(rest) = endpoint.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("https", endpoint)
    }
}
