//! Backend adapters / 存储后端适配器
//!
//! Every adapter talks to its provider's REST API with `reqwest`, signs requests
//! itself and implements [`crate::storage::StorageAdapter`].

pub mod cos;
pub mod oss;
pub mod upyun;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use reqwest::{header::CONTENT_LENGTH, Body, Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::storage::{ListingPage, ObjectBody, ObjectEntry};

/// Shared HTTP client settings (100s request, 30s connect) / 创建HTTP客户端
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(100))
        .connect_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(8)
        .build()
        .context("创建HTTP客户端失败")
}

/// Turn a non-2xx response into an error carrying status and body / 检查响应状态
pub(crate) async fn check_status(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} - {}", status, text.trim()))
}

/// Attach an object body as a streamed request body / 设置流式请求体
///
/// A known length is sent as `Content-Length`, otherwise the body goes out chunked.
pub(crate) fn with_object_body(req: RequestBuilder, body: ObjectBody) -> RequestBuilder {
    let req = match body.content_length() {
        Some(length) => req.header(CONTENT_LENGTH, length),
        None => req,
    };
    req.body(Body::wrap_stream(body.into_stream()))
}

/// `ListBucketResult` body shared by COS and OSS (S3 v1 style) / 列表XML响应
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBucketResult {
    #[serde(default)]
    pub next_marker: Option<String>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub contents: Vec<ListedObject>,
    #[serde(default)]
    pub common_prefixes: Vec<CommonPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListedObject {
    pub key: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CommonPrefix {
    pub prefix: String,
}

impl ListBucketResult {
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("解析列表XML失败: {}", e))
    }

    /// Directories first, then files, skipping the marker object of `prefix` itself
    pub fn into_page(self, prefix: &str) -> ListingPage {
        // v1 listings omit NextMarker when no delimiter applies; fall back to the last key
        let last_key = self
            .contents
            .last()
            .map(|o| o.key.clone())
            .into_iter()
            .chain(self.common_prefixes.last().map(|p| p.prefix.clone()))
            .max();
        let cursor = self.next_marker.filter(|m| !m.is_empty()).or(last_key);

        let mut items: Vec<ObjectEntry> = self
            .common_prefixes
            .iter()
            .map(|p| ObjectEntry::dir(&p.prefix, prefix))
            .collect();
        items.extend(
            self.contents
                .into_iter()
                .filter(|o| o.key != prefix)
                .map(|o| ObjectEntry::file(&o.key, prefix, o.size, o.last_modified)),
        );

        ListingPage {
            items,
            cursor,
            truncated: self.is_truncated,
        }
    }
}
