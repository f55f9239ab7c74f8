use std::sync::Arc;
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, DATE},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::Deserialize;

use super::sign;
use crate::config::UpyunConfig;
use crate::drivers::{build_client, check_status, with_object_body};
use crate::storage::{collect_channel, spawn_page_stream, ListingPage, ObjectBody, ObjectEntry, StorageAdapter};
use crate::utils::{absolute_path, encode_key, http_date, join_key, object_key};

const API_ADDRESS: &str = "https://v0.api.upyun.com";
/// `x-list-iter` value marking the last page / 列表结束标记
const LIST_END_ITER: &str = "g2gCZAAEbmV4dGQAA2VvZg";
const LIST_LIMIT: &str = "100";

#[derive(Debug, Deserialize)]
struct ListResp {
    #[serde(default)]
    files: Vec<ListedFile>,
    #[serde(default)]
    iter: String,
}

#[derive(Debug, Deserialize)]
struct ListedFile {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    length: u64,
    #[serde(default)]
    last_modified: i64,
}

impl ListResp {
    fn into_page(self, prefix: &str) -> ListingPage {
        let items = self
            .files
            .into_iter()
            .map(|f| {
                if f.kind == "folder" {
                    ObjectEntry::dir(&format!("{}{}/", prefix, f.name), prefix)
                } else {
                    let modified = DateTime::from_timestamp(f.last_modified, 0)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default();
                    ObjectEntry::file(&join_key(prefix, &f.name), prefix, f.length, modified)
                }
            })
            .collect();
        let truncated = !self.iter.is_empty() && self.iter != LIST_END_ITER;

        ListingPage {
            items,
            cursor: Some(self.iter).filter(|it| !it.is_empty()),
            truncated,
        }
    }
}

struct UpyunClient {
    config: UpyunConfig,
    client: Client,
    api_address: String,
    password_md5: String,
}

impl UpyunClient {
    /// `/<bucket>/<encoded path>` / 请求URI
    fn uri(&self, path: &str) -> String {
        format!("/{}{}", self.config.bucket, encode_key(&absolute_path(path)))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let uri = self.uri(path);
        let date = http_date();
        let auth = sign::authorization(&self.config.operator, &self.password_md5, method.as_str(), &uri, &date);
        tracing::debug!("UpYun {} {}", method, uri);

        self.client
            .request(method, format!("{}{}", self.api_address, uri))
            .header(DATE, date)
            .header(AUTHORIZATION, auth)
    }

    async fn list_page(&self, prefix: &str, iter: String) -> Result<ListingPage> {
        let mut req = self
            .request(Method::GET, prefix)
            .header("x-list-limit", LIST_LIMIT)
            .header(ACCEPT, "application/json");
        if !iter.is_empty() {
            req = req.header("x-list-iter", iter);
        }

        let resp = req.send().await?;
        // 目录不存在视为空目录
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(ListingPage::complete(Vec::new()));
        }
        let body: ListResp = check_status(resp).await?.json().await?;
        Ok(body.into_page(prefix))
    }
}

/// UpYun adapter / 又拍云适配器
pub struct UpyunAdapter {
    inner: Arc<UpyunClient>,
}

impl UpyunAdapter {
    pub fn new(config: UpyunConfig) -> Result<Self> {
        Self::with_api_address(config, API_ADDRESS.to_string())
    }

    /// Adapter talking to an explicit REST address / 指定API地址
    pub fn with_api_address(config: UpyunConfig, api_address: String) -> Result<Self> {
        let password_md5 = sign::password_digest(&config.password);
        Ok(Self {
            inner: Arc::new(UpyunClient {
                config,
                client: build_client()?,
                api_address,
                password_md5,
            }),
        })
    }
}

#[async_trait]
impl StorageAdapter for UpyunAdapter {
    fn name(&self) -> &str {
        "UpYun"
    }

    fn custom_domain(&self) -> &str {
        &self.inner.config.domain
    }

    fn default_endpoint(&self) -> String {
        format!("http://{}.test.upcdn.net", self.inner.config.bucket)
    }

    async fn list(&self, prefix: &str) -> Result<ListingPage> {
        let inner = self.inner.clone();
        let prefix = prefix.to_string();
        let rx = spawn_page_stream(move |iter| {
            let inner = inner.clone();
            let prefix = prefix.clone();
            async move { inner.list_page(&prefix, iter).await }
        });
        collect_channel(rx).await
    }

    async fn put_object(&self, key: &str, body: ObjectBody) -> Result<()> {
        let key = object_key(key)?;
        let resp = with_object_body(self.inner.request(Method::PUT, key), body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        // `DELETE /<bucket>/` 会作用于服务根目录
        let key = object_key(path)?;
        let resp = self.inner.request(Method::DELETE, key).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Native folder creation (`POST` with `folder: true`) / 创建目录
    async fn mkdir(&self, prefix: &str, dirname: &str) -> Result<()> {
        let path = join_key(prefix, dirname);
        let key = object_key(path.trim_end_matches('/'))?;
        let resp = self
            .inner
            .request(Method::POST, key)
            .header("folder", "true")
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
