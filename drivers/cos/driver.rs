use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::AUTHORIZATION, Client, Method};

use super::sign::{self, SIGN_EXPIRE_SECS, SIGN_SKEW_SECS};
use crate::config::CosConfig;
use crate::drivers::{build_client, check_status, with_object_body, ListBucketResult};
use crate::storage::{drain_marker_pages, ListingPage, ObjectBody, StorageAdapter};
use crate::utils::{encode_key, object_key, url_host};

/// COS adapter / COS适配器
pub struct CosAdapter {
    config: CosConfig,
    client: Client,
    /// `https://<bucket>.cos.<region>.myqcloud.com` or the configured override
    api_address: String,
    host: String,
}

impl CosAdapter {
    pub fn new(config: CosConfig) -> Result<Self> {
        let api_address = if config.api_address.is_empty() {
            format!("https://{}.cos.{}.myqcloud.com", config.bucket, config.region)
        } else {
            config.api_address.trim_end_matches('/').to_string()
        };
        let host = url_host(&api_address).ok_or_else(|| anyhow!("无效的COS API地址: {}", api_address))?;

        Ok(Self {
            config,
            client: build_client()?,
            api_address,
            host,
        })
    }

    fn authorization(&self, method: &Method, path: &str, params: &[(&str, &str)]) -> String {
        let now = Utc::now().timestamp();
        sign::authorization(
            &self.config.secret_id,
            &self.config.secret_key,
            method.as_str(),
            path,
            params,
            &[("host", self.host.as_str())],
            now - SIGN_SKEW_SECS,
            now + SIGN_EXPIRE_SECS,
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.api_address, encode_key(key))
    }

    async fn send_object(&self, method: Method, key: &str, body: Option<ObjectBody>) -> Result<()> {
        // 空键会变成对存储桶本身的请求
        let key = object_key(key)?;
        let auth = self.authorization(&method, &format!("/{}", key), &[]);
        tracing::debug!("COS {} {}", method, key);

        let mut req = self
            .client
            .request(method, self.object_url(key))
            .header(AUTHORIZATION, auth);
        if let Some(body) = body {
            req = with_object_body(req, body);
        }
        check_status(req.send().await?).await?;
        Ok(())
    }

    /// One `GET Bucket` page starting after `marker` / 获取一页列表
    async fn list_page(&self, prefix: &str, marker: String) -> Result<ListingPage> {
        let params = [("prefix", prefix), ("delimiter", "/"), ("marker", marker.as_str())];
        let auth = self.authorization(&Method::GET, "/", &params);
        tracing::debug!("COS list prefix={:?} marker={:?}", prefix, marker);

        let resp = self
            .client
            .get(format!("{}/", self.api_address))
            .query(&params)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let text = check_status(resp).await?.text().await?;
        Ok(ListBucketResult::parse(&text)?.into_page(prefix))
    }
}

#[async_trait]
impl StorageAdapter for CosAdapter {
    fn name(&self) -> &str {
        "COS"
    }

    fn custom_domain(&self) -> &str {
        &self.config.domain
    }

    fn default_endpoint(&self) -> String {
        self.api_address.clone()
    }

    async fn list(&self, prefix: &str) -> Result<ListingPage> {
        // 从前缀本身开始列举，跳过目录占位对象
        drain_marker_pages(prefix.to_string(), |marker| self.list_page(prefix, marker)).await
    }

    async fn put_object(&self, key: &str, body: ObjectBody) -> Result<()> {
        self.send_object(Method::PUT, key, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send_object(Method::DELETE, path, None).await
    }
}
