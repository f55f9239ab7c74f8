use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, DATE},
    Client, Method,
};

use super::sign;
use crate::config::OssConfig;
use crate::drivers::{build_client, check_status, with_object_body, ListBucketResult};
use crate::storage::{drain_marker_pages, ListingPage, ObjectBody, StorageAdapter};
use crate::utils::{encode_key, http_date, object_key, split_endpoint};

const OBJECT_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_KEYS: &str = "1000";

/// OSS adapter / OSS适配器
pub struct OssAdapter {
    config: OssConfig,
    client: Client,
    /// Virtual-hosted bucket URL, `https://<bucket>.<endpoint>`
    bucket_url: String,
}

impl OssAdapter {
    pub fn new(config: OssConfig) -> Result<Self> {
        let (scheme, host) = split_endpoint(&config.endpoint);
        let bucket_url = format!("{}://{}.{}", scheme, config.bucket, host);
        Self::with_bucket_url(config, bucket_url)
    }

    /// Adapter talking to an explicit bucket URL / 指定Bucket地址
    pub fn with_bucket_url(config: OssConfig, bucket_url: String) -> Result<Self> {
        Ok(Self {
            config,
            client: build_client()?,
            bucket_url,
        })
    }

    fn authorization(&self, method: &Method, content_type: &str, date: &str, key: &str) -> String {
        let resource = format!("/{}/{}", self.config.bucket, key);
        let string_to_sign = sign::string_to_sign(method.as_str(), "", content_type, date, &resource);
        sign::authorization(&self.config.access_key_id, &self.config.access_key_secret, &string_to_sign)
    }

    async fn send_object(&self, method: Method, key: &str, body: Option<ObjectBody>) -> Result<()> {
        // 资源 `/<bucket>/` 指向存储桶本身
        let key = object_key(key)?;
        let date = http_date();
        let content_type = if body.is_some() { OBJECT_CONTENT_TYPE } else { "" };
        let auth = self.authorization(&method, content_type, &date, key);
        tracing::debug!("OSS {} {}", method, key);

        let mut req = self
            .client
            .request(method, format!("{}/{}", self.bucket_url, encode_key(key)))
            .header(DATE, &date)
            .header(AUTHORIZATION, auth);
        if let Some(body) = body {
            req = with_object_body(req.header(CONTENT_TYPE, content_type), body);
        }
        check_status(req.send().await?).await?;
        Ok(())
    }

    /// One `GetBucket` page after `marker` / 获取一页列表
    async fn list_page(&self, prefix: &str, marker: String) -> Result<ListingPage> {
        let date = http_date();
        let auth = self.authorization(&Method::GET, "", &date, "");
        tracing::debug!("OSS list prefix={:?} marker={:?}", prefix, marker);

        let resp = self
            .client
            .get(format!("{}/", self.bucket_url))
            .query(&[
                ("prefix", prefix),
                ("delimiter", "/"),
                ("marker", marker.as_str()),
                ("max-keys", MAX_KEYS),
            ])
            .header(DATE, &date)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let text = check_status(resp).await?.text().await?;
        Ok(ListBucketResult::parse(&text)?.into_page(prefix))
    }
}

#[async_trait]
impl StorageAdapter for OssAdapter {
    fn name(&self) -> &str {
        "OSS"
    }

    fn custom_domain(&self) -> &str {
        &self.config.domain
    }

    fn default_endpoint(&self) -> String {
        self.bucket_url.clone()
    }

    async fn list(&self, prefix: &str) -> Result<ListingPage> {
        drain_marker_pages(prefix.to_string(), |marker| self.list_page(prefix, marker)).await
    }

    async fn put_object(&self, key: &str, body: ObjectBody) -> Result<()> {
        self.send_object(Method::PUT, key, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send_object(Method::DELETE, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::drivers::mock::MockServer;

    fn config(domain: &str) -> OssConfig {
        OssConfig {
            access_key_id: "ak".to_string(),
            access_key_secret: "sk".to_string(),
            bucket: "bkt".to_string(),
            endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
            domain: domain.to_string(),
        }
    }

    async fn mocked<F>(domain: &str, responder: F) -> (OssAdapter, MockServer)
    where
        F: Fn(&crate::drivers::mock::RecordedRequest) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let server = MockServer::start(responder).await;
        let adapter = OssAdapter::with_bucket_url(config(domain), server.base_url.clone()).unwrap();
        (adapter, server)
    }

    fn adapter(endpoint: &str, domain: &str) -> OssAdapter {
        OssAdapter::new(OssConfig {
            access_key_id: "ak".to_string(),
            access_key_secret: "sk".to_string(),
            bucket: "bkt".to_string(),
            endpoint: endpoint.to_string(),
            domain: domain.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_bucket_url_from_endpoint() {
        assert_eq!(adapter("oss-cn-hangzhou.aliyuncs.com", "").bucket_url, "https://bkt.oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(adapter("http://oss-cn-beijing.aliyuncs.com/", "").bucket_url, "http://bkt.oss-cn-beijing.aliyuncs.com");
    }

    #[test]
    fn test_resolve_domain() {
        assert_eq!(adapter("oss-cn-hangzhou.aliyuncs.com", "").resolve_domain(), "https://bkt.oss-cn-hangzhou.aliyuncs.com/");
        assert_eq!(adapter("oss-cn-hangzhou.aliyuncs.com", "https://img.example.com/").resolve_domain(), "https://img.example.com/");
    }

    #[test]
    fn test_signed_resource_includes_bucket() {
        let oss = adapter("oss-cn-hangzhou.aliyuncs.com", "");
        let expected = sign::authorization("ak", "sk", "PUT\n\napplication/octet-stream\nd\n/bkt/docs/a.txt");
        assert_eq!(oss.authorization(&Method::PUT, OBJECT_CONTENT_TYPE, "d", "docs/a.txt"), expected);
    }

    #[tokio::test]
    async fn test_list_follows_next_marker() {
        let (oss, server) = mocked("", |req| {
            let body = match req.query("marker") {
                Some("docs/") => "<ListBucketResult><IsTruncated>true</IsTruncated><NextMarker>docs/b.md</NextMarker>\
                    <Contents><Key>docs/</Key><Size>0</Size></Contents>\
                    <Contents><Key>docs/a.md</Key><LastModified>2024-03-01T08:00:00.000Z</LastModified><Size>1</Size></Contents>\
                    <Contents><Key>docs/b.md</Key><LastModified>2024-03-01T08:00:00.000Z</LastModified><Size>2</Size></Contents>\
                    </ListBucketResult>",
                _ => "<ListBucketResult><IsTruncated>false</IsTruncated>\
                    <Contents><Key>docs/c.md</Key><LastModified>2024-03-01T08:00:00.000Z</LastModified><Size>3</Size></Contents>\
                    <CommonPrefixes><Prefix>docs/img/</Prefix></CommonPrefixes>\
                    </ListBucketResult>",
            };
            (StatusCode::OK, body.to_string())
        })
        .await;

        let listing = oss.list("docs/").await.unwrap();
        let names: Vec<_> = listing.items.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md", "img/", "c.md"]);

        let requests = server.requests();
        let markers: Vec<_> = requests.iter().map(|r| r.query("marker").unwrap_or("")).collect();
        assert_eq!(markers, vec!["docs/", "docs/b.md"]);
        assert!(requests.iter().all(|r| r.query("max-keys") == Some(MAX_KEYS)));
        assert!(requests[0].header("authorization").unwrap().starts_with("OSS ak:"));
        assert!(requests[0].header("date").is_some());
    }

    #[tokio::test]
    async fn test_upload_and_mkdir_twice() {
        let (oss, server) = mocked("https://img.example.com/", |_| (StatusCode::OK, String::new())).await;

        let url = oss
            .upload("img/", "a.png", ObjectBody::from_bytes(bytes::Bytes::from_static(b"png")))
            .await
            .unwrap();
        assert_eq!(url, "https://img.example.com/img/a.png");
        oss.mkdir("img/", "2024").await.unwrap();
        oss.mkdir("img/", "2024").await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].path, "/img/a.png");
        assert_eq!(requests[0].header("content-type"), Some(OBJECT_CONTENT_TYPE));
        assert_eq!(&requests[0].body[..], b"png");
        assert_eq!(requests[1].path, "/img/2024/");
        assert_eq!(requests[2].path, "/img/2024/");
        assert!(requests[2].body.is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_targets_the_bucket() {
        let (oss, server) = mocked("", |_| (StatusCode::NO_CONTENT, String::new())).await;
        assert!(oss.delete("/").await.is_err());
        assert!(oss.delete("//").await.is_err());
        assert!(server.requests().is_empty());

        oss.delete("img/a.png").await.unwrap();
        let requests = server.requests();
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].path, "/img/a.png");
    }
}
