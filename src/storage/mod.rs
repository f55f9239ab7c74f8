use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream, Stream};
use serde::Serialize;
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;

use crate::utils::{dir_marker_key, join_key, strip_query_prefix};

pub mod registry;
#[cfg(test)]
pub mod memory;

pub use registry::{AdapterBox, Backend, StorageRegistry};

/// Listing entry returned to the front-end / 列表条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    /// Name relative to the queried prefix / 相对查询前缀的名称
    pub filename: String,
    /// The queried prefix / 查询前缀
    pub prefix: String,
    pub is_dir: bool,
    /// Only present for files / 仅文件有大小
    pub size: Option<u64>,
    /// Last modified, absent for directories / 最后修改时间
    pub create_time: Option<String>,
}

impl ObjectEntry {
    /// Directory entry from a common prefix / 目录条目
    pub fn dir(full_key: &str, prefix: &str) -> Self {
        Self {
            filename: strip_query_prefix(full_key, prefix),
            prefix: prefix.to_string(),
            is_dir: true,
            size: None,
            create_time: None,
        }
    }

    /// File entry from an object / 文件条目
    pub fn file(full_key: &str, prefix: &str, size: u64, modified: String) -> Self {
        Self {
            filename: strip_query_prefix(full_key, prefix),
            prefix: prefix.to_string(),
            is_dir: false,
            size: Some(size),
            create_time: Some(modified),
        }
    }
}

/// One page of a native listing, or a fully drained listing / 列表分页
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<ObjectEntry>,
    /// Continuation cursor (marker / iter) / 续传游标
    pub cursor: Option<String>,
    pub truncated: bool,
}

impl ListingPage {
    /// A complete listing: no cursor, not truncated / 完整列表
    pub fn complete(items: Vec<ObjectEntry>) -> Self {
        Self {
            items,
            cursor: None,
            truncated: false,
        }
    }
}

/// Outcome of one adapter operation / 操作结果
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Success(Option<String>),
    Failure(String),
}

impl OperationResult {
    /// Convert an adapter result, tagging failures as `Error<op>:<message>` / 转换操作结果
    pub fn from_result(op: &str, result: Result<Option<String>>) -> Self {
        match result {
            Ok(payload) => OperationResult::Success(payload),
            Err(e) => {
                tracing::warn!("Storage operation {} failed: {:#}", op, e);
                OperationResult::Failure(format!("Error{}:{}", op, e))
            }
        }
    }
}

/// Chunked object content / 对象数据流
pub type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Content handed to [`StorageAdapter::put_object`], never fully held in memory
/// unless it started out that way / 上传内容
pub struct ObjectBody {
    length: Option<u64>,
    stream: ChunkStream,
}

impl ObjectBody {
    /// Zero-byte body (directory markers) / 空内容
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes(content: Bytes) -> Self {
        Self {
            length: Some(content.len() as u64),
            stream: Box::pin(stream::once(future::ready(Ok(content)))),
        }
    }

    /// Spooled file of known length, read from its current position / 临时文件
    pub fn from_file(file: tokio::fs::File, length: u64) -> Self {
        Self {
            length: Some(length),
            stream: Box::pin(ReaderStream::new(file)),
        }
    }

    /// Chunks pushed by a producer as they arrive; the length is unknown / 通道数据流
    ///
    /// An `Err` item aborts the write, so a truncated source never lands as a complete object.
    pub fn from_channel(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        Self {
            length: None,
            stream: Box::pin(ReceiverStream::new(rx)),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.length
    }

    pub fn into_stream(self) -> ChunkStream {
        self.stream
    }
}

/// Custom domain if configured, else the default endpoint plus `/` / 解析访问域名
pub fn resolve_domain(custom: &str, default_endpoint: &str) -> String {
    if custom.is_empty() {
        format!("{}/", default_endpoint)
    } else {
        custom.to_string()
    }
}

/// Follow marker pagination until the backend reports the listing complete / 遍历分页
///
/// `fetch` receives the marker for the next request. A truncated page without a new
/// marker is an error rather than an endless loop.
pub async fn drain_marker_pages<F, Fut>(initial_marker: String, mut fetch: F) -> Result<ListingPage>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ListingPage>>,
{
    let mut items = Vec::new();
    let mut marker = initial_marker;
    let mut pages = 0usize;

    loop {
        let page = fetch(marker.clone()).await?;
        pages += 1;
        items.extend(page.items);

        if !page.truncated {
            break;
        }
        match page.cursor {
            Some(next) if !next.is_empty() && next != marker => marker = next,
            _ => return Err(anyhow!("truncated listing without a new marker after {} pages", pages)),
        }
    }

    tracing::debug!("Listing drained: {} pages, {} entries", pages, items.len());
    Ok(ListingPage::complete(items))
}

/// Capacity of the channel feeding a streamed listing / 列表通道容量
pub const LIST_CHANNEL_CAPACITY: usize = 10;

/// Run a cursor listing in a background task, sending each page's entries into a
/// bounded channel / 后台拉取分页并写入通道
///
/// `fetch` receives the cursor (empty for the first page). The producer stops at the
/// first error, at the last page, or when the receiver is dropped.
pub fn spawn_page_stream<F, Fut>(mut fetch: F) -> mpsc::Receiver<Result<Vec<ObjectEntry>>>
where
    F: FnMut(String) -> Fut + Send + 'static,
    Fut: Future<Output = Result<ListingPage>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LIST_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut cursor = String::new();
        loop {
            let page = match fetch(cursor.clone()).await {
                Ok(page) => page,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            if tx.send(Ok(page.items)).await.is_err() {
                return;
            }
            if !page.truncated {
                return;
            }
            match page.cursor {
                Some(next) if !next.is_empty() && next != cursor => cursor = next,
                _ => {
                    let _ = tx.send(Err(anyhow!("listing cursor did not advance"))).await;
                    return;
                }
            }
        }
    });
    rx
}

/// Drain a channel-fed listing; the first error ends it / 收集通道中的列表
pub async fn collect_channel(mut rx: mpsc::Receiver<Result<Vec<ObjectEntry>>>) -> Result<ListingPage> {
    let mut items = Vec::new();
    while let Some(batch) = rx.recv().await {
        items.extend(batch?);
    }
    Ok(ListingPage::complete(items))
}

/// Storage operation contract implemented by every backend / 存储适配器接口
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Adapter name for logs / 适配器名称
    fn name(&self) -> &str;

    /// Configured custom public domain, possibly empty / 自定义域名
    fn custom_domain(&self) -> &str;

    /// Backend default endpoint without trailing slash / 默认访问地址
    fn default_endpoint(&self) -> String;

    /// List entries directly under `prefix`, all pages drained / 列出目录
    async fn list(&self, prefix: &str) -> Result<ListingPage>;

    /// Write `body` at `key`; an empty key is rejected / 写入对象
    async fn put_object(&self, key: &str, body: ObjectBody) -> Result<()>;

    /// Delete exactly the object at `path` / 删除对象
    async fn delete(&self, path: &str) -> Result<()>;

    /// Upload a file and return its public URL / 上传文件并返回访问地址
    async fn upload(&self, prefix: &str, filename: &str, body: ObjectBody) -> Result<String> {
        let key = join_key(prefix, filename);
        self.put_object(&key, body).await?;
        Ok(format!("{}{}", self.resolve_domain(), key))
    }

    /// Create a zero-byte directory marker / 创建目录
    async fn mkdir(&self, prefix: &str, dirname: &str) -> Result<()> {
        self.put_object(&dir_marker_key(prefix, dirname), ObjectBody::empty()).await
    }

    /// Public domain, recomputed on each call / 访问域名
    fn resolve_domain(&self) -> String {
        resolve_domain(self.custom_domain(), &self.default_endpoint())
    }
}
