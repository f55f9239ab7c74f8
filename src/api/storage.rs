//! `/api/:backend?operate=` dispatch / 存储操作分发

use std::io::{self, SeekFrom};
use std::str::FromStr;
use std::sync::Arc;
use anyhow::{anyhow, Result};
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        rejection::QueryRejection,
        FromRequest, Multipart, Path, Query, Request, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::api::{ApiResponse, ListResponse};
use crate::auth;
use crate::state::AppState;
use crate::storage::{AdapterBox, Backend, ObjectBody, OperationResult};

/// Supported `operate` values / 支持的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operate {
    List,
    Delete,
    Upload,
    Mkdir,
    Domain,
}

impl FromStr for Operate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Operate::List),
            "delete" => Ok(Operate::Delete),
            "upload" => Ok(Operate::Upload),
            "mkdir" => Ok(Operate::Mkdir),
            "domain" => Ok(Operate::Domain),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OperateQuery {
    pub operate: Option<String>,
    pub prefix: Option<String>,
    pub path: Option<String>,
    pub dirname: Option<String>,
}

/// Bounded chunk queue between the multipart reader and the backend request / 上传通道容量
const UPLOAD_CHANNEL_CAPACITY: usize = 32;

/// Why an upload failed: the client's form, or the backend write / 上传失败原因
#[derive(Debug)]
enum UploadFailure {
    Form(anyhow::Error),
    Backend(anyhow::Error),
}

impl From<MultipartError> for UploadFailure {
    fn from(e: MultipartError) -> Self {
        UploadFailure::Form(anyhow!(e.body_text()))
    }
}

impl From<io::Error> for UploadFailure {
    fn from(e: io::Error) -> Self {
        UploadFailure::Form(anyhow!("failed to spool upload: {}", e))
    }
}

/// Keep only the last path component of a client supplied filename
fn sanitize_filename(raw: &str) -> &str {
    raw.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(raw)
}

/// Copy a file part to an anonymous temp file, ready to be read from the start / 写入临时文件
async fn spool_field(mut field: Field<'_>) -> Result<ObjectBody, UploadFailure> {
    let mut spool = tokio::fs::File::from_std(tempfile::tempfile()?);
    let mut length = 0u64;
    while let Some(chunk) = field.chunk().await? {
        spool.write_all(&chunk).await?;
        length += chunk.len() as u64;
    }
    spool.flush().await?;
    spool.seek(SeekFrom::Start(0)).await?;
    Ok(ObjectBody::from_file(spool, length))
}

/// Forward a file part chunk by chunk while the backend request is in flight / 流式转发
async fn stream_field(
    adapter: &AdapterBox,
    prefix: &str,
    filename: &str,
    mut field: Field<'_>,
) -> Result<String, UploadFailure> {
    let (tx, rx) = mpsc::channel(UPLOAD_CHANNEL_CAPACITY);
    let pump = async move {
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    // 后端已结束请求
                    if tx.send(Ok(chunk)).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    let message = e.body_text();
                    let _ = tx.send(Err(io::Error::new(io::ErrorKind::UnexpectedEof, message.clone()))).await;
                    return Err(UploadFailure::Form(anyhow!(message)));
                }
            }
        }
    };
    let write = adapter.upload(prefix, filename, ObjectBody::from_channel(rx));

    let (pumped, written) = tokio::join!(pump, write);
    pumped?;
    written.map_err(UploadFailure::Backend)
}

/// Read `prefix` (or `path`) and `file` from the multipart body and write the file / 处理上传表单
///
/// A file part that follows `prefix` is streamed straight to the backend. One that arrives
/// before it is spooled to a temp file until the form has been read.
async fn upload_form(adapter: &AdapterBox, request: Request) -> Result<String, UploadFailure> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| UploadFailure::Form(anyhow!(e.body_text())))?;

    let mut prefix: Option<String> = None;
    let mut fallback_path: Option<String> = None;
    let mut spooled: Option<(String, ObjectBody)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "prefix" => prefix = Some(field.text().await?),
            "path" => fallback_path = Some(field.text().await?),
            "file" => {
                let filename = field
                    .file_name()
                    .map(|f| sanitize_filename(f).to_string())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| UploadFailure::Form(anyhow!("file field has no filename")))?;
                if let Some(prefix) = &prefix {
                    tracing::info!("Streaming upload to {}: {}{}", adapter.name(), prefix, filename);
                    return stream_field(adapter, prefix, &filename, field).await;
                }
                let body = spool_field(field).await?;
                spooled = Some((filename, body));
            }
            _ => {}
        }
    }

    let (filename, body) = spooled.ok_or_else(|| UploadFailure::Form(anyhow!("missing file field")))?;
    let prefix = prefix.or(fallback_path).unwrap_or_default();
    tracing::info!(
        "Upload to {}: {}{} ({} bytes)",
        adapter.name(),
        prefix,
        filename,
        body.content_length().unwrap_or_default()
    );
    adapter
        .upload(&prefix, &filename, body)
        .await
        .map_err(UploadFailure::Backend)
}

async fn handle_upload(adapter: &AdapterBox, request: Request) -> ApiResponse {
    match upload_form(adapter, request).await {
        Ok(url) => OperationResult::Success(Some(url)).into(),
        Err(UploadFailure::Form(e)) => {
            tracing::warn!("Malformed upload request: {:#}", e);
            OperationResult::Failure(format!("ErrorUpload:{}", e)).into()
        }
        Err(UploadFailure::Backend(e)) => OperationResult::from_result("ObjectUpload", Err(e)).into(),
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("`{}` is required", name))
}

/// GET|POST /api/:backend?operate=list|delete|upload|mkdir|domain
pub async fn storage_api(
    State(state): State<Arc<AppState>>,
    Path(backend): Path<String>,
    query: Result<Query<OperateQuery>, QueryRejection>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let query = query.map(|Query(q)| q);
    let operate = query
        .as_ref()
        .ok()
        .and_then(|q| q.operate.clone())
        .unwrap_or_default();
    let op = operate.parse::<Operate>().ok();

    let grant = match auth::authorize(&headers, &state.config.auth, op == Some(Operate::Upload)) {
        Ok(grant) => grant,
        Err(message) => {
            tracing::warn!("Rejected /api/{} operate={}: {}", backend, operate, message);
            return Json(ApiResponse::error(401, message)).into_response();
        }
    };
    tracing::debug!("/api/{} operate={} authorized: {:?}", backend, operate, grant);

    let query = match query {
        Ok(query) => query,
        Err(rejection) => return Json(ApiResponse::error(400, rejection.body_text())).into_response(),
    };

    let Ok(selected) = backend.parse::<Backend>() else {
        return Json(ApiResponse::error(400, format!("unknown backend: {}", backend))).into_response();
    };
    let Some(op) = op else {
        return Json(ApiResponse::error(400, format!("unknown operate: {}", operate))).into_response();
    };
    let Some(adapter) = state.storages.get(selected) else {
        return Json(ApiResponse::error(400, format!("backend not configured: {}", selected))).into_response();
    };

    let response: ApiResponse = match op {
        Operate::List => {
            let prefix = query.prefix.or(query.path).unwrap_or_default();
            match adapter.list(&prefix).await {
                Ok(page) => return Json(ListResponse::new(adapter.resolve_domain(), page.items)).into_response(),
                Err(e) => OperationResult::from_result("ListObject", Err(e)).into(),
            }
        }
        Operate::Delete => {
            let result = match required(&query.path, "path") {
                Ok(path) => adapter.delete(path).await.map(|_| None),
                Err(e) => Err(e),
            };
            OperationResult::from_result("ObjectDelete", result).into()
        }
        Operate::Upload => handle_upload(&adapter, request).await,
        Operate::Mkdir => {
            let prefix = query.prefix.clone().unwrap_or_default();
            let result = match required(&query.dirname, "dirname") {
                Ok(dirname) => adapter.mkdir(&prefix, dirname).await.map(|_| None),
                Err(e) => Err(e),
            };
            OperationResult::from_result("Mkdir", result).into()
        }
        Operate::Domain => ApiResponse::message(200, adapter.resolve_domain()),
    };

    Json(response).into_response()
}
