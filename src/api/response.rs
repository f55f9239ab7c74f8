use serde::Serialize;
use serde_json::Value;

use crate::storage::{ObjectEntry, OperationResult};

/// Simple envelope: `{"code","message","data"?}` / 通用响应
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self::message(200, "ok")
    }

    pub fn ok_with(data: Value) -> Self {
        Self {
            code: 200,
            message: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn message(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::message(code, message)
    }
}

impl From<OperationResult> for ApiResponse {
    fn from(result: OperationResult) -> Self {
        match result {
            OperationResult::Success(Some(payload)) => ApiResponse::ok_with(Value::String(payload)),
            OperationResult::Success(None) => ApiResponse::ok(),
            OperationResult::Failure(message) => ApiResponse::error(500, message),
        }
    }
}

/// Listing envelope: `{"code","message","data","count"}`; `data` is null when empty / 列表响应
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub code: i32,
    pub message: String,
    pub data: Option<Vec<ObjectEntry>>,
    pub count: usize,
}

impl ListResponse {
    pub fn new(domain: String, items: Vec<ObjectEntry>) -> Self {
        let count = items.len();
        Self {
            code: 200,
            message: domain,
            data: if items.is_empty() { None } else { Some(items) },
            count,
        }
    }
}
