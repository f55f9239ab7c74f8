use std::sync::Arc;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiResponse;
use crate::auth::token_matches;
use crate::state::AppState;

/// GET /ping - 连通性检测
pub async fn ping() -> Json<Value> {
    Json(json!({ "ping": "PONG" }))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub token: String,
}

/// GET /login?token= - 校验管理令牌
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Json<ApiResponse> {
    if !token_matches(&query.token, &state.config.auth.token) {
        tracing::warn!("Login rejected: token mismatch");
        return Json(ApiResponse::error(401, "token error"));
    }
    Json(ApiResponse::ok_with(Value::String(state.config.auth.token.clone())))
}

/// GET /get_upload_config - 快捷上传配置
pub async fn get_upload_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "code": 200,
        "utoken": state.config.auth.utoken,
        "url": state.config.auth.default,
    }))
}
