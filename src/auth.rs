use axum::http::HeaderMap;

use crate::config::AuthConfig;

/// Full-access token header / 管理令牌请求头
pub const TOKEN_HEADER: &str = "token";
/// Upload-scoped token header / 上传令牌请求头
pub const UPLOAD_TOKEN_HEADER: &str = "utoken";

/// Granted access level / 授权级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Full,
    UploadOnly,
}

/// Compare a presented token with the configured one; an unset token never matches
pub fn token_matches(presented: &str, configured: &str) -> bool {
    !configured.is_empty() && presented == configured
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Authorize an API request / 验证请求权限
///
/// A matching upload token only admits the upload operation; everything else needs the
/// full token.
pub fn authorize(headers: &HeaderMap, auth: &AuthConfig, is_upload: bool) -> Result<Grant, &'static str> {
    if is_upload && token_matches(header_str(headers, UPLOAD_TOKEN_HEADER), &auth.utoken) {
        return Ok(Grant::UploadOnly);
    }
    if token_matches(header_str(headers, TOKEN_HEADER), &auth.token) {
        return Ok(Grant::Full);
    }
    Err("token error")
}
