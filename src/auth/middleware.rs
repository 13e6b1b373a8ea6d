//! 认证中间件模块

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use super::{jwt::verify_token, AuthError};
use crate::shared::AppError;

/// 认证中间件状态
#[derive(Debug, Clone)]
pub struct AuthState {
    access_token_secret: Arc<str>,
}

impl AuthState {
    pub fn new(access_token_secret: impl Into<Arc<str>>) -> Self {
        Self {
            access_token_secret: access_token_secret.into(),
        }
    }
}

/// Bearer Token 认证中间件
///
/// 验证通过后将 [`Claims`](super::Claims) 放入请求扩展。
pub async fn bearer_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.access_token_secret.is_empty() {
        warn!("未配置访问令牌密钥");
        return Err(AppError::Unauthorized("Access token secret is required.".to_string()));
    }

    let token = extract_bearer_token(request.headers()).ok_or_else(|| {
        warn!("未授权访问: 未提供Token");
        AppError::from(AuthError::MissingToken)
    })?;

    let claims = verify_token(&token, &state.access_token_secret).map_err(|e| {
        warn!("无效或过期的Token: {}", e);
        AppError::from(e)
    })?;

    info!("认证成功: {}", serde_json::Value::Object(claims.metadata.clone()));

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// 从Authorization header中提取Bearer token
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
