//! 认证处理器

use axum::{response::Json, Extension};
use serde_json::Value;
use tracing::instrument;

use crate::auth::Claims;

/// 返回当前Token携带的身份信息
#[instrument(skip(claims))]
pub async fn get_current_user(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(serde_json::json!({
        "user": Value::Object(claims.metadata),
        "expiresAt": claims.exp,
    }))
}
