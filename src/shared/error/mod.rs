//! 统一错误处理模块
//!
//! 各模块的错误在 HTTP 边界统一转换为 [`AppError`]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::infrastructure::config::ConfigError;
use crate::infrastructure::lifecycle::LifecycleError;
use crate::infrastructure::mail::{MailError, TemplateError};
use crate::infrastructure::storage::StorageError;

/// 应用程序统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooManyRequests(String),

    /// 非业务预期的错误，响应中不暴露原因
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// 获取HTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }

    /// 客户端可见的错误信息
    pub fn public_message(&self) -> String {
        if self.is_operational() {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_code = self.error_code();

        if self.is_operational() {
            tracing::warn!(status = ?status_code, error_code = error_code, error = %self, "请求处理失败");
        } else {
            tracing::error!(status = ?status_code, error_code = error_code, error = %self, "处理请求时发生内部错误");
        }

        let body = Json(json!({
            "status": if self.is_operational() { "error" } else { "fail" },
            "message": self.public_message(),
            "code": error_code,
        }));

        (status_code, body).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotInitialized { .. } | LifecycleError::NotConnected { .. } => {
                AppError::BadRequest(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSecret | AuthError::InvalidInput(_) => AppError::BadRequest(err.to_string()),
            AuthError::Hashing(_) => AppError::Internal(err.to_string()),
            _ => AppError::Unauthorized(err.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::NoRecipients | MailError::InvalidAddress(_) => AppError::BadRequest(err.to_string()),
            MailError::Lifecycle(inner) => inner.into(),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::MissingPath => AppError::BadRequest(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingKey => AppError::BadRequest(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 请求错误构造宏
#[macro_export]
macro_rules! bad_request {
    ($msg:expr) => {
        $crate::shared::error::AppError::BadRequest($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::BadRequest(format!($fmt, $($arg)*))
    };
}

/// 内部错误构造宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Internal(format!($fmt, $($arg)*))
    };
}
