//! 认证和授权模块
//!
//! 提供JWT签发与验证、密码哈希以及Bearer认证中间件

pub mod jwt;
pub mod middleware;
pub mod password;

// 重新导出常用类型
pub use jwt::{generate_token, parse_expiry, verify_token, Claims, TokenOptions};
pub use middleware::{bearer_auth, AuthState};
pub use password::{compare_password, hash_password};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing secret for token generation")]
    MissingSecret,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unauthorized. No token provided.")]
    MissingToken,
    #[error("Invalid or expired authorization token.")]
    TokenExpired,
    #[error("Invalid or expired authorization token.")]
    InvalidToken,
    #[error("密码处理失败: {0}")]
    Hashing(String),
}
