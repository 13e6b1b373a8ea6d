//! 密码处理模块
//!
//! bcrypt 计算较慢，放到阻塞线程池执行。

use tracing::{error, info};

use super::AuthError;
use crate::shared::constants::password::{MAX_COST, MIN_COST};

/// 哈希密码
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    if password.trim().is_empty() {
        error!("无效的密码: 不能为空");
        return Err(AuthError::InvalidInput(
            "Invalid password: must be a non-empty string".to_string(),
        ));
    }
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        error!("无效的哈希强度: {}", cost);
        return Err(AuthError::InvalidInput(format!(
            "Invalid cost: must be between {} and {}",
            MIN_COST, MAX_COST
        )));
    }

    info!("正在计算密码哈希...");
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| {
            error!("密码哈希失败: {}", e);
            AuthError::Hashing(e.to_string())
        })?;

    info!("密码哈希完成");
    Ok(hashed)
}

/// 验证密码
pub async fn compare_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hashed = hashed.to_string();

    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| {
            error!("密码比对失败: {}", e);
            AuthError::Hashing(e.to_string())
        })?;

    info!(result, "密码比对完成");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_compare() {
        let hashed = hash_password("correct horse", MIN_COST).await.unwrap();
        assert_ne!(hashed, "correct horse");

        assert!(compare_password("correct horse", &hashed).await.unwrap());
        assert!(!compare_password("battery staple", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_rejects_invalid_input() {
        assert!(matches!(hash_password("   ", 10).await, Err(AuthError::InvalidInput(_))));
        assert!(matches!(hash_password("pw", 3).await, Err(AuthError::InvalidInput(_))));
        assert!(matches!(hash_password("pw", 16).await, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_compare_with_malformed_hash() {
        assert!(matches!(
            compare_password("pw", "not-a-bcrypt-hash").await,
            Err(AuthError::Hashing(_))
        ));
    }
}
