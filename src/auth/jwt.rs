//! JWT Token处理模块

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use super::AuthError;
use crate::shared::constants::jwt::DEFAULT_EXPIRY;

/// JWT Claims结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,             // 过期时间
    pub iat: i64,             // 签发时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,  // 签发者
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// 签发选项
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    /// 有效期，如 `"15m"`、`"1h"`、`"7d"`；缺省为一小时
    pub expires_in: Option<String>,
    pub issuer: Option<String>,
}

impl TokenOptions {
    pub fn expires_in(expiry: impl Into<String>) -> Self {
        Self {
            expires_in: Some(expiry.into()),
            ..Self::default()
        }
    }
}

/// 解析有效期字符串
///
/// 支持 `s`/`m`/`h`/`d` 后缀，纯数字按秒计算。
pub fn parse_expiry(expiry: &str) -> Result<Duration, AuthError> {
    let expiry = expiry.trim();
    let invalid = || AuthError::InvalidInput(format!("Invalid token expiry: {}", expiry));

    let (digits, unit_seconds) = match expiry.char_indices().last() {
        Some((idx, 's')) => (&expiry[..idx], 1),
        Some((idx, 'm')) => (&expiry[..idx], 60),
        Some((idx, 'h')) => (&expiry[..idx], 3600),
        Some((idx, 'd')) => (&expiry[..idx], 86_400),
        Some(_) => (expiry, 1),
        None => return Err(invalid()),
    };

    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let seconds = amount
        .checked_mul(unit_seconds)
        .filter(|s| *s <= i64::MAX / 1000)
        .ok_or_else(invalid)?;

    Ok(Duration::seconds(seconds))
}

/// 签发 Token
///
/// `metadata` 必须是 JSON 对象，其字段会平铺到 claims 中。
pub fn generate_token(metadata: &Value, secret: &str, options: &TokenOptions) -> Result<String, AuthError> {
    if secret.is_empty() {
        error!("Token生成失败: 缺少签名密钥");
        return Err(AuthError::MissingSecret);
    }

    let mut metadata = match metadata {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => {
            error!("Token生成失败: metadata 必须是对象");
            return Err(AuthError::InvalidInput(
                "Invalid metadata: must be a non-array object".to_string(),
            ));
        }
    };
    // 保留字段由签发过程决定
    for reserved in ["exp", "iat", "iss"] {
        metadata.remove(reserved);
    }

    let expiry = parse_expiry(options.expires_in.as_deref().unwrap_or(DEFAULT_EXPIRY))?;
    let now = Utc::now();

    let claims = Claims {
        exp: (now + expiry).timestamp(),
        iat: now.timestamp(),
        iss: options.issuer.clone(),
        metadata,
    };

    info!("正在签发Token: {}", serde_json::Value::Object(claims.metadata.clone()));

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        error!("Token生成失败: {}", e);
        AuthError::InvalidInput("Token generation failed due to an internal error.".to_string())
    })?;

    info!("Token签发成功");
    Ok(token)
}

/// 验证 Token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_expiry("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_expiry("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_expiry("90").unwrap(), Duration::seconds(90));
        assert_eq!(parse_expiry("30s").unwrap(), Duration::seconds(30));

        for bad in ["", "h", "-1h", "0m", "1w", "abc"] {
            assert!(parse_expiry(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_generate_and_verify() {
        let token = generate_token(&json!({"userId": "42", "role": "admin"}), "secret", &TokenOptions::default()).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.metadata["userId"], "42");
        assert_eq!(claims.metadata["role"], "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.iss.is_none());
    }

    #[test]
    fn test_custom_expiry_and_issuer() {
        let options = TokenOptions {
            expires_in: Some("15m".to_string()),
            issuer: Some("backend-kit".to_string()),
        };
        let token = generate_token(&json!({}), "secret", &options).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.iss.as_deref(), Some("backend-kit"));
    }

    #[test]
    fn test_reserved_metadata_is_ignored() {
        let token = generate_token(&json!({"exp": 1}), "secret", &TokenOptions::default()).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_generate_rejects_bad_input() {
        assert!(matches!(
            generate_token(&json!({}), "", &TokenOptions::default()),
            Err(AuthError::MissingSecret)
        ));
        assert!(matches!(
            generate_token(&json!([1, 2]), "secret", &TokenOptions::default()),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(generate_token(&json!({}), "secret", &TokenOptions::expires_in("soon")).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_secret_and_expired() {
        let token = generate_token(&json!({}), "secret", &TokenOptions::default()).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AuthError::InvalidToken)));

        let now = Utc::now().timestamp();
        let expired = Claims {
            exp: now - 3600,
            iat: now - 7200,
            iss: None,
            metadata: Map::new(),
        };
        let token = encode(&Header::default(), &expired, &EncodingKey::from_secret(b"secret")).unwrap();
        assert!(matches!(verify_token(&token, "secret"), Err(AuthError::TokenExpired)));
    }
}
