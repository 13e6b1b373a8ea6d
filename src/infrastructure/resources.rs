//! 进程级资源组合
//!
//! 启动时创建并连接所有外部资源，关闭时逐个断开。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::cache::CacheStore;
use super::config::Config;
use super::database::DatabaseManager;
use super::lifecycle::{LifecycleError, ResourceProbe, RetryPolicy};
use super::mail::MailTransport;
use super::storage::ObjectStorage;
use crate::shared::utils::format_duration_ms;

/// 进程持有的外部资源
#[derive(Debug, Clone)]
pub struct AppResources {
    pub database: Arc<DatabaseManager>,
    pub cache: Arc<CacheStore>,
    pub mail: Arc<MailTransport>,
    pub storage: Option<ObjectStorage>,
    shutdown: CancellationToken,
}

impl AppResources {
    /// 初始化并连接所有资源
    ///
    /// 所有客户端先构建完成再开始连接，配置错误不会遗留已连接的资源。
    /// 数据库连接失败时直接返回错误；缓存与邮件连接失败只记录警告，
    /// 由健康检查反映其状态。`shutdown` 被取消时中止数据库重试。
    pub async fn start(
        config: &Config,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Result<Self, LifecycleError> {
        let database = Arc::new(DatabaseManager::postgres());
        database.initialize(config.database_resource())?;
        let cache = Arc::new(CacheStore::redis(config.redis_resource())?);
        let mail = Arc::new(MailTransport::smtp(config.mail_resource())?);
        let storage = config
            .storage
            .as_ref()
            .map(ObjectStorage::new)
            .transpose()
            .map_err(|e| LifecycleError::Configuration {
                resource: "s3".to_string(),
                reason: e.to_string(),
            })?;

        let report = database.connect_with_cancel(policy, &shutdown).await?;
        info!(
            "✅ 数据库连接成功: {} (尝试 {} 次, 耗时 {})",
            database.name(),
            report.attempts,
            format_duration_ms(report.elapsed.as_millis() as u64)
        );

        if let Err(e) = cache.connect().await {
            warn!("⚠️ Redis连接失败，缓存暂不可用: {}", e);
        }
        if let Err(e) = mail.connect().await {
            warn!("⚠️ 邮件服务器连接失败，邮件暂不可用: {}", e);
        }

        Ok(Self {
            database,
            cache,
            mail,
            storage,
            shutdown,
        })
    }

    /// 用于健康检查的探测列表
    pub fn probes(&self) -> Vec<Arc<dyn ResourceProbe>> {
        vec![
            self.database.clone() as Arc<dyn ResourceProbe>,
            self.cache.clone() as Arc<dyn ResourceProbe>,
            self.mail.clone() as Arc<dyn ResourceProbe>,
        ]
    }

    /// 断开所有资源，返回断开过程中的错误
    pub async fn shutdown(&self) -> Vec<LifecycleError> {
        self.shutdown.cancel();

        let mut errors = Vec::new();
        for result in [
            self.mail.close().await,
            self.cache.close().await,
            self.database.disconnect().await,
        ] {
            if let Err(e) = result {
                error!("资源断开失败: {}", e);
                errors.push(e);
            }
        }

        if errors.is_empty() {
            info!("✅ 所有资源已断开");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with_redis_host(host: &'static str) -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost:1"),
            ("DATABASE_NAME", "farm"),
            ("SECRET_KEY", "secret"),
            ("MAILER_TRANSPORT_HOST", "smtp.example.com"),
            ("MAILER_TRANSPORT_PORT", "587"),
            ("MAILER_EMAIL", "noreply@example.com"),
            ("MAILER_PASSWORD", "mail-pass"),
            ("ACCESS_TOKEN_SECRET", "access"),
            ("REFRESH_TOKEN_SECRET", "refresh"),
            ("ACCESS_TOKEN_EXPIRY", "15m"),
            ("REDIS_HOST", host),
            ("REDIS_PASSWORD", "redis-pass"),
        ])
    }

    #[tokio::test]
    async fn test_cache_config_error_surfaces_before_database_connect() {
        let env = env_with_redis_host("bad host");
        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        // 数据库地址不可达，先连接数据库会得到连接错误而不是配置错误
        let err = AppResources::start(&config, RetryPolicy::once(), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            LifecycleError::Configuration { resource, .. } => assert_eq!(resource, "redis"),
            other => panic!("期望配置错误，实际: {:?}", other),
        }
    }
}
