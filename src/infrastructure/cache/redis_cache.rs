//! Redis缓存驱动
//!
//! 客户端在创建 [`CacheStore`] 时构建，`connect` 只尝试一次，
//! 连接之后通过 `aio::ConnectionManager` 共享同一条多路复用连接。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::IntoConnectionInfo;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::infrastructure::lifecycle::{LazyResource, LifecycleError, ResourceConfig, ResourceDriver};

/// Redis 驱动
#[derive(Debug, Clone, Default)]
pub struct RedisDriver;

impl RedisDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceDriver for RedisDriver {
    type Client = redis::Client;
    type Handle = redis::aio::ConnectionManager;

    fn kind(&self) -> &'static str {
        "redis"
    }

    fn build(&self, config: &ResourceConfig) -> anyhow::Result<redis::Client> {
        let mut info = config
            .target
            .as_str()
            .into_connection_info()
            .context("Redis地址格式无效")?;

        if let Some(credentials) = &config.credentials {
            if credentials.username.is_some() {
                info.redis.username = credentials.username.clone();
            }
            info.redis.password = Some(credentials.password.clone());
        }

        Ok(redis::Client::open(info)?)
    }

    async fn connect(
        &self,
        client: &redis::Client,
        config: &ResourceConfig,
    ) -> anyhow::Result<redis::aio::ConnectionManager> {
        let timeout = config.options.connect_timeout();
        let manager = tokio::time::timeout(timeout, redis::aio::ConnectionManager::new(client.clone()))
            .await
            .with_context(|| format!("Redis连接超时: {:?}", timeout))?
            .context("无法连接Redis")?;
        Ok(manager)
    }

    async fn ping(&self, handle: &redis::aio::ConnectionManager) -> anyhow::Result<()> {
        let mut conn = handle.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("Redis PING失败")?;
        Ok(())
    }

    async fn close(
        &self,
        _client: &redis::Client,
        handle: Option<redis::aio::ConnectionManager>,
    ) -> anyhow::Result<()> {
        if let Some(mut conn) = handle {
            redis::cmd("QUIT")
                .query_async::<_, ()>(&mut conn)
                .await
                .context("Redis QUIT失败")?;
        }
        Ok(())
    }
}

/// Redis 缓存存储
pub type CacheStore = LazyResource<RedisDriver>;

impl CacheStore {
    /// 使用配置创建 Redis 缓存存储（不连接）
    pub fn redis(config: ResourceConfig) -> Result<Self, LifecycleError> {
        LazyResource::new(RedisDriver::new(), config)
    }

    /// 读取JSON缓存值
    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.handle()?;
        let raw = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis GET操作失败: key={}, error={}", key, e);
                e
            })?;

        match raw {
            Some(value) => {
                debug!("Redis缓存命中: key={}", key);
                let parsed = serde_json::from_str(&value)
                    .with_context(|| format!("Redis缓存反序列化失败: key={}", key))?;
                Ok(Some(parsed))
            }
            None => {
                debug!("Redis缓存未命中: key={}", key);
                Ok(None)
            }
        }
    }

    /// 写入JSON缓存值
    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let serialized = serde_json::to_string(value).context("序列化失败")?;
        let mut conn = self.handle()?;

        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(&serialized)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis SET操作失败: key={}, error={}", key, e);
                e
            })?;

        debug!("Redis缓存设置成功: key={}, ttl={:?}", key, ttl);
        Ok(())
    }

    /// 删除缓存值
    pub async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.handle()?;
        let deleted = redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i32>(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_overrides_password() {
        let config = ResourceConfig::new("cache", "redis://localhost:6379/2").with_credentials(None, "s3cret");
        let client = RedisDriver::new().build(&config).unwrap();

        let info = client.get_connection_info();
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
        assert_eq!(info.redis.db, 2);
    }

    #[test]
    fn test_build_rejects_bad_scheme() {
        let config = ResourceConfig::new("cache", "http://localhost:6379");
        assert!(RedisDriver::new().build(&config).is_err());
    }

    #[tokio::test]
    async fn test_cache_operations_require_connection() {
        let cache = CacheStore::redis(ResourceConfig::new("cache", "redis://localhost:6379")).unwrap();

        assert!(cache.get_json::<String>("key").await.is_err());
        assert!(cache.delete("key").await.is_err());
        assert!(!cache.ping().await);
    }

    #[tokio::test]
    #[ignore] // 需要Redis实例才能运行
    async fn test_redis_cache_operations() {
        let cache = CacheStore::redis(ResourceConfig::new("cache", "redis://localhost:6379")).unwrap();
        cache.connect().await.expect("Redis连接失败");
        assert!(cache.ping().await);

        cache
            .set_json("test_key", &"test_value", Duration::from_secs(60))
            .await
            .expect("Failed to set value");
        let value: Option<String> = cache.get_json("test_key").await.unwrap();
        assert_eq!(value.as_deref(), Some("test_value"));

        assert!(cache.delete("test_key").await.unwrap());
        cache.close().await.unwrap();
        assert!(cache.handle().is_err());
    }
}
