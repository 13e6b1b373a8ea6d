//! 轻量单例资源
//!
//! 缓存、邮件传输等资源在创建时即完成配置，连接只尝试一次，不重试。
//! 内部直接复用 [`ConnectionManager`]，只是固定了初始化时机和重试策略。

use std::fmt;

use super::{
    ConnectReport, ConnectionManager, ConnectionState, LifecycleError, ResourceConfig,
    ResourceDriver, RetryPolicy,
};

pub struct LazyResource<D: ResourceDriver> {
    manager: ConnectionManager<D>,
}

impl<D: ResourceDriver> LazyResource<D> {
    /// 校验配置并立即构建客户端
    pub fn new(driver: D, config: ResourceConfig) -> Result<Self, LifecycleError> {
        let manager = ConnectionManager::new(driver);
        manager.initialize(config)?;
        Ok(Self { manager })
    }

    /// 建立连接（单次尝试）
    ///
    /// 已经连接时直接返回；关闭之后需要重新创建实例。
    pub async fn connect(&self) -> Result<ConnectReport, LifecycleError> {
        self.manager.connect(RetryPolicy::once()).await
    }

    /// 获取连接句柄，尚未连接时立即失败
    pub fn handle(&self) -> Result<D::Handle, LifecycleError> {
        self.manager.handle()
    }

    /// 检查连接是否可用
    pub async fn ping(&self) -> bool {
        self.manager.ping().await
    }

    /// 关闭连接，失败时状态同样被清空
    pub async fn close(&self) -> Result<(), LifecycleError> {
        self.manager.disconnect().await
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn name(&self) -> String {
        self.manager.name()
    }

    pub fn driver(&self) -> &D {
        self.manager.driver()
    }
}

impl<D: ResourceDriver> fmt::Debug for LazyResource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyResource").field(&self.manager).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::lifecycle::testing::FakeDriver;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_new_validates_config() {
        let err = LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("cache", "")).unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_construction_is_eager_but_connection_is_not() {
        let cache = LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("cache", "fake://cache")).unwrap();

        assert_eq!(cache.state(), ConnectionState::Configured);
        assert_eq!(cache.driver().stats().builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.driver().stats().connects.load(Ordering::SeqCst), 0);
        assert!(matches!(cache.handle(), Err(LifecycleError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_connect_does_not_retry() {
        let cache = LazyResource::new(FakeDriver::failing(), ResourceConfig::new("cache", "fake://down")).unwrap();

        let err = cache.connect().await.unwrap_err();

        assert!(matches!(err, LifecycleError::ConnectionExhausted { attempts: 1, .. }));
        assert_eq!(cache.driver().stats().connects.load(Ordering::SeqCst), 1);
        assert!(!cache.ping().await);
    }

    #[tokio::test]
    async fn test_ping_is_a_query_not_an_error() {
        let cache = LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("cache", "fake://cache")).unwrap();
        assert!(!cache.ping().await);

        cache.connect().await.unwrap();
        assert!(cache.ping().await);

        cache.driver().set_reachable(false);
        assert!(!cache.ping().await);
        // 句柄仍然可以获取，连通性检查不会改变生命周期
        assert!(cache.handle().is_ok());
    }

    #[tokio::test]
    async fn test_close_is_best_effort() {
        let mailer = LazyResource::new(
            FakeDriver::succeeding().failing_close(),
            ResourceConfig::new("mailer", "fake://smtp"),
        )
        .unwrap();
        mailer.connect().await.unwrap();

        assert!(matches!(mailer.close().await, Err(LifecycleError::Teardown { .. })));
        assert!(matches!(mailer.handle(), Err(LifecycleError::NotConnected { .. })));
        assert_eq!(mailer.state(), ConnectionState::Unconfigured);

        // 已经关闭的资源再次关闭不会报错
        assert!(mailer.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_after_close_requires_new_instance() {
        let cache = LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("cache", "fake://cache")).unwrap();
        cache.connect().await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(cache.connect().await, Err(LifecycleError::NotInitialized { .. })));
    }
}
