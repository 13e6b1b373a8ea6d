//! 资源健康探测
//!
//! 对外屏蔽驱动类型，健康检查接口可以统一持有不同种类的资源。

use async_trait::async_trait;
use serde::Serialize;

use super::{ConnectionManager, ConnectionState, LazyResource, ResourceDriver};

#[async_trait]
pub trait ResourceProbe: Send + Sync {
    fn kind(&self) -> &'static str;

    fn name(&self) -> String;

    fn state(&self) -> ConnectionState;

    async fn ping(&self) -> bool;

    /// 探测一次并汇总当前状态
    async fn report(&self) -> ProbeReport {
        let reachable = self.ping().await;
        ProbeReport {
            kind: self.kind(),
            name: self.name(),
            state: self.state(),
            reachable,
        }
    }
}

/// 单个资源的健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub kind: &'static str,
    pub name: String,
    pub state: ConnectionState,
    pub reachable: bool,
}

#[async_trait]
impl<D: ResourceDriver> ResourceProbe for ConnectionManager<D> {
    fn kind(&self) -> &'static str {
        self.driver().kind()
    }

    fn name(&self) -> String {
        ConnectionManager::name(self)
    }

    fn state(&self) -> ConnectionState {
        ConnectionManager::state(self)
    }

    async fn ping(&self) -> bool {
        ConnectionManager::ping(self).await
    }
}

#[async_trait]
impl<D: ResourceDriver> ResourceProbe for LazyResource<D> {
    fn kind(&self) -> &'static str {
        self.driver().kind()
    }

    fn name(&self) -> String {
        LazyResource::name(self)
    }

    fn state(&self) -> ConnectionState {
        LazyResource::state(self)
    }

    async fn ping(&self) -> bool {
        LazyResource::ping(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::lifecycle::testing::FakeDriver;
    use crate::infrastructure::lifecycle::{ResourceConfig, RetryPolicy};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reports_through_trait_objects() {
        let manager = ConnectionManager::new(FakeDriver::succeeding());
        manager.initialize(ResourceConfig::new("farm", "fake://db")).unwrap();
        manager.connect(RetryPolicy::once()).await.unwrap();

        let lazy = LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("redis", "fake://cache")).unwrap();

        let probes: Vec<Arc<dyn ResourceProbe>> = vec![Arc::new(manager), Arc::new(lazy)];
        let reports = collect_reports(&probes).await;

        assert_eq!(reports[0].name, "farm");
        assert!(reports[0].reachable);
        assert_eq!(reports[0].state, ConnectionState::Connected);

        assert_eq!(reports[1].name, "redis");
        assert!(!reports[1].reachable);
        assert_eq!(reports[1].state, ConnectionState::Configured);
    }

    async fn collect_reports(probes: &[Arc<dyn ResourceProbe>]) -> Vec<ProbeReport> {
        let mut reports = Vec::new();
        for probe in probes {
            reports.push(probe.report().await);
        }
        reports
    }
}
