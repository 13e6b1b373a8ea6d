//! 数据库模块
//!
//! PostgreSQL 连接由 [`DatabaseManager`] 管理：先初始化配置，再按重试策略连接。

pub mod connection;

use sqlx::PgPool;

use crate::infrastructure::lifecycle::{ConnectionManager, LifecycleError};
pub use connection::{PoolStats, PostgresDriver};

/// 数据库连接管理器
pub type DatabaseManager = ConnectionManager<PostgresDriver>;

impl DatabaseManager {
    /// 创建 PostgreSQL 连接管理器
    pub fn postgres() -> Self {
        ConnectionManager::new(PostgresDriver::new())
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> Result<PgPool, LifecycleError> {
        self.handle()
    }

    /// 获取连接池统计信息
    pub fn pool_stats(&self) -> Result<PoolStats, LifecycleError> {
        self.handle().map(|pool| PoolStats::collect(&pool))
    }
}
