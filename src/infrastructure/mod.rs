//! 基础设施层模块
//!
//! 负责外部资源连接生命周期、配置管理、数据库、缓存、邮件与对象存储

pub mod cache;
pub mod config;
pub mod database;
pub mod lifecycle;
pub mod mail;
pub mod resources;
pub mod storage;

// 重新导出常用类型和错误
pub use cache::CacheStore;
pub use config::{Config, ConfigError};
pub use database::DatabaseManager;
pub use lifecycle::{
    ConnectReport, ConnectionManager, ConnectionState, LazyResource, LifecycleError, ResourceConfig,
    ResourceDriver, ResourceProbe, RetryPolicy,
};
pub use mail::MailTransport;
pub use resources::AppResources;
pub use storage::ObjectStorage;
