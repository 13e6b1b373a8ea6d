//! 缓存基础设施模块
//!
//! Redis 作为轻量单例资源：创建时配置，显式连接，未连接时拒绝访问。

pub mod redis_cache;

pub use redis_cache::{CacheStore, RedisDriver};
