//! 表示层模块
//!
//! 负责HTTP请求处理与路由管理

pub mod handlers;
pub mod routes;

// 重新导出路由创建函数
pub use routes::{create_routes, AppState};
