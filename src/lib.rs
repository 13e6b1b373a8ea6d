//! Backend Kit
//!
//! Web 服务后端工具集：外部资源连接生命周期管理（数据库、缓存、邮件传输），
//! 以及认证、分页、模板、对象存储等通用组件

// 核心模块
pub mod shared;          // 共享模块（错误处理、日志、类型定义、工具函数）
pub mod infrastructure;  // 基础设施层（连接生命周期、配置、外部资源）
pub mod presentation;    // 表示层（HTTP处理、路由）
pub mod auth;            // 认证和授权模块

// 重新导出核心类型
pub use infrastructure::{AppResources, Config, ConnectionManager, LazyResource, LifecycleError, RetryPolicy};
pub use presentation::{create_routes, AppState};
pub use shared::{AppError, AppResult};
