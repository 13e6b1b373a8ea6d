//! 共享模块
//!
//! 包含跨层共享的错误处理、日志、类型定义、工具函数

pub mod constants;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

// 重新导出常用类型
pub use error::{AppError, AppResult};
pub use logging::{init_logging, LogSettings};
pub use types::{paginate, Page, PaginationParams};
pub use utils::resolve_template_path;
