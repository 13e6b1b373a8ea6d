//! 常量定义模块

/// JWT相关常量
pub mod jwt {
    pub const DEFAULT_EXPIRY: &str = "1h";
}

/// 密码哈希相关常量
pub mod password {
    pub const MIN_COST: u32 = 4;
    pub const MAX_COST: u32 = 15;
}

/// 分页相关常量
pub mod pagination {
    pub const DEFAULT_PAGE: usize = 1;
    pub const DEFAULT_LIMIT: usize = 10;
}

/// 模板相关常量
pub mod template {
    pub const DEFAULT_EXTENSION: &str = "hbs";
}

/// 日志相关常量
pub mod logging {
    pub const ERROR_LOG_FILE: &str = "error.log";
    pub const COMBINED_LOG_FILE: &str = "combined.log";
}
