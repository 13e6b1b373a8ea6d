//! 日志初始化
//!
//! 控制台输出加两个 JSON 日志文件：`error.log` 只记录 ERROR，`combined.log` 记录全部。

use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::shared::constants::logging::{COMBINED_LOG_FILE, ERROR_LOG_FILE};

/// 日志设置
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub is_dev: bool,
    /// 日志文件目录，`None` 时只输出到控制台
    pub directory: Option<PathBuf>,
}

impl LogSettings {
    pub fn console(is_dev: bool) -> Self {
        Self {
            is_dev,
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// 未设置 `RUST_LOG` 时的默认级别
    pub fn default_level(&self) -> &'static str {
        if self.is_dev {
            "debug"
        } else {
            "error"
        }
    }
}

/// 初始化全局日志订阅器
///
/// 返回的 guard 必须在进程退出前保持存活，否则文件日志可能丢失。
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.default_level()));

    let console_layer = tracing_subscriber::fmt::layer().with_target(settings.is_dev);

    let mut guards = Vec::new();
    let (error_layer, combined_layer) = match &settings.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("无法创建日志目录: {}", directory.display()))?;

            let (error_writer, error_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, ERROR_LOG_FILE));
            let (combined_writer, combined_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, COMBINED_LOG_FILE));
            guards.push(error_guard);
            guards.push(combined_guard);

            let error_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR);
            let combined_layer = tracing_subscriber::fmt::layer().json().with_writer(combined_writer);

            (Some(error_layer), Some(combined_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(error_layer)
        .with(combined_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(guards)
}
