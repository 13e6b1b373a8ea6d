//! 工具函数模块

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::bad_request;
use crate::shared::constants::template::DEFAULT_EXTENSION;
use crate::shared::error::AppResult;

/// 解析模板文件路径
///
/// 返回 `directory/name.extension` 的绝对路径，目录与文件都必须存在。
pub fn resolve_template_path(directory: &str, name: &str, extension: Option<&str>) -> AppResult<PathBuf> {
    if directory.trim().is_empty() {
        error!("无效的目录: 不能为空");
        return Err(bad_request!("Invalid directory: must be a non-empty string"));
    }
    if name.trim().is_empty() {
        error!("无效的文件名: 不能为空");
        return Err(bad_request!("Invalid filepath: must be a non-empty string"));
    }

    let dir = Path::new(directory);
    if !dir.is_dir() {
        error!("目录不存在: {}", directory);
        return Err(bad_request!("Directory does not exist: {}", directory));
    }

    let extension = extension.unwrap_or(DEFAULT_EXTENSION);
    let joined = dir.join(format!("{}.{}", name, extension));
    let resolved = std::path::absolute(&joined).unwrap_or(joined);

    info!("模板路径解析: {} -> {}", name, resolved.display());

    if !resolved.is_file() {
        error!("文件不存在: {}", resolved.display());
        return Err(bad_request!("File does not exist: {}", resolved.display()));
    }

    Ok(resolved)
}

/// 格式化持续时间
pub fn format_duration_ms(milliseconds: u64) -> String {
    if milliseconds < 1000 {
        format!("{}ms", milliseconds)
    } else if milliseconds < 60_000 {
        let seconds = milliseconds as f64 / 1000.0;
        format!("{:.1}s", seconds)
    } else {
        let minutes = milliseconds / 60_000;
        let seconds = (milliseconds % 60_000) / 1000;
        format!("{}m{}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::AppError;

    #[test]
    fn test_resolves_existing_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("welcome.hbs"), "hi").unwrap();
        let directory = dir.path().to_str().unwrap();

        let path = resolve_template_path(directory, "welcome", None).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("welcome.hbs"));

        std::fs::write(dir.path().join("plain.txt"), "hi").unwrap();
        assert!(resolve_template_path(directory, "plain", Some("txt")).is_ok());
    }

    #[test]
    fn test_rejects_blank_or_missing() {
        let dir = tempfile::tempdir().unwrap();
        let directory = dir.path().to_str().unwrap();

        assert!(matches!(resolve_template_path("  ", "welcome", None), Err(AppError::BadRequest(_))));
        assert!(matches!(resolve_template_path(directory, "", None), Err(AppError::BadRequest(_))));
        assert!(matches!(
            resolve_template_path(&format!("{}/nope", directory), "welcome", None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_template_path(directory, "missing", None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(10), "10ms");
        assert_eq!(format_duration_ms(1500), "1.5s");
        assert_eq!(format_duration_ms(61_000), "1m1s");
    }
}
