//! Handlebars 模板渲染

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

/// 模板错误类型
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("必须提供模板文件路径")]
    MissingPath,

    #[error("读取模板失败: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("渲染模板失败: {path}: {reason}")]
    Render { path: PathBuf, reason: String },
}

/// 读取模板文件并使用上下文渲染
pub async fn compile_template<C>(filepath: &Path, context: &C) -> Result<String, TemplateError>
where
    C: Serialize,
{
    if filepath.as_os_str().is_empty() {
        error!("模板编译失败: 未提供文件路径");
        return Err(TemplateError::MissingPath);
    }

    let source = tokio::fs::read_to_string(filepath).await.map_err(|source| {
        error!("读取模板失败: path={}, error={}", filepath.display(), source);
        TemplateError::Read {
            path: filepath.to_path_buf(),
            source,
        }
    })?;

    let registry = Handlebars::new();
    let rendered = registry.render_template(&source, context).map_err(|e| {
        error!("渲染模板失败: path={}, error={}", filepath.display(), e);
        TemplateError::Render {
            path: filepath.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    info!("模板编译成功: {}", filepath.display());
    Ok(rendered)
}
