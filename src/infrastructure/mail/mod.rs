//! 邮件模块
//!
//! SMTP 传输作为轻量单例资源管理；邮件正文由 Handlebars 模板渲染。

use std::path::PathBuf;

use thiserror::Error;

use crate::infrastructure::lifecycle::LifecycleError;

pub mod template;
pub mod transport;

pub use template::{compile_template, TemplateError};
pub use transport::{MailAttachment, MailMessage, MailTransport, Mailer, SmtpDriver};

/// 邮件错误类型
#[derive(Debug, Error)]
pub enum MailError {
    #[error("邮件传输不可用: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("至少需要一个收件人")]
    NoRecipients,

    #[error("无效的邮件地址: {0}")]
    InvalidAddress(String),

    #[error("读取附件失败: {path}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("构建邮件失败: {0}")]
    Build(String),

    #[error("发送邮件失败: {0}")]
    Send(String),
}
