//! SMTP 邮件传输
//!
//! 传输在创建 [`MailTransport`] 时构建，`connect` 通过一次 SMTP 握手验证连通性。

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use super::MailError;
use crate::infrastructure::lifecycle::{LazyResource, LifecycleError, ResourceConfig, ResourceDriver};

/// 邮件附件
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub path: PathBuf,
}

/// 待发送的邮件
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<MailAttachment>,
}

impl MailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_attachment(mut self, filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(MailAttachment {
            filename: filename.into(),
            path: path.into(),
        });
        self
    }
}

/// 已验证的邮件发送器
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl Mailer {
    pub fn sender(&self) -> &Mailbox {
        &self.from
    }

    /// 构建邮件内容（不发送）
    pub async fn build_message(&self, mail: &MailMessage) -> Result<Message, MailError> {
        build_message(&self.from, mail).await
    }

    /// 发送邮件，返回服务器响应
    pub async fn send_mail(&self, mail: MailMessage) -> Result<String, MailError> {
        let message = self.build_message(&mail).await?;

        match self.transport.send(message).await {
            Ok(response) => {
                let summary = response.message().collect::<Vec<_>>().join(" ");
                info!(to = ?mail.to, subject = %mail.subject, "邮件已发送: {}", summary);
                Ok(summary)
            }
            Err(e) => {
                error!(to = ?mail.to, subject = %mail.subject, error = %e, "邮件发送失败");
                Err(MailError::Send(e.to_string()))
            }
        }
    }
}

async fn build_message(from: &Mailbox, mail: &MailMessage) -> Result<Message, MailError> {
    if mail.to.is_empty() {
        return Err(MailError::NoRecipients);
    }

    let mut builder = Message::builder().from(from.clone()).subject(mail.subject.clone());
    for recipient in &mail.to {
        let mailbox = recipient
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(recipient.clone()))?;
        builder = builder.to(mailbox);
    }

    let body = match (&mail.text, &mail.html) {
        (Some(text), Some(html)) => MultiPart::alternative_plain_html(text.clone(), html.clone()),
        (None, Some(html)) => MultiPart::mixed().singlepart(SinglePart::html(html.clone())),
        (Some(text), None) => MultiPart::mixed().singlepart(SinglePart::plain(text.clone())),
        (None, None) => MultiPart::mixed().singlepart(SinglePart::plain(String::new())),
    };

    let body = if mail.attachments.is_empty() {
        body
    } else {
        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| MailError::Build(e.to_string()))?;
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in &mail.attachments {
            let content = tokio::fs::read(&attachment.path)
                .await
                .map_err(|source| MailError::Attachment {
                    path: attachment.path.clone(),
                    source,
                })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone()).body(content, octet_stream.clone()),
            );
        }
        mixed
    };

    builder
        .multipart(body)
        .map_err(|e| MailError::Build(e.to_string()))
}

/// SMTP 驱动
///
/// `target` 使用 `smtp://host:port` 或 `smtps://host:port`，
/// `name` 为发件人显示名，认证用户名即发件地址。
#[derive(Debug, Clone, Default)]
pub struct SmtpDriver;

impl SmtpDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceDriver for SmtpDriver {
    type Client = Mailer;
    type Handle = Mailer;

    fn kind(&self) -> &'static str {
        "smtp"
    }

    fn build(&self, config: &ResourceConfig) -> anyhow::Result<Mailer> {
        let credentials = config
            .credentials
            .as_ref()
            .ok_or_else(|| anyhow!("邮件传输需要认证信息"))?;
        let email = credentials
            .username
            .clone()
            .ok_or_else(|| anyhow!("邮件传输需要发件地址"))?;

        let address = email
            .parse::<lettre::Address>()
            .with_context(|| format!("发件地址无效: {}", email))?;
        let from = Mailbox::new(Some(config.name.clone()), address);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(&config.target)
            .context("SMTP地址格式无效")?
            .credentials(Credentials::new(email, credentials.password.clone()))
            .timeout(Some(config.options.connect_timeout()))
            .pool_config(
                PoolConfig::new()
                    .max_size(config.options.max_pool_size)
                    .idle_timeout(config.options.idle_timeout()),
            )
            .build();

        Ok(Mailer { transport, from })
    }

    async fn connect(&self, client: &Mailer, _config: &ResourceConfig) -> anyhow::Result<Mailer> {
        let verified = client
            .transport
            .test_connection()
            .await
            .context("无法连接邮件服务器")?;
        if !verified {
            return Err(anyhow!("邮件服务器拒绝连接"));
        }
        Ok(client.clone())
    }

    async fn ping(&self, handle: &Mailer) -> anyhow::Result<()> {
        match handle.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(anyhow!("邮件服务器无响应")),
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self, _client: &Mailer, _handle: Option<Mailer>) -> anyhow::Result<()> {
        // 连接池中的连接在传输被释放时关闭
        Ok(())
    }
}

/// 邮件传输资源
pub type MailTransport = LazyResource<SmtpDriver>;

impl MailTransport {
    /// 使用配置创建 SMTP 邮件传输（不连接）
    pub fn smtp(config: ResourceConfig) -> Result<Self, LifecycleError> {
        LazyResource::new(SmtpDriver::new(), config)
    }

    /// 使用已验证的连接发送邮件
    pub async fn send_mail(&self, mail: MailMessage) -> Result<String, MailError> {
        let mailer = self.handle()?;
        mailer.send_mail(mail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> ResourceConfig {
        ResourceConfig::new("FarmOptima", "smtp://localhost:2525")
            .with_credentials(Some("noreply@example.com".to_string()), "password")
    }

    #[test]
    fn test_build_requires_sender_credentials() {
        let config = ResourceConfig::new("FarmOptima", "smtp://localhost:2525");
        assert!(SmtpDriver::new().build(&config).is_err());

        let config = ResourceConfig::new("FarmOptima", "smtp://localhost:2525").with_credentials(None, "password");
        assert!(SmtpDriver::new().build(&config).is_err());
    }

    #[tokio::test]
    async fn test_build_uses_display_name() {
        let mailer = SmtpDriver::new().build(&smtp_config()).unwrap();
        assert_eq!(mailer.sender().name.as_deref(), Some("FarmOptima"));
        assert_eq!(mailer.sender().email.to_string(), "noreply@example.com");
    }

    #[tokio::test]
    async fn test_message_with_multiple_recipients_and_alternatives() {
        let mailer = SmtpDriver::new().build(&smtp_config()).unwrap();
        let mail = MailMessage {
            to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            subject: "欢迎".to_string(),
            text: Some("hello".to_string()),
            html: Some("<p>hello</p>".to_string()),
            attachments: Vec::new(),
        };

        let message = mailer.build_message(&mail).await.unwrap();
        assert_eq!(message.envelope().to().len(), 2);

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_message_rejects_bad_recipient() {
        let mailer = SmtpDriver::new().build(&smtp_config()).unwrap();

        let err = mailer
            .build_message(&MailMessage::new("not-an-address", "hi").with_text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress(_)));

        let err = mailer.build_message(&MailMessage::default()).await.unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }

    #[tokio::test]
    async fn test_message_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "report body").unwrap();

        let mailer = SmtpDriver::new().build(&smtp_config()).unwrap();
        let mail = MailMessage::new("a@example.com", "report")
            .with_text("see attachment")
            .with_attachment("report.txt", &path);

        let message = mailer.build_message(&mail).await.unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("report.txt"));

        let missing = MailMessage::new("a@example.com", "report").with_attachment("gone.txt", dir.path().join("gone.txt"));
        assert!(matches!(
            mailer.build_message(&missing).await,
            Err(MailError::Attachment { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let transport = MailTransport::smtp(smtp_config()).unwrap();
        let err = transport
            .send_mail(MailMessage::new("a@example.com", "hi").with_text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Lifecycle(LifecycleError::NotConnected { .. })));
    }
}
