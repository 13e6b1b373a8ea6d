//! 配置管理模块
//!
//! 先加载 `.env`，再从环境变量读取。必填项缺失时直接失败，
//! 各资源段落可转换为 [`ResourceConfig`]。

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::infrastructure::lifecycle::{ResourceConfig, ResourceOptions};
use crate::infrastructure::storage::StorageConfig;

/// 配置错误类型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少必需的环境变量: {0}")]
    MissingEnv(String),

    #[error("环境变量 {key} 的值无效: {value}")]
    InvalidValue { key: String, value: String },

    #[error("加载环境文件失败: {0}")]
    EnvFile(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub port: u16,
    pub secret_key: String,
    pub is_dev: bool,
    pub mailer: MailerConfig,
    pub tokens: TokenConfig,
    pub redis: RedisConfig,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    pub name_dev: String,
    pub options: ResourceOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub email: String,
    pub password: String,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
}

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_SENDER_NAME: &str = "FarmOptima";

/// 环境变量读取器
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| {
            error!("缺少必需的环境变量: {}", key);
            ConfigError::MissingEnv(key.to_string())
        })
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, value: String) -> Result<T, ConfigError> {
        value.trim().parse().map_err(|_| {
            error!("环境变量值无效: {}={}", key, value);
            ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }
        })
    }

    fn parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => self.parsed(key, value),
            None => Ok(default),
        }
    }
}

impl Config {
    /// 加载 `.env` 后从进程环境读取配置
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// 从指定的环境文件加载配置
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        dotenv::from_path(path).map_err(|e| {
            error!("加载环境文件失败: {}: {}", path.display(), e);
            ConfigError::EnvFile(format!("{}: {}", path.display(), e))
        })?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 使用自定义查找函数构建配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("正在加载配置...");
        let env = Env { lookup };

        let name = env.required("DATABASE_NAME")?;
        let name_dev = env
            .optional("DATABASE_NAME_DEV")
            .unwrap_or_else(|| format!("{}-dev", name));

        let database = DatabaseConfig {
            url: env.required("DATABASE_URL")?,
            name,
            name_dev,
            options: ResourceOptions {
                max_pool_size: env.parsed_or("DATABASE_MAX_POOL_SIZE", ResourceOptions::default().max_pool_size)?,
                ..ResourceOptions::default()
            },
        };

        let port = env.parsed_or("PORT", DEFAULT_PORT)?;
        let secret_key = env.required("SECRET_KEY")?;
        let is_dev = env.optional("APP_ENV").as_deref() != Some("production");

        let mailer = MailerConfig {
            host: env.required("MAILER_TRANSPORT_HOST")?,
            port: {
                let raw = env.required("MAILER_TRANSPORT_PORT")?;
                env.parsed("MAILER_TRANSPORT_PORT", raw)?
            },
            secure: env.optional("MAILER_TRANSPORT_SECURE").as_deref() == Some("true"),
            email: env.required("MAILER_EMAIL")?,
            password: env.required("MAILER_PASSWORD")?,
            sender_name: env
                .optional("MAILER_SENDER_NAME")
                .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
        };

        let tokens = TokenConfig {
            access_token_secret: env.required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: env.required("REFRESH_TOKEN_SECRET")?,
            access_token_expiry: env.required("ACCESS_TOKEN_EXPIRY")?,
        };

        let redis = RedisConfig {
            host: env.required("REDIS_HOST")?,
            port: env.parsed_or("REDIS_PORT", DEFAULT_REDIS_PORT)?,
            password: env.required("REDIS_PASSWORD")?,
        };

        let storage = Self::storage_section(&env)?;

        info!("配置加载成功");
        Ok(Config {
            database,
            port,
            secret_key,
            is_dev,
            mailer,
            tokens,
            redis,
            storage,
        })
    }

    /// 对象存储段落可选；一旦出现任一键，其余键都必须提供
    fn storage_section<F>(env: &Env<F>) -> Result<Option<StorageConfig>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        const KEYS: [&str; 5] = [
            "S3_ACCESS_KEY_ID",
            "S3_SECRET_ACCESS_KEY",
            "S3_ENDPOINT",
            "S3_REGION",
            "S3_BUCKET",
        ];
        if KEYS.iter().all(|key| env.optional(key).is_none()) {
            return Ok(None);
        }

        Ok(Some(StorageConfig {
            access_key_id: env.required(KEYS[0])?,
            secret_access_key: env.required(KEYS[1])?,
            endpoint: env.required(KEYS[2])?,
            region: env.required(KEYS[3])?,
            bucket: env.required(KEYS[4])?,
        }))
    }

    /// 当前环境使用的数据库名
    pub fn database_name(&self) -> &str {
        if self.is_dev {
            &self.database.name_dev
        } else {
            &self.database.name
        }
    }

    pub fn database_resource(&self) -> ResourceConfig {
        ResourceConfig::new(self.database_name(), &self.database.url)
            .with_options(self.database.options.clone())
    }

    pub fn redis_resource(&self) -> ResourceConfig {
        ResourceConfig::new(
            "redis",
            format!("redis://{}:{}", self.redis.host, self.redis.port),
        )
        .with_credentials(None, self.redis.password.clone())
    }

    /// 邮件资源：`name` 为发件人显示名，认证用户名即发件地址
    pub fn mail_resource(&self) -> ResourceConfig {
        let target = if self.mailer.secure {
            format!("smtps://{}:{}", self.mailer.host, self.mailer.port)
        } else {
            format!("smtp://{}:{}?tls=opportunistic", self.mailer.host, self.mailer.port)
        };

        ResourceConfig::new(&self.mailer.sender_name, target).with_credentials(
            Some(self.mailer.email.clone()),
            self.mailer.password.clone(),
        )
    }
}
