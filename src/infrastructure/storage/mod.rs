//! 对象存储模块
//!
//! S3 兼容存储的上传与删除。客户端在创建时构建，不需要显式连接。

use std::collections::HashMap;

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// 对象存储配置
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// 对象存储错误类型
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("存储配置错误: {0}")]
    Configuration(String),

    #[error("删除对象需要提供 key")]
    MissingKey,

    #[error("上传失败: {0}")]
    Upload(String),

    #[error("删除失败: {0}")]
    Delete(String),
}

/// 对象访问权限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectAcl {
    Private,
    #[default]
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl From<ObjectAcl> for ObjectCannedAcl {
    fn from(acl: ObjectAcl) -> Self {
        match acl {
            ObjectAcl::Private => ObjectCannedAcl::Private,
            ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
            ObjectAcl::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
            ObjectAcl::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
            ObjectAcl::AwsExecRead => ObjectCannedAcl::AwsExecRead,
            ObjectAcl::BucketOwnerRead => ObjectCannedAcl::BucketOwnerRead,
            ObjectAcl::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
        }
    }
}

/// 上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub body: Vec<u8>,
    pub metadata: HashMap<String, String>,
    pub content_type: Option<String>,
    pub acl: ObjectAcl,
}

impl UploadRequest {
    pub fn new(key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
            metadata: HashMap::new(),
            content_type: None,
            acl: ObjectAcl::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = acl;
        self
    }
}

/// S3 对象存储客户端
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl ObjectStorage {
    /// 根据配置构建客户端
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Configuration("必须提供存储桶名称".to_string()));
        }
        if config.endpoint.trim().is_empty() {
            return Err(StorageError::Configuration("必须提供存储服务地址".to_string()));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "backend-kit",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(false)
            .behavior_version_latest()
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 上传对象
    pub async fn upload_object(&self, request: UploadRequest) -> Result<String, StorageError> {
        let content_length = request.body.len() as i64;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .acl(request.acl.into())
            .set_metadata(Some(request.metadata))
            .set_content_type(request.content_type)
            .content_length(content_length)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!("对象上传成功: bucket={}, key={}", self.bucket, request.key);
                Ok("Successfully uploaded file.".to_string())
            }
            Err(e) => {
                error!("对象上传失败: bucket={}, key={}, error={:?}", self.bucket, request.key, e);
                Err(StorageError::Upload(e.to_string()))
            }
        }
    }

    /// 删除对象
    pub async fn delete_object(&self, key: &str) -> Result<String, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::MissingKey);
        }

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {
                info!("对象删除成功: bucket={}, key={}", self.bucket, key);
                Ok("Successfully deleted file.".to_string())
            }
            Err(e) => {
                error!("对象删除失败: bucket={}, key={}, error={:?}", self.bucket, key, e);
                Err(StorageError::Delete(e.to_string()))
            }
        }
    }
}
