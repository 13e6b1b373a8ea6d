//! 连接管理器
//!
//! 每个管理器只持有一个外部资源实例。生命周期：
//! `Unconfigured → Configured → Connecting → Connected → Disconnecting → Unconfigured`

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::retry::{retry_with_policy, RetryOutcome, RetryPolicy, RetryState};
use super::{ConnectionState, LifecycleError, ResourceConfig, ResourceDriver};

/// 一次成功连接的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    /// 本次调用实际执行的连接尝试次数（已连接时为0）
    pub attempts: u32,
    pub elapsed: Duration,
}

struct Instance<D: ResourceDriver> {
    config: ResourceConfig,
    client: Arc<D::Client>,
    handle: Option<D::Handle>,
}

struct Inner<D: ResourceDriver> {
    instance: Option<Instance<D>>,
    state: ConnectionState,
}

/// 外部资源连接管理器
///
/// 由进程启动代码显式创建并传递给使用方，不使用全局单例。
pub struct ConnectionManager<D: ResourceDriver> {
    driver: D,
    inner: Mutex<Inner<D>>,
    // 串行化 connect / disconnect，避免两个连接流程同时写入句柄
    connect_gate: tokio::sync::Mutex<()>,
}

impl<D: ResourceDriver> ConnectionManager<D> {
    /// 创建未配置的管理器
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            inner: Mutex::new(Inner {
                instance: None,
                state: ConnectionState::Unconfigured,
            }),
            connect_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resource_name(inner: &Inner<D>, fallback: &str) -> String {
        inner
            .instance
            .as_ref()
            .map(|instance| instance.config.name.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// 底层驱动
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 资源名称，未配置时为驱动种类
    pub fn name(&self) -> String {
        Self::resource_name(&self.lock(), self.driver.kind())
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// 当前生效的配置
    pub fn config(&self) -> Option<ResourceConfig> {
        self.lock()
            .instance
            .as_ref()
            .map(|instance| instance.config.clone())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    /// 使用配置初始化资源（不进行网络操作）
    ///
    /// 配置先校验，无效配置直接返回 [`LifecycleError::Configuration`]。
    /// 已经初始化过时不做任何事，第一份配置继续生效。
    pub fn initialize(&self, config: ResourceConfig) -> Result<(), LifecycleError> {
        let kind = self.driver.kind();
        let resource = if config.name.trim().is_empty() {
            kind.to_string()
        } else {
            config.name.clone()
        };

        if let Err(reason) = config.validate() {
            error!(resource = %resource, kind, reason = %reason, "资源配置校验失败");
            return Err(LifecycleError::Configuration { resource, reason });
        }

        let mut inner = self.lock();
        if let Some(existing) = &inner.instance {
            if existing.config != config {
                warn!(
                    resource = %existing.config.name,
                    kind,
                    "资源已初始化，忽略新的配置"
                );
            } else {
                debug!(resource = %existing.config.name, kind, "资源已初始化，跳过");
            }
            return Ok(());
        }

        let client = self.driver.build(&config).map_err(|e| {
            error!(resource = %resource, kind, error = %e, "资源客户端构建失败");
            LifecycleError::Configuration {
                resource: resource.clone(),
                reason: format!("{:#}", e),
            }
        })?;

        info!(
            resource = %resource,
            kind,
            target = %config.redacted_target(),
            max_pool_size = config.options.max_pool_size,
            "资源已使用提供的配置初始化"
        );

        inner.instance = Some(Instance {
            config,
            client: Arc::new(client),
            handle: None,
        });
        inner.state = ConnectionState::Configured;
        Ok(())
    }

    /// 按重试策略连接资源
    pub async fn connect(&self, policy: RetryPolicy) -> Result<ConnectReport, LifecycleError> {
        self.connect_with_cancel(policy, &CancellationToken::new()).await
    }

    /// 按重试策略连接资源，取消令牌触发时提前结束
    ///
    /// 连接过程中其它 `connect` 调用会等待当前流程结束；
    /// 等到时资源已连接则直接返回，`attempts` 为0。
    pub async fn connect_with_cancel(
        &self,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<ConnectReport, LifecycleError> {
        let kind = self.driver.kind();
        let _in_flight = self.connect_gate.lock().await;

        let (config, client) = {
            let inner = self.lock();
            let Some(instance) = inner.instance.as_ref() else {
                error!(kind, "资源尚未初始化，无法连接");
                return Err(LifecycleError::NotInitialized {
                    resource: kind.to_string(),
                });
            };
            if let Err(reason) = policy.validate() {
                let resource = instance.config.name.clone();
                error!(resource = %resource, kind, reason = %reason, "重试策略无效");
                return Err(LifecycleError::Configuration { resource, reason });
            }
            if instance.handle.is_some() {
                warn!(resource = %instance.config.name, kind, "资源已连接，跳过连接");
                return Ok(ConnectReport {
                    attempts: 0,
                    elapsed: Duration::ZERO,
                });
            }
            (instance.config.clone(), instance.client.clone())
        };

        let resource = config.name.as_str();
        let started = Instant::now();
        info!(
            resource,
            kind,
            max_attempts = policy.max_attempts,
            delay_ms = policy.delay.as_millis() as u64,
            "开始连接资源"
        );

        let outcome = retry_with_policy(
            &policy,
            cancel,
            |state| self.on_retry_state(resource, &policy, state),
            |attempt| {
                let client = &*client;
                let config = &config;
                let driver = &self.driver;
                let max_attempts = policy.max_attempts;
                async move {
                    match driver.connect(client, config).await {
                        Ok(handle) => {
                            info!(resource, kind, attempt, "成功连接到 {}", resource);
                            Ok(handle)
                        }
                        Err(e) => {
                            error!(
                                resource,
                                kind,
                                attempt,
                                max_attempts,
                                error = %format!("{:#}", e),
                                "第 {} 次连接尝试失败",
                                attempt
                            );
                            Err(e)
                        }
                    }
                }
            },
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                let mut pending = Some(value);
                {
                    let mut guard = self.lock();
                    let inner = &mut *guard;
                    if let Some(instance) = inner.instance.as_mut() {
                        instance.handle = pending.take();
                        inner.state = ConnectionState::Connected;
                    }
                }

                // 连接期间实例不可能被移除（disconnect 同样持有 connect_gate），这里只做兜底
                if let Some(orphan) = pending {
                    warn!(resource, kind, "连接完成时资源已被移除，关闭新建连接");
                    if let Err(e) = self.driver.close(&client, Some(orphan)).await {
                        error!(resource, kind, error = %e, "关闭多余连接失败");
                    }
                    return Err(LifecycleError::NotInitialized {
                        resource: resource.to_string(),
                    });
                }

                Ok(ConnectReport {
                    attempts,
                    elapsed: started.elapsed(),
                })
            }
            RetryOutcome::Exhausted { attempts, last_error } => {
                self.reset_to_configured();
                error!(resource, kind, attempts, "所有连接尝试均失败");
                Err(LifecycleError::ConnectionExhausted {
                    resource: resource.to_string(),
                    attempts,
                    last_error: format!("{:#}", last_error),
                })
            }
            RetryOutcome::Cancelled { attempts } => {
                self.reset_to_configured();
                warn!(resource, kind, attempts, "连接已取消");
                Err(LifecycleError::Cancelled {
                    resource: resource.to_string(),
                    attempts,
                })
            }
        }
    }

    fn on_retry_state(&self, resource: &str, policy: &RetryPolicy, state: RetryState) {
        match state {
            RetryState::Attempting(attempt) => {
                debug!(resource, attempt, max_attempts = policy.max_attempts, "发起连接尝试");
                self.lock().state = ConnectionState::Connecting {
                    attempt,
                    max_attempts: policy.max_attempts,
                };
            }
            RetryState::Waiting { after_attempt, delay } => {
                info!(
                    resource,
                    attempt = after_attempt,
                    delay_ms = delay.as_millis() as u64,
                    "{} ms 后重试...",
                    delay.as_millis()
                );
            }
            _ => {}
        }
    }

    fn reset_to_configured(&self) {
        let mut inner = self.lock();
        if inner.instance.is_some() {
            inner.state = ConnectionState::Configured;
        }
    }

    fn current_handle(&self) -> Option<D::Handle> {
        self.lock()
            .instance
            .as_ref()
            .and_then(|instance| instance.handle.clone())
    }

    /// 获取已连接的资源句柄
    ///
    /// 不会隐式触发连接；尚未连接时返回 [`LifecycleError::NotConnected`]。
    pub fn handle(&self) -> Result<D::Handle, LifecycleError> {
        let inner = self.lock();
        match inner.instance.as_ref().and_then(|instance| instance.handle.clone()) {
            Some(handle) => Ok(handle),
            None => {
                let resource = Self::resource_name(&inner, self.driver.kind());
                warn!(resource = %resource, "尝试在连接之前使用资源");
                Err(LifecycleError::NotConnected { resource })
            }
        }
    }

    /// 检查资源当前是否可达，不返回错误
    pub async fn ping(&self) -> bool {
        let name = self.name();
        let Some(handle) = self.current_handle() else {
            warn!(resource = %name, "资源尚未连接，连通性检查失败");
            return false;
        };

        match self.driver.ping(&handle).await {
            Ok(()) => {
                debug!(resource = %name, "资源连接正常");
                true
            }
            Err(e) => {
                error!(resource = %name, error = %format!("{:#}", e), "资源连通性检查失败");
                false
            }
        }
    }

    /// 断开连接并重置为未配置状态
    ///
    /// 底层关闭失败时返回 [`LifecycleError::Teardown`]，但状态仍然被清空。
    /// 如果有连接流程正在进行，会等待其结束。
    pub async fn disconnect(&self) -> Result<(), LifecycleError> {
        let kind = self.driver.kind();
        let _in_flight = self.connect_gate.lock().await;

        let taken = {
            let mut inner = self.lock();
            let taken = inner.instance.take();
            if taken.is_some() {
                inner.state = ConnectionState::Disconnecting;
            }
            taken
        };

        let Some(instance) = taken else {
            warn!(kind, "资源已经断开");
            return Ok(());
        };

        let resource = instance.config.name.clone();
        info!(resource = %resource, kind, "正在断开资源连接...");

        let result = self.driver.close(&instance.client, instance.handle).await;
        {
            // 关闭期间可能已有新的配置写入
            let mut inner = self.lock();
            if inner.instance.is_none() {
                inner.state = ConnectionState::Unconfigured;
            }
        }

        match result {
            Ok(()) => {
                info!(resource = %resource, kind, "资源连接已断开");
                Ok(())
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(resource = %resource, kind, error = %reason, "断开资源连接失败");
                Err(LifecycleError::Teardown { resource, reason })
            }
        }
    }
}

impl<D: ResourceDriver> fmt::Debug for ConnectionManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("kind", &self.driver.kind())
            .field("resource", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
