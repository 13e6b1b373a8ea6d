//! 测试用驱动
//!
//! `FakeDriver` 在内存中模拟连接成功/失败并记录调用次数；
//! `TcpProbeDriver` 只做 TCP 建连，用于验证真实的不可达地址。

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;

use super::{ResourceConfig, ResourceDriver};

/// 驱动调用计数
#[derive(Debug, Default)]
pub struct DriverStats {
    pub builds: AtomicU32,
    pub connects: AtomicU32,
    pub pings: AtomicU32,
    pub closes: AtomicU32,
}

#[derive(Debug, Clone)]
pub struct FakeClient {
    pub target: String,
}

/// 连接句柄，`id` 为建立该句柄时的连接调用序号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    pub id: u32,
}

/// 内存模拟驱动
#[derive(Debug, Clone)]
pub struct FakeDriver {
    succeed_on: Option<u32>,
    reject_build: bool,
    fail_close: bool,
    connect_latency: Duration,
    close_latency: Duration,
    reachable: Arc<AtomicBool>,
    stats: Arc<DriverStats>,
}

impl FakeDriver {
    /// 第一次连接即成功
    pub fn succeeding() -> Self {
        Self::succeeding_on(1)
    }

    /// 第 `attempt` 次连接调用开始成功
    pub fn succeeding_on(attempt: u32) -> Self {
        Self {
            succeed_on: Some(attempt),
            reject_build: false,
            fail_close: false,
            connect_latency: Duration::ZERO,
            close_latency: Duration::ZERO,
            reachable: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(DriverStats::default()),
        }
    }

    /// 连接永远失败
    pub fn failing() -> Self {
        Self {
            succeed_on: None,
            ..Self::succeeding()
        }
    }

    pub fn rejecting_build(mut self) -> Self {
        self.reject_build = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn with_connect_latency(mut self, latency: Duration) -> Self {
        self.connect_latency = latency;
        self
    }

    pub fn with_close_latency(mut self, latency: Duration) -> Self {
        self.close_latency = latency;
        self
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceDriver for FakeDriver {
    type Client = FakeClient;
    type Handle = FakeHandle;

    fn kind(&self) -> &'static str {
        "fake"
    }

    fn build(&self, config: &ResourceConfig) -> anyhow::Result<FakeClient> {
        if self.reject_build {
            return Err(anyhow!("无法解析地址: {}", config.target));
        }
        self.stats.builds.fetch_add(1, Ordering::SeqCst);
        Ok(FakeClient {
            target: config.target.clone(),
        })
    }

    async fn connect(&self, client: &FakeClient, _config: &ResourceConfig) -> anyhow::Result<FakeHandle> {
        let call = self.stats.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.connect_latency.is_zero() {
            tokio::time::sleep(self.connect_latency).await;
        }

        match self.succeed_on {
            Some(first_success) if call >= first_success => Ok(FakeHandle { id: call }),
            _ => Err(anyhow!("{} 拒绝连接 (第 {} 次调用)", client.target, call)),
        }
    }

    async fn ping(&self, _handle: &FakeHandle) -> anyhow::Result<()> {
        self.stats.pings.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(anyhow!("连接已中断"))
        }
    }

    async fn close(&self, _client: &FakeClient, _handle: Option<FakeHandle>) -> anyhow::Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if !self.close_latency.is_zero() {
            tokio::time::sleep(self.close_latency).await;
        }
        if self.fail_close {
            return Err(anyhow!("关闭连接超时"));
        }
        Ok(())
    }
}

/// TCP 可达性驱动
#[derive(Debug, Clone, Default)]
pub struct TcpProbeDriver {
    stats: Arc<DriverStats>,
}

#[derive(Debug, Clone)]
pub struct TcpTarget {
    host: String,
    port: u16,
}

impl TcpProbeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    async fn dial(host: &str, port: u16, timeout: Duration) -> anyhow::Result<SocketAddr> {
        let stream = tokio::time::timeout(timeout, tokio::net::TcpStream::connect((host, port)))
            .await
            .with_context(|| format!("连接 {}:{} 超时", host, port))?
            .with_context(|| format!("无法连接 {}:{}", host, port))?;
        Ok(stream.peer_addr()?)
    }
}

#[async_trait]
impl ResourceDriver for TcpProbeDriver {
    type Client = TcpTarget;
    type Handle = SocketAddr;

    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn build(&self, config: &ResourceConfig) -> anyhow::Result<TcpTarget> {
        let url = url::Url::parse(&config.target).context("地址格式无效")?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("地址缺少主机名: {}", config.target))?
            .to_string();
        let port = url
            .port()
            .ok_or_else(|| anyhow!("地址缺少端口: {}", config.target))?;
        self.stats.builds.fetch_add(1, Ordering::SeqCst);
        Ok(TcpTarget { host, port })
    }

    async fn connect(&self, client: &TcpTarget, config: &ResourceConfig) -> anyhow::Result<SocketAddr> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Self::dial(&client.host, client.port, config.options.connect_timeout()).await
    }

    async fn ping(&self, handle: &SocketAddr) -> anyhow::Result<()> {
        self.stats.pings.fetch_add(1, Ordering::SeqCst);
        tokio::net::TcpStream::connect(handle)
            .await
            .with_context(|| format!("无法连接 {}", handle))?;
        Ok(())
    }

    async fn close(&self, _client: &TcpTarget, _handle: Option<SocketAddr>) -> anyhow::Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
