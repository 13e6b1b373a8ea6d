//! 有界重试
//!
//! 固定间隔（非指数退避）的重试循环，成功后立即返回。
//! 重试过程建模为显式状态机，便于观察当前尝试次数以及取消。

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 最大尝试次数（至少为1）
    pub max_attempts: u32,
    /// 两次尝试之间的固定间隔
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn from_millis(max_attempts: u32, delay_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(delay_ms))
    }

    /// 只尝试一次，不重试
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("重试次数必须大于0".to_string());
        }
        Ok(())
    }

    /// 全部失败时的最小等待总时长
    pub fn min_total_wait(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// 重试状态机
///
/// `Idle → Attempting(n) → Succeeded(n)`，失败时经 `Waiting` 回到
/// `Attempting(n + 1)`，直到 `Exhausted(n)`；任意时刻可以进入 `Cancelled(n)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting(u32),
    Waiting { after_attempt: u32, delay: Duration },
    Succeeded(u32),
    Exhausted(u32),
    Cancelled(u32),
}

impl RetryState {
    /// 已经开始的尝试次数
    pub fn attempts(&self) -> u32 {
        match *self {
            RetryState::Idle => 0,
            RetryState::Attempting(n)
            | RetryState::Succeeded(n)
            | RetryState::Exhausted(n)
            | RetryState::Cancelled(n) => n,
            RetryState::Waiting { after_attempt, .. } => after_attempt,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded(_) | RetryState::Exhausted(_) | RetryState::Cancelled(_)
        )
    }
}

/// 重试结果
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: E },
    Cancelled { attempts: u32 },
}

/// 按策略执行操作，直到成功、次数耗尽或被取消
///
/// `op` 收到从1开始的尝试序号；`on_state` 在每次状态迁移时被调用。
pub async fn retry_with_policy<T, E, F, Fut, S>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_state: S,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(RetryState),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut state = RetryState::Idle;
    on_state(state);

    loop {
        let attempt = state.attempts() + 1;
        state = RetryState::Attempting(attempt);
        on_state(state);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = op(attempt) => Some(result),
        };

        let error = match result {
            None => {
                on_state(RetryState::Cancelled(attempt));
                return RetryOutcome::Cancelled { attempts: attempt };
            }
            Some(Ok(value)) => {
                on_state(RetryState::Succeeded(attempt));
                return RetryOutcome::Succeeded { value, attempts: attempt };
            }
            Some(Err(error)) => error,
        };

        if attempt >= max_attempts {
            on_state(RetryState::Exhausted(attempt));
            return RetryOutcome::Exhausted {
                attempts: attempt,
                last_error: error,
            };
        }

        state = RetryState::Waiting {
            after_attempt: attempt,
            delay: policy.delay,
        };
        on_state(state);

        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(policy.delay) => false,
        };
        if cancelled {
            on_state(RetryState::Cancelled(attempt));
            return RetryOutcome::Cancelled { attempts: attempt };
        }
    }
}
