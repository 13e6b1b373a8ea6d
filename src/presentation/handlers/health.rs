//! 健康检查处理器
//!
//! 逐个探测外部资源的连通性

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::infrastructure::lifecycle::ProbeReport;
use crate::presentation::routes::AppState;

/// 系统健康状态
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub resources: Vec<ProbeReport>,
}

/// 健康检查
///
/// 所有资源可达时返回 200，否则返回 503 并标记为 `degraded`。
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    info!("🏥 健康检查请求");

    let mut resources = Vec::with_capacity(state.probes.len());
    for probe in state.probes.iter() {
        resources.push(probe.report().await);
    }

    let healthy = resources.iter().all(|report| report.reachable);
    if !healthy {
        let down: Vec<&str> = resources
            .iter()
            .filter(|report| !report.reachable)
            .map(|report| report.name.as_str())
            .collect();
        warn!("⚠️ 部分资源不可用: {:?}", down);
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" },
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            resources,
        }),
    )
}
