//! 路由配置模块
//!
//! 组织和配置所有HTTP路由

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::middleware::{bearer_auth, AuthState};
use crate::infrastructure::lifecycle::ResourceProbe;
use crate::presentation::handlers;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub probes: Arc<Vec<Arc<dyn ResourceProbe>>>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(probes: Vec<Arc<dyn ResourceProbe>>, auth: AuthState) -> Self {
        Self {
            probes: Arc::new(probes),
            auth,
        }
    }
}

/// 创建应用路由
pub fn create_routes(state: AppState) -> Router {
    // 需要JWT认证的路由
    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), bearer_auth));

    // 公开路由
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        // 全局中间件
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
