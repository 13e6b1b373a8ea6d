//! HTTP 路由集成测试

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use backend_kit::auth::{generate_token, AuthState, TokenOptions};
use backend_kit::infrastructure::lifecycle::testing::FakeDriver;
use backend_kit::infrastructure::lifecycle::{ConnectionManager, LazyResource, ResourceConfig, ResourceProbe, RetryPolicy};
use backend_kit::{create_routes, AppState};

async fn connected_database() -> Arc<ConnectionManager<FakeDriver>> {
    let manager = Arc::new(ConnectionManager::new(FakeDriver::succeeding()));
    manager.initialize(ResourceConfig::new("farm", "fake://db")).unwrap();
    manager.connect(RetryPolicy::once()).await.unwrap();
    manager
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_all_resources() {
    let database = connected_database().await;
    let cache = Arc::new(LazyResource::new(FakeDriver::succeeding(), ResourceConfig::new("redis", "fake://cache")).unwrap());
    cache.connect().await.unwrap();

    let probes: Vec<Arc<dyn ResourceProbe>> = vec![database, cache];
    let app = create_routes(AppState::new(probes, AuthState::new("access")));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["resources"].as_array().unwrap().len(), 2);
    assert_eq!(body["resources"][0]["name"], "farm");
    assert_eq!(body["resources"][0]["state"]["state"], "connected");
}

#[tokio::test]
async fn test_health_degraded_when_resource_not_connected() {
    let database = connected_database().await;
    let mail = Arc::new(LazyResource::new(FakeDriver::failing(), ResourceConfig::new("FarmOptima", "fake://smtp")).unwrap());
    assert!(mail.connect().await.is_err());

    let probes: Vec<Arc<dyn ResourceProbe>> = vec![database, mail];
    let app = create_routes(AppState::new(probes, AuthState::new("access")));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["resources"][1]["reachable"], false);
}

#[tokio::test]
async fn test_protected_route_requires_bearer_token() {
    let app = create_routes(AppState::new(Vec::new(), AuthState::new("access")));

    let response = app.clone().oneshot(get("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "UNAUTHORIZED");

    let token = generate_token(&json!({"userId": "42"}), "access", &TokenOptions::expires_in("15m")).unwrap();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["userId"], "42");
}
