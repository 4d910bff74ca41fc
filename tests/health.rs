//! Health aggregation endpoint tests.

use std::sync::Arc;

use axum::http::StatusCode;

mod common;

use common::{route_to, start_gateway, start_mock_backend, test_client, test_config, StubCache};

#[tokio::test]
async fn test_health_reports_per_service_status() {
    let live = start_mock_backend("ok").await;

    // A dead target: bound then dropped so connections are refused.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let config = test_config(vec![
        route_to("/api/products", "product-service", live),
        route_to("/api/orders", "order-service", dead_addr),
    ]);
    let (addr, _shutdown) = start_gateway(config, Arc::new(StubCache { healthy: true })).await;

    let res = test_client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("gateway unreachable");

    // Backend failures are informational; the cache decides overall health.
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "api-gateway");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
    assert!(body["uptime"].is_number());

    assert_eq!(body["services"]["cache-store"]["status"], "healthy");
    assert_eq!(body["services"]["product-service"]["status"], "healthy");
    assert_eq!(body["services"]["order-service"]["status"], "unhealthy");
    assert!(body["services"]["order-service"]["error"].is_string());
}

#[tokio::test]
async fn test_health_unhealthy_when_cache_is_down() {
    let live = start_mock_backend("ok").await;

    let config = test_config(vec![route_to("/api/products", "product-service", live)]);
    let (addr, _shutdown) = start_gateway(config, Arc::new(StubCache { healthy: false })).await;

    let res = test_client()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    // Backends still report independently.
    assert_eq!(body["services"]["product-service"]["status"], "healthy");
    assert_eq!(body["services"]["cache-store"]["status"], "unhealthy");
}
