mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use warden_api::config::{ResolutionPolicy, ResolutionStrategy};

use common::{bearer_token, test_app, TestAppBuilder};

// Resolution behavior at the HTTP boundary: one configured signal source,
// stable error codes, strict-by-default.

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn known_tenant_header_resolves() {
    let app = test_app();
    let (status, body) = app.get("/api/data/products", Some("t1")).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn missing_header_is_rejected_before_any_data_access() {
    let app = test_app();

    let (status, body) =
        app.post_json("/api/data/products", None, &json!({"name": "widget"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_TENANT");
    assert_eq!(body["error"], true);

    // The pipeline stopped at resolution: nothing reached the store
    assert_eq!(app.store.row_count("products").await, 0);
}

#[tokio::test]
async fn unknown_tenant_is_rejected_with_invalid_tenant() {
    let app = test_app();
    let (status, body) = app.get("/api/data/products", Some("bad")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TENANT");
}

#[tokio::test]
async fn inactive_tenant_is_rejected_like_unknown() {
    let app = test_app();
    app.registry.deactivate("t1").await;
    app.directory.invalidate("t1").await;

    let (status, body) = app.get("/api/data/products", Some("t1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TENANT");
}

#[tokio::test]
async fn claim_strategy_resolves_from_bearer_token() {
    let app = TestAppBuilder::new().strategy(ResolutionStrategy::Claim).build();

    let request = Request::builder()
        .method("GET")
        .uri("/api/data/products")
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer_token("t1")))
        .body(Body::empty())
        .expect("request");

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
}

#[tokio::test]
async fn claim_strategy_ignores_tenant_header() {
    let app = TestAppBuilder::new().strategy(ResolutionStrategy::Claim).build();

    // Header present, but the configured signal source is the claim
    let (status, body) = app.get("/api/data/products", Some("t1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
    assert_eq!(body["code"], "MISSING_TENANT");
}

#[tokio::test]
async fn subdomain_strategy_resolves_from_host() {
    let app = TestAppBuilder::new().strategy(ResolutionStrategy::Subdomain).build();

    let request = Request::builder()
        .method("GET")
        .uri("/api/data/products")
        .header(header::HOST, "t1.api.example.com")
        .body(Body::empty())
        .expect("request");

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
}

#[tokio::test]
async fn lenient_mode_admits_but_reads_stay_fail_closed() {
    let app = TestAppBuilder::new().policy(ResolutionPolicy::Lenient).build();

    // The request is not rejected at resolution...
    let (status, body) = app.get("/api/data/products", None).await;
    // ...but the unresolved session refuses tenant-owned reads, so there is
    // no silent empty-200
    assert_eq!(status, StatusCode::FORBIDDEN, "body: {}", body);
    assert_eq!(body["code"], "TENANT_REQUIRED");
}

#[tokio::test]
async fn resolution_is_deterministic_across_repeats() {
    let app = test_app();
    for _ in 0..3 {
        let (status, _) = app.get("/api/data/products", Some("t1")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.get("/api/data/products", Some("bad")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TENANT");
    }
}
