//! Health endpoint tests.
//!
//! Require a running API server (cargo run -p clementine-api).

use clementine_integration_tests::TestContext;
use reqwest::{Method, StatusCode};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn health_returns_ok() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("health request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn readiness_checks_the_database() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/health/ready"))
        .send()
        .await
        .expect("readiness request failed");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn cors_preflight_admits_the_frontend_origin() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .request(Method::OPTIONS, ctx.url("/api/products"))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("preflight request failed");

    assert!(resp.status().is_success());
    assert!(
        resp.headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn responses_carry_a_request_id() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("health request failed");

    assert!(resp.headers().contains_key("x-request-id"));
}
