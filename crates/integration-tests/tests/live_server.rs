//! Smoke tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`ps-cli migrate`)
//! - The storefront running (`cargo run -p paintstore-storefront`)
//!
//! Run with: `cargo test -p paintstore-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};

fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_health() {
    let response = Client::new()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_readiness_reaches_database() {
    let response = Client::new()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_live_tenant_config_has_no_secrets() {
    let response = Client::new()
        .get(format!("{}/api/tenant", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-tenant-slug"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("secrets").is_none());
}
