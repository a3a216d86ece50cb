//! Tenant-owned data never crosses tenants, whatever the request says.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use paintstore_core::{PermissionMatrix, TenantRole};
use paintstore_integration_tests::{TestPlatform, principal};
use paintstore_storefront::db::Collection;
use serde_json::json;

#[tokio::test]
async fn test_product_offered_in_one_tenant_is_invisible_in_another() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 15_000, 4).await;
    let pinteya = TestPlatform::host(&platform.pinteya);
    let pintemas = TestPlatform::host(&platform.pintemas);

    let listed = platform.get(&pinteya, "/api/products", None).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
    assert_eq!(listed.body[0]["price"], "15000");

    let listed = platform.get(&pintemas, "/api/products", None).await;
    assert!(listed.body.as_array().unwrap().is_empty());

    let detail = platform
        .get(&pintemas, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_same_product_has_independent_prices_per_tenant() {
    let platform = TestPlatform::new();
    let product = platform.canonical_product().await;
    platform.associate(&platform.pinteya, product, 1000, 5).await;
    platform.associate(&platform.pintemas, product, 1200, 5).await;

    let path = format!("/api/products/{product}");
    let a = platform.get(&TestPlatform::host(&platform.pinteya), &path, None).await;
    let b = platform.get(&TestPlatform::host(&platform.pintemas), &path, None).await;
    assert_eq!(a.body["price"], "1000");
    assert_eq!(b.body["price"], "1200");
}

#[tokio::test]
async fn test_body_tenant_id_is_ignored_on_writes() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 500, 10).await;
    let buyer = principal("cliente@example.com");

    let response = platform
        .send(
            Method::POST,
            &TestPlatform::host(&platform.pinteya),
            "/api/cart",
            Some(&buyer),
            Some(json!({
                "product_id": product,
                "quantity": 2,
                "tenant_id": platform.pintemas.id,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["tenant_id"], json!(platform.pinteya.id));

    let stored = platform.client.snapshot(Collection::CartItems).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["tenant_id"], json!(platform.pinteya.id));
}

#[tokio::test]
async fn test_cart_is_per_tenant() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 500, 10).await;
    let buyer = principal("cliente@example.com");
    let pinteya = TestPlatform::host(&platform.pinteya);
    let pintemas = TestPlatform::host(&platform.pintemas);

    let added = platform
        .send(
            Method::POST,
            &pinteya,
            "/api/cart",
            Some(&buyer),
            Some(json!({ "product_id": product })),
        )
        .await;
    let item_id = added.body["id"].as_str().unwrap().to_owned();

    let cart = platform.get(&pintemas, "/api/cart", Some(&buyer)).await;
    assert!(cart.body.as_array().unwrap().is_empty());

    // Another tenant's row behaves exactly like a missing one
    let foreign = platform
        .send(
            Method::DELETE,
            &pintemas,
            &format!("/api/cart/{item_id}"),
            Some(&buyer),
            None,
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(platform.client.snapshot(Collection::CartItems).await.len(), 1);

    let own = platform
        .send(
            Method::DELETE,
            &pinteya,
            &format!("/api/cart/{item_id}"),
            Some(&buyer),
            None,
        )
        .await;
    assert_eq!(own.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_adding_twice_merges_quantity() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 500, 10).await;
    let buyer = principal("cliente@example.com");
    let host = TestPlatform::host(&platform.pinteya);

    for _ in 0..2 {
        platform
            .send(
                Method::POST,
                &host,
                "/api/cart",
                Some(&buyer),
                Some(json!({ "product_id": product, "quantity": 3 })),
            )
            .await;
    }
    let cart = platform.get(&host, "/api/cart", Some(&buyer)).await;
    assert_eq!(cart.body.as_array().unwrap().len(), 1);
    assert_eq!(cart.body[0]["quantity"], 6);
}

#[tokio::test]
async fn test_cart_requires_principal() {
    let platform = TestPlatform::new();
    let response = platform
        .get(&TestPlatform::host(&platform.pinteya), "/api/cart", None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_analytics_events_are_recorded_for_resolved_tenant() {
    let platform = TestPlatform::new();
    let response = platform
        .send(
            Method::POST,
            &TestPlatform::host(&platform.pintemas),
            "/api/analytics/events",
            None,
            Some(json!({ "event_name": "page_view", "page_path": "/productos" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let events = platform.client.snapshot(Collection::AnalyticsEvents).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["tenant_id"], json!(platform.pintemas.id));
}

#[tokio::test]
async fn test_admin_cannot_link_a_pool_shared_with_another_tenant() {
    let platform = TestPlatform::new();
    let product = platform.canonical_product().await;
    let pool = platform.shared_pool(50, &[&platform.pinteya]).await;
    let admin = principal("admin@pintemas.com");
    platform
        .grant(&platform.pintemas, &admin, TenantRole::TenantAdmin, PermissionMatrix::none())
        .await;
    let pintemas = TestPlatform::host(&platform.pintemas);

    let linked = platform
        .send(
            Method::PUT,
            &pintemas,
            &format!("/api/admin/products/{product}"),
            Some(&admin),
            Some(json!({ "price": "900", "stock": 0, "shared_pool_id": pool })),
        )
        .await;
    assert_eq!(linked.status, StatusCode::NOT_FOUND);
    assert!(platform.client.snapshot(Collection::TenantProducts).await.is_empty());

    let pools = platform.get(&pintemas, "/api/admin/pools", Some(&admin)).await;
    assert_eq!(pools.status, StatusCode::OK);
    assert!(pools.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_can_link_a_pool_shared_with_their_tenant() {
    let platform = TestPlatform::new();
    let product = platform.canonical_product().await;
    let pool = platform.shared_pool(50, &[&platform.pinteya]).await;
    let admin = principal("admin@pinteya.com");
    platform
        .grant(&platform.pinteya, &admin, TenantRole::TenantAdmin, PermissionMatrix::none())
        .await;
    let pinteya = TestPlatform::host(&platform.pinteya);

    let linked = platform
        .send(
            Method::PUT,
            &pinteya,
            &format!("/api/admin/products/{product}"),
            Some(&admin),
            Some(json!({ "price": "900", "stock": 0, "shared_pool_id": pool })),
        )
        .await;
    assert_eq!(linked.status, StatusCode::OK);

    let detail = platform
        .get(&pinteya, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.body["stock"], 50);
}
