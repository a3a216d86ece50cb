//! Order placement with stock decrement.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use paintstore_integration_tests::{TestPlatform, principal};
use paintstore_storefront::{
    auth::Principal,
    db::Collection,
    models::AssociationSettings,
    scope::{CatalogRepository, TenantScope},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};

async fn add(platform: &TestPlatform, host: &str, buyer: &Principal, product: Value, quantity: i64) {
    let response = platform
        .send(
            Method::POST,
            host,
            "/api/cart",
            Some(buyer),
            Some(json!({ "product_id": product, "quantity": quantity })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_order_is_priced_per_tenant_and_decrements_stock() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 2500, 5).await;
    let buyer = principal("cliente@example.com");
    let host = TestPlatform::host(&platform.pinteya);

    add(&platform, &host, &buyer, json!(product), 2).await;
    let order = platform
        .send(Method::POST, &host, "/api/orders", Some(&buyer), None)
        .await;
    assert_eq!(order.status, StatusCode::CREATED);
    assert_eq!(order.body["total"], "5000");
    assert_eq!(order.body["status"], "pending");
    assert_eq!(order.body["tenant_id"], json!(platform.pinteya.id));

    let detail = platform
        .get(&host, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.body["stock"], 3);

    let cart = platform.get(&host, "/api/cart", Some(&buyer)).await;
    assert!(cart.body.as_array().unwrap().is_empty());

    let orders = platform.get(&host, "/api/orders", Some(&buyer)).await;
    assert_eq!(orders.body.as_array().unwrap().len(), 1);
    let elsewhere = platform
        .get(&TestPlatform::host(&platform.pintemas), "/api/orders", Some(&buyer))
        .await;
    assert!(elsewhere.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversell_is_refused_and_nothing_is_persisted() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 100, 1).await;
    let buyer = principal("cliente@example.com");
    let host = TestPlatform::host(&platform.pinteya);

    add(&platform, &host, &buyer, json!(product), 3).await;
    let order = platform
        .send(Method::POST, &host, "/api/orders", Some(&buyer), None)
        .await;
    assert_eq!(order.status, StatusCode::CONFLICT);
    assert!(platform.client.snapshot(Collection::Orders).await.is_empty());

    let detail = platform
        .get(&host, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.body["stock"], 1);
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let platform = TestPlatform::new();
    let buyer = principal("cliente@example.com");
    let response = platform
        .send(
            Method::POST,
            &TestPlatform::host(&platform.pinteya),
            "/api/orders",
            Some(&buyer),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shared_pool_is_drawn_down_by_every_tenant() {
    let platform = TestPlatform::new();
    let product = platform.canonical_product().await;
    let pool = platform
        .shared_pool(3, &[&platform.pinteya, &platform.pintemas])
        .await;
    for tenant in [&platform.pinteya, &platform.pintemas] {
        CatalogRepository::new(platform.client.as_ref(), TenantScope::for_tenant(tenant).unwrap())
            .upsert_association(
                product,
                &AssociationSettings {
                    price: Decimal::new(900, 0),
                    stock: 0,
                    is_visible: true,
                    is_featured: false,
                    shared_pool_id: Some(pool),
                    category_id: None,
                },
            )
            .await
            .unwrap();
    }

    let buyer = principal("cliente@example.com");
    let pinteya = TestPlatform::host(&platform.pinteya);
    let pintemas = TestPlatform::host(&platform.pintemas);

    add(&platform, &pinteya, &buyer, json!(product), 2).await;
    let first = platform
        .send(Method::POST, &pinteya, "/api/orders", Some(&buyer), None)
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let detail = platform
        .get(&pintemas, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.body["stock"], 1);

    add(&platform, &pintemas, &buyer, json!(product), 2).await;
    let second = platform
        .send(Method::POST, &pintemas, "/api/orders", Some(&buyer), None)
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_store_failure_mid_checkout_leaves_stock_and_cart() {
    let platform = TestPlatform::new();
    let product = platform.offer(&platform.pinteya, 1500, 4).await;
    let buyer = principal("cliente@example.com");
    let host = TestPlatform::host(&platform.pinteya);
    add(&platform, &host, &buyer, json!(product), 3).await;

    platform.client.fail_writes_to(Collection::CartItems).await;
    let response = platform
        .send(Method::POST, &host, "/api/orders", Some(&buyer), None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    assert!(platform.client.snapshot(Collection::Orders).await.is_empty());
    assert_eq!(platform.client.snapshot(Collection::CartItems).await.len(), 1);
    let detail = platform
        .get(&host, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(detail.body["stock"], 4);
}
