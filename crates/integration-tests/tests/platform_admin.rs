//! Platform routes on the admin host.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use paintstore_core::{PermissionMatrix, TenantRole};
use paintstore_integration_tests::{PLATFORM_ROOT, TestPlatform, principal};

#[tokio::test]
async fn test_admin_host_resolves_default_tenant() {
    let platform = TestPlatform::new();
    let response = platform
        .get(&TestPlatform::admin_host(), "/api/tenant", None)
        .await;
    assert_eq!(response.body["slug"], "pinteya");
}

#[tokio::test]
async fn test_super_admin_lists_tenants_on_admin_host() {
    let platform = TestPlatform::new();
    let ops = principal("ops@pintureriadigital.com");
    platform.make_super_admin(&ops).await;

    let response = platform
        .get(&TestPlatform::admin_host(), "/api/platform/tenants", Some(&ops))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let tenants = response.body.as_array().unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0]["slug"], "pintemas");
    assert_eq!(
        tenants[0]["base_url"],
        format!("https://pintemas.{PLATFORM_ROOT}")
    );
    assert_eq!(tenants[1]["base_url"], "https://pinteya.com");
}

#[tokio::test]
async fn test_platform_routes_need_admin_host() {
    let platform = TestPlatform::new();
    let ops = principal("ops@pintureriadigital.com");
    platform.make_super_admin(&ops).await;

    let response = platform
        .get(&TestPlatform::host(&platform.pinteya), "/api/platform/tenants", Some(&ops))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tenant_admin_is_not_platform_admin() {
    let platform = TestPlatform::new();
    let admin = principal("admin@pinteya.com");
    platform
        .grant(&platform.pinteya, &admin, TenantRole::TenantAdmin, PermissionMatrix::none())
        .await;

    let response = platform
        .get(&TestPlatform::admin_host(), "/api/platform/tenants", Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let anonymous = platform
        .get(&TestPlatform::admin_host(), "/api/platform/tenants", None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
