//! Host-based tenant resolution through the full middleware stack.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use paintstore_core::TenantId;
use paintstore_integration_tests::{PLATFORM_ROOT, TestPlatform};
use paintstore_storefront::tenant::Tenant;
use secrecy::SecretString;

async fn slug_for(platform: &TestPlatform, host: &str) -> String {
    let response = platform.get(host, "/api/tenant", None).await;
    assert_eq!(response.status, 200, "host {host}");
    response.body["slug"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_platform_subdomain_resolves_tenant() {
    let platform = TestPlatform::new();
    assert_eq!(slug_for(&platform, &format!("pintemas.{PLATFORM_ROOT}")).await, "pintemas");
    assert_eq!(slug_for(&platform, &format!("PINTEMAS.{PLATFORM_ROOT}:8080")).await, "pintemas");
}

#[tokio::test]
async fn test_custom_domain_and_aliases_resolve_tenant() {
    let platform = TestPlatform::new();
    assert_eq!(slug_for(&platform, "pinteya.com").await, "pinteya");
    assert_eq!(slug_for(&platform, "www.pinteya.com").await, "pinteya");
    assert_eq!(slug_for(&platform, "www.pinteya.com.ar").await, "pinteya");
}

#[tokio::test]
async fn test_unknown_hosts_fall_back_to_default() {
    let platform = TestPlatform::new();
    for host in ["localhost:3000", "127.0.0.1", "unknown-shop.example", PLATFORM_ROOT] {
        assert_eq!(slug_for(&platform, host).await, "pinteya", "host {host}");
    }
    assert_eq!(
        slug_for(&platform, &format!("nobody.{PLATFORM_ROOT}")).await,
        "pinteya"
    );
}

#[tokio::test]
async fn test_reserved_subdomains_are_not_tenants() {
    let platform = TestPlatform::with_tenants(
        Tenant::new(TenantId::generate(), "pinteya", "Pinteya").with_subdomain("pinteya"),
        Tenant::new(TenantId::generate(), "squatter", "Squatter").with_subdomain("www"),
    );
    assert_eq!(slug_for(&platform, &format!("www.{PLATFORM_ROOT}")).await, "pinteya");
}

#[tokio::test]
async fn test_inactive_tenant_is_never_served() {
    let platform = TestPlatform::with_tenants(
        Tenant::new(TenantId::generate(), "pinteya", "Pinteya").with_subdomain("pinteya"),
        Tenant::new(TenantId::generate(), "cerrada", "Cerrada")
            .with_subdomain("cerrada")
            .deactivated(),
    );
    assert_eq!(slug_for(&platform, &format!("cerrada.{PLATFORM_ROOT}")).await, "pinteya");
}

#[tokio::test]
async fn test_resolved_tenant_is_echoed_in_headers() {
    let platform = TestPlatform::new();
    let response = platform
        .get(&TestPlatform::host(&platform.pintemas), "/health", None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.headers["x-tenant-slug"], "pintemas");
    assert_eq!(
        response.headers["x-tenant-domain"],
        format!("pintemas.{PLATFORM_ROOT}").as_str()
    );
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_untrusted_edge_headers_are_ignored() {
    let platform = TestPlatform::new();
    let response = platform
        .send_with_headers(
            Method::GET,
            &format!("pintemas.{PLATFORM_ROOT}"),
            "/api/tenant",
            None,
            None,
            &[("x-tenant-slug", "pinteya"), ("x-tenant-domain", "pinteya.com")],
        )
        .await;
    assert_eq!(response.body["slug"], "pintemas");
}

#[tokio::test]
async fn test_public_config_never_contains_secrets() {
    let mut pinteya = Tenant::new(TenantId::generate(), "pinteya", "Pinteya").with_subdomain("pinteya");
    pinteya.secrets.mercadopago_access_token = Some(SecretString::from("APP_USR-mp-token-1234".to_owned()));
    pinteya.secrets.resend_api_key = Some(SecretString::from("re_live_key_5678".to_owned()));
    let platform = TestPlatform::with_tenants(
        pinteya,
        Tenant::new(TenantId::generate(), "pintemas", "Pintemas").with_subdomain("pintemas"),
    );

    let response = platform.get(&format!("pinteya.{PLATFORM_ROOT}"), "/api/tenant", None).await;
    let body = response.body.to_string();
    assert!(!body.contains("APP_USR-mp-token-1234"));
    assert!(!body.contains("re_live_key_5678"));
    assert!(response.body.get("secrets").is_none());
    assert_eq!(response.body["base_url"], format!("https://pinteya.{PLATFORM_ROOT}"));
}
