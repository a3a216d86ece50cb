//! Admin and platform APIs are throttled per client address.

#![allow(clippy::unwrap_used)]

use std::num::{NonZeroU32, NonZeroU64};

use axum::http::{Method, StatusCode};
use paintstore_integration_tests::TestPlatform;
use paintstore_storefront::config::RateLimitConfig;

fn two_per_hour() -> RateLimitConfig {
    RateLimitConfig {
        burst: NonZeroU32::new(2).unwrap(),
        replenish_secs: NonZeroU64::new(3600).unwrap(),
    }
}

#[tokio::test]
async fn test_admin_burst_is_followed_by_429() {
    let platform = TestPlatform::with_rate_limits(two_per_hour());
    let host = TestPlatform::host(&platform.pinteya);

    for _ in 0..2 {
        let response = platform.get(&host, "/api/admin/me", None).await;
        assert_eq!(response.status, StatusCode::OK);
    }
    let throttled = platform.get(&host, "/api/admin/me", None).await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);

    let other_client = platform
        .send_with_headers(
            Method::GET,
            &host,
            "/api/admin/me",
            None,
            None,
            &[("x-forwarded-for", "198.51.100.77")],
        )
        .await;
    assert_eq!(other_client.status, StatusCode::OK);
}

#[tokio::test]
async fn test_platform_api_is_throttled_and_storefront_is_not() {
    let platform = TestPlatform::with_rate_limits(two_per_hour());
    let admin_host = TestPlatform::admin_host();
    let host = TestPlatform::host(&platform.pinteya);

    for _ in 0..2 {
        platform.get(&admin_host, "/api/platform/tenants", None).await;
    }
    let throttled = platform.get(&admin_host, "/api/platform/tenants", None).await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);

    for _ in 0..5 {
        let response = platform.get(&host, "/api/products", None).await;
        assert_eq!(response.status, StatusCode::OK);
    }
}
