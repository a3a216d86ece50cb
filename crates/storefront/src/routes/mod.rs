//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Storefront (resolved tenant)
//! GET  /api/tenant                      - Public tenant config
//! GET  /api/products                    - Visible catalog
//! GET  /api/products/{id}               - Single visible product
//! GET  /api/cart                        - Principal's cart
//! POST /api/cart                        - Add item
//! PATCH|DELETE /api/cart/{id}           - Change quantity / remove
//! GET|POST /api/orders                  - Principal's orders / place order
//! POST /api/analytics/events            - Record analytics event
//!
//! # Tenant admin (standing in the resolved tenant)
//! GET  /api/admin/me                    - Guard result for this tenant
//! GET  /api/admin/orders                - orders.view
//! GET|PATCH|DELETE /api/admin/orders/{id}
//! GET|POST /api/admin/categories        - products.view / products.create
//! PATCH|DELETE /api/admin/categories/{id}
//! PUT  /api/admin/products/{id}         - products.edit
//! GET|POST /api/admin/coupons           - marketing.view / marketing.create
//! DELETE /api/admin/coupons/{id}        - marketing.delete
//! GET|POST /api/admin/promotions        - marketing.view / marketing.create
//! GET  /api/admin/customers             - customers.view
//! GET  /api/admin/analytics/events      - analytics.view
//! PUT|DELETE /api/admin/roles/{principal} - settings.edit
//! GET  /api/admin/pools                 - products.view (pools shared with the tenant)
//! GET  /api/admin/audit                 - settings.view
//!
//! Admin and platform routes are rate limited per client IP (429 when
//! exhausted); admin mutations and refusals are written to the audit trail.
//!
//! # Platform (super admin on the admin host)
//! GET  /api/platform/tenants            - Active tenant listing
//! ```

pub mod admin;
pub mod platform;
pub mod storefront;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::{admin_audit_middleware, admin_rate_limiter};
use crate::state::AppState;

/// Storefront API routes.
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/tenant", get(storefront::tenant_config))
        .route("/products", get(storefront::list_products))
        .route("/products/{id}", get(storefront::show_product))
        .route(
            "/cart",
            get(storefront::show_cart).post(storefront::add_to_cart),
        )
        .route(
            "/cart/{id}",
            patch(storefront::update_cart_item).delete(storefront::remove_cart_item),
        )
        .route(
            "/orders",
            get(storefront::list_orders).post(storefront::place_order),
        )
        .route("/analytics/events", post(storefront::track_event))
}

/// Tenant-admin API routes.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(admin::me))
        .route("/orders", get(admin::list_orders))
        .route(
            "/orders/{id}",
            get(admin::show_order)
                .patch(admin::update_order)
                .delete(admin::delete_order),
        )
        .route(
            "/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route(
            "/categories/{id}",
            patch(admin::update_category).delete(admin::delete_category),
        )
        .route("/products/{id}", put(admin::upsert_product))
        .route(
            "/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route("/coupons/{id}", delete(admin::delete_coupon))
        .route(
            "/promotions",
            get(admin::list_promotions).post(admin::create_promotion),
        )
        .route("/customers", get(admin::list_customers))
        .route("/analytics/events", get(admin::list_analytics_events))
        .route(
            "/roles/{principal}",
            put(admin::grant_role).delete(admin::revoke_role),
        )
        .route("/pools", get(admin::list_pools))
        .route("/audit", get(admin::list_audit_entries))
}

/// Platform API routes.
pub fn platform_routes() -> Router<AppState> {
    Router::new().route("/tenants", get(platform::list_tenants))
}

/// Create all routes.
///
/// The admin and platform routers each get their own rate limiter.
pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = admin_routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_audit_middleware,
        ))
        .layer(admin_rate_limiter(state.rate_limits()));
    let platform = platform_routes().layer(admin_rate_limiter(state.rate_limits()));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/admin", admin)
        .nest("/api/platform", platform)
        .nest("/api", storefront_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.client().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
