//! Test harness for the storefront router.
//!
//! [`TestPlatform`] wires the real router over an in-memory database with a
//! fixed tenant directory. Requests carry their principal in test headers;
//! an outer layer turns them into the [`Principal`] the session would
//! normally supply.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p paintstore-integration-tests
//!
//! # Against a running server as well
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p paintstore-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use paintstore_core::{
    Email, PermissionMatrix, PrincipalId, ProductId, SharedPoolId, TenantId, TenantRole,
};
use paintstore_storefront::{
    auth::Principal,
    build_router,
    config::{RateLimitConfig, TenancyConfig},
    db::{Collection, MemoryQueryClient, QueryClient, Row},
    models::{AssociationSettings, RoleGrant},
    scope::{CatalogRepository, TenantScope},
    services::{PoolSharing, TenantRoles, create_shared_pool, grant_super_admin},
    state::AppState,
    tenant::{Tenant, TenantDirectory},
};

pub const PRINCIPAL_HEADER: &str = "x-test-principal";
/// Client address sent with every request unless the caller sets its own.
pub const CLIENT_IP: &str = "203.0.113.10";
pub const EMAIL_HEADER: &str = "x-test-email";

pub const PLATFORM_ROOT: &str = "pintureriadigital.com";

async fn test_principal(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<PrincipalId>().ok());
    let email = request
        .headers()
        .get(EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Email::parse(v).ok());
    if let (Some(id), Some(email)) = (id, email) {
        request.extensions_mut().insert(Principal { id, email });
    }
    next.run(request).await
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn default_tenants() -> (Tenant, Tenant) {
    let pinteya = Tenant::new(TenantId::generate(), "pinteya", "Pinteya")
        .with_subdomain("pinteya")
        .with_custom_domain("pinteya.com")
        .with_alias("pinteya.com.ar");
    let pintemas =
        Tenant::new(TenantId::generate(), "pintemas", "Pintemas").with_subdomain("pintemas");
    (pinteya, pintemas)
}

/// Two tenants on one platform: `pinteya` (default, with a custom domain)
/// and `pintemas`.
pub struct TestPlatform {
    pub client: Arc<MemoryQueryClient>,
    pub pinteya: Tenant,
    pub pintemas: Tenant,
    router: Router,
}

/// A decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestPlatform {
    #[must_use]
    pub fn new() -> Self {
        let (pinteya, pintemas) = default_tenants();
        Self::with_tenants(pinteya, pintemas)
    }

    #[must_use]
    pub fn with_tenants(pinteya: Tenant, pintemas: Tenant) -> Self {
        Self::build(pinteya, pintemas, RateLimitConfig::default())
    }

    /// Default tenants with admin/platform throttling set to `rate_limits`.
    #[must_use]
    pub fn with_rate_limits(rate_limits: RateLimitConfig) -> Self {
        let (pinteya, pintemas) = default_tenants();
        Self::build(pinteya, pintemas, rate_limits)
    }

    fn build(pinteya: Tenant, pintemas: Tenant, rate_limits: RateLimitConfig) -> Self {
        let client = Arc::new(MemoryQueryClient::new());
        let tenancy = TenancyConfig {
            platform_root: PLATFORM_ROOT.to_owned(),
            default_slug: "pinteya".to_owned(),
            ..TenancyConfig::default()
        };
        let directory = TenantDirectory::build(vec![pinteya.clone(), pintemas.clone()], "pinteya");
        let shared: Arc<dyn QueryClient> = client.clone();
        let state =
            AppState::with_directory(tenancy, shared, directory).with_rate_limits(rate_limits);
        let router = build_router(state).layer(axum::middleware::from_fn(test_principal));

        Self {
            client,
            pinteya,
            pintemas,
            router,
        }
    }

    /// Host a tenant is served on under the platform root.
    #[must_use]
    pub fn host(tenant: &Tenant) -> String {
        format!(
            "{}.{PLATFORM_ROOT}",
            tenant.subdomain.as_deref().unwrap_or_default()
        )
    }

    #[must_use]
    pub fn admin_host() -> String {
        format!("admin.{PLATFORM_ROOT}")
    }

    pub async fn send(
        &self,
        method: Method,
        host: &str,
        path: &str,
        principal: Option<&Principal>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send_with_headers(method, host, path, principal, body, &[])
            .await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        host: &str,
        path: &str,
        principal: Option<&Principal>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri(path)
            .header("host", host);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("x-forwarded-for")) {
            builder = builder.header("x-forwarded-for", CLIENT_IP);
        }
        if let Some(principal) = principal {
            builder = builder
                .header(PRINCIPAL_HEADER, principal.id.to_string())
                .header(EMAIL_HEADER, principal.email.as_str());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, host: &str, path: &str, principal: Option<&Principal>) -> TestResponse {
        self.send(Method::GET, host, path, principal, None).await
    }

    /// Add a canonical product and offer it in `tenant`.
    pub async fn offer(&self, tenant: &Tenant, price: i64, stock: i64) -> ProductId {
        let id = self.canonical_product().await;
        self.associate(tenant, id, price, stock).await;
        id
    }

    /// Insert a canonical product row only.
    pub async fn canonical_product(&self) -> ProductId {
        let id = ProductId::generate();
        self.client
            .insert(
                Collection::Products,
                row(json!({
                    "id": id,
                    "name": "Látex interior 20L",
                    "slug": format!("latex-{id}"),
                    "description": null,
                    "brand": "Alba",
                    "image_url": null,
                    "created_at": Utc::now(),
                })),
            )
            .await
            .unwrap();
        id
    }

    pub async fn associate(&self, tenant: &Tenant, product: ProductId, price: i64, stock: i64) {
        CatalogRepository::new(self.client.as_ref(), TenantScope::for_tenant(tenant).unwrap())
            .upsert_association(
                product,
                &AssociationSettings {
                    price: Decimal::new(price, 0),
                    stock,
                    is_visible: true,
                    is_featured: false,
                    shared_pool_id: None,
                    category_id: None,
                },
            )
            .await
            .unwrap();
    }

    pub async fn grant(
        &self,
        tenant: &Tenant,
        principal: &Principal,
        role: TenantRole,
        permissions: PermissionMatrix,
    ) {
        TenantRoles::new(self.client.as_ref(), TenantScope::for_tenant(tenant).unwrap())
            .grant(principal.id, &RoleGrant { role, permissions })
            .await
            .unwrap();
    }

    /// Create a shared pool and provision it for each of `tenants`.
    pub async fn shared_pool(&self, quantity: i64, tenants: &[&Tenant]) -> SharedPoolId {
        let pool = create_shared_pool(self.client.as_ref(), "Depósito central", quantity)
            .await
            .unwrap();
        for tenant in tenants {
            PoolSharing::new(self.client.as_ref(), TenantScope::for_tenant(tenant).unwrap())
                .share(pool.id)
                .await
                .unwrap();
        }
        pool.id
    }

    pub async fn make_super_admin(&self, principal: &Principal) {
        grant_super_admin(self.client.as_ref(), principal.id)
            .await
            .unwrap();
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh principal.
#[must_use]
pub fn principal(email: &str) -> Principal {
    Principal {
        id: PrincipalId::generate(),
        email: Email::parse(email).unwrap(),
    }
}
