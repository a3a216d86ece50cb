//! Request-scoped tenant context.
//!
//! The tenant is resolved once per request by [`tenant_context_middleware`]
//! and stored in the request's extensions as a [`TenantContext`]. Handlers,
//! data access and response headers all read that one value; nothing in the
//! process holds a "current tenant" outside the request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Span, error};

use super::model::{PublicTenantConfig, Tenant};
use super::registry::{CachedTenantDirectory, TenantDirectory};
use super::resolver::{
    RequestScope, Resolution, ResolutionSignals, ResolutionSource, TenantResolver,
};
use crate::scope::{ScopeError, TenantScope};
use crate::state::AppState;

pub const TENANT_SLUG_HEADER: &str = "x-tenant-slug";
pub const TENANT_DOMAIN_HEADER: &str = "x-tenant-domain";
pub const TENANT_SUBDOMAIN_HEADER: &str = "x-tenant-subdomain";
pub const TENANT_CUSTOM_DOMAIN_HEADER: &str = "x-tenant-custom-domain";

/// The tenant a request was resolved to.
///
/// Cheap to clone; every clone refers to the same resolution.
#[derive(Debug, Clone)]
pub struct TenantContext {
    inner: Arc<TenantContextInner>,
}

#[derive(Debug)]
struct TenantContextInner {
    resolution: Resolution,
    public_config: PublicTenantConfig,
    domain: String,
}

impl TenantContext {
    #[must_use]
    pub fn new(resolution: Resolution, platform_root: &str) -> Self {
        let public_config = PublicTenantConfig::project(&resolution.tenant, platform_root);
        let domain = resolution.tenant.primary_domain(platform_root);
        Self {
            inner: Arc::new(TenantContextInner {
                resolution,
                public_config,
                domain,
            }),
        }
    }

    /// The resolved tenant.
    #[must_use]
    pub fn current_tenant(&self) -> &Tenant {
        &self.inner.resolution.tenant
    }

    /// The secret-free projection for render contexts.
    #[must_use]
    pub fn current_public_config(&self) -> &PublicTenantConfig {
        &self.inner.public_config
    }

    #[must_use]
    pub fn source(&self) -> ResolutionSource {
        self.inner.resolution.source
    }

    #[must_use]
    pub fn scope(&self) -> RequestScope {
        self.inner.resolution.scope
    }

    #[must_use]
    pub fn is_platform_admin(&self) -> bool {
        self.scope() == RequestScope::PlatformAdmin
    }

    /// Canonical domain of the resolved tenant.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    /// Data-access scope for the resolved tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::TenantNotFound` if the tenant is inactive.
    pub fn tenant_scope(&self) -> Result<TenantScope, ScopeError> {
        TenantScope::for_tenant(self.current_tenant())
    }
}

/// Seam for the tenant-resolution step of the middleware.
///
/// Production uses [`DirectoryResolver`]; tests may substitute their own.
#[async_trait]
pub trait ResolveTenant: Send + Sync {
    async fn resolve(&self, host: &str, signals: &ResolutionSignals) -> Resolution;
}

/// Where the resolver gets its registry snapshot from.
#[derive(Clone)]
pub enum TenantSource {
    /// Loaded from the database and cached.
    Cached(CachedTenantDirectory),
    /// A fixed snapshot.
    Fixed(Arc<TenantDirectory>),
}

impl TenantSource {
    pub async fn snapshot(&self) -> Arc<TenantDirectory> {
        match self {
            Self::Cached(cache) => cache.snapshot().await,
            Self::Fixed(directory) => Arc::clone(directory),
        }
    }
}

/// [`TenantResolver`] rules applied to the current registry snapshot.
#[derive(Clone)]
pub struct DirectoryResolver {
    rules: TenantResolver,
    tenants: TenantSource,
}

impl DirectoryResolver {
    #[must_use]
    pub const fn new(rules: TenantResolver, tenants: TenantSource) -> Self {
        Self { rules, tenants }
    }
}

#[async_trait]
impl ResolveTenant for DirectoryResolver {
    async fn resolve(&self, host: &str, signals: &ResolutionSignals) -> Resolution {
        let directory = self.tenants.snapshot().await;
        self.rules.resolve(host, signals, directory.as_ref())
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Collect the edge-injected `x-tenant-*` headers.
///
/// Whether they are honoured is the resolver's decision.
#[must_use]
pub fn signals_from_headers(headers: &HeaderMap) -> ResolutionSignals {
    ResolutionSignals {
        tenant_slug: header_str(headers, TENANT_SLUG_HEADER),
        tenant_domain: header_str(headers, TENANT_DOMAIN_HEADER),
        subdomain: header_str(headers, TENANT_SUBDOMAIN_HEADER),
        custom_domain: header_str(headers, TENANT_CUSTOM_DOMAIN_HEADER),
    }
}

/// Resolve the tenant once and attach it to the request.
///
/// Records the tenant in the tracing span and Sentry scope, and writes the
/// resolved tenant to the response headers for the presentation layer.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = header_str(request.headers(), header::HOST.as_str())
        .or_else(|| request.uri().host().map(str::to_owned))
        .unwrap_or_default();
    let signals = signals_from_headers(request.headers());

    let resolution = state.resolver().resolve(&host, &signals).await;
    let context = TenantContext::new(resolution, &state.tenancy().platform_root);

    let slug = context.current_tenant().slug.clone();
    let span = Span::current();
    span.record("tenant", slug.as_str());
    span.record("tenant_source", context.source().as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("tenant", &slug);
    });

    request.extensions_mut().insert(context.clone());
    let mut response = next.run(request).await;

    let tenant = context.current_tenant();
    let outbound = [
        (TENANT_SLUG_HEADER, Some(tenant.slug.as_str())),
        (TENANT_DOMAIN_HEADER, Some(context.domain())),
        (TENANT_SUBDOMAIN_HEADER, tenant.subdomain.as_deref()),
        (TENANT_CUSTOM_DOMAIN_HEADER, tenant.custom_domain.as_deref()),
    ];
    for (name, value) in outbound {
        if let Some(value) = value
            && let Ok(value) = HeaderValue::from_str(value)
        {
            response
                .headers_mut()
                .insert(HeaderName::from_static(name), value);
        }
    }

    response
}

/// Rejection when a handler needs a tenant the middleware never attached.
#[derive(Debug)]
pub struct MissingTenantContext;

impl IntoResponse for MissingTenantContext {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_message(
            "Tenant context missing from request",
            sentry::Level::Fatal,
        );
        error!(sentry_event_id = %event_id, "Tenant context missing from request");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Extractor for the request's [`TenantContext`].
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentTenant(ctx): CurrentTenant) -> impl IntoResponse {
///     Json(ctx.current_public_config().clone())
/// }
/// ```
pub struct CurrentTenant(pub TenantContext);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = MissingTenantContext;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .map(Self)
            .ok_or(MissingTenantContext)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paintstore_core::TenantId;

    use super::*;
    use crate::config::TenancyConfig;

    fn resolver() -> DirectoryResolver {
        let directory = TenantDirectory::build(
            vec![
                Tenant::new(TenantId::generate(), "pinteya", "Pinteya").with_subdomain("pinteya"),
                Tenant::new(TenantId::generate(), "pintemas", "Pintemas")
                    .with_subdomain("pintemas")
                    .with_custom_domain("pintemas.com"),
            ],
            "pinteya",
        );
        DirectoryResolver::new(
            TenantResolver::new(&TenancyConfig::default()),
            TenantSource::Fixed(Arc::new(directory)),
        )
    }

    #[test]
    fn test_signals_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_SLUG_HEADER, HeaderValue::from_static(" pintemas "));
        headers.insert(TENANT_SUBDOMAIN_HEADER, HeaderValue::from_static(""));
        let signals = signals_from_headers(&headers);
        assert_eq!(signals.tenant_slug.as_deref(), Some("pintemas"));
        assert!(signals.subdomain.is_none());
        assert!(signals.custom_domain.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_their_own_tenant() {
        let resolver = Arc::new(resolver());
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    let (host, expected) = if i % 2 == 0 {
                        ("pinteya.pintureriadigital.com", "pinteya")
                    } else {
                        ("pintemas.com", "pintemas")
                    };
                    let resolution = resolver.resolve(host, &ResolutionSignals::default()).await;
                    let ctx = TenantContext::new(resolution, "pintureriadigital.com");
                    tokio::task::yield_now().await;
                    assert_eq!(ctx.current_tenant().slug, expected);
                    assert_eq!(ctx.current_public_config().slug, expected);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_context_exposes_public_config_and_domain() {
        let resolution = resolver()
            .resolve("www.pintemas.com", &ResolutionSignals::default())
            .await;
        let ctx = TenantContext::new(resolution, "pintureriadigital.com");
        assert_eq!(ctx.domain(), "pintemas.com");
        assert_eq!(ctx.current_public_config().base_url, "https://pintemas.com");
        assert!(!ctx.is_platform_admin());
        assert!(ctx.tenant_scope().is_ok());
    }
}
