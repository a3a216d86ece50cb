//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{RateLimitConfig, StorefrontConfig, TenancyConfig};
use crate::db::{PgQueryClient, QueryClient};
use crate::tenant::{
    CachedTenantDirectory, DirectoryResolver, ResolveTenant, TenantDirectory, TenantResolver,
    TenantSource,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It holds no per-request
/// data; the resolved tenant lives in each request's extensions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    tenancy: TenancyConfig,
    rate_limits: RateLimitConfig,
    client: Arc<dyn QueryClient>,
    resolver: Arc<dyn ResolveTenant>,
    tenants: TenantSource,
}

impl AppState {
    /// Production wiring: Postgres client, cached tenant directory.
    #[must_use]
    pub fn new(config: &StorefrontConfig, pool: PgPool) -> Self {
        let client: Arc<dyn QueryClient> = Arc::new(PgQueryClient::new(pool));
        let tenants = TenantSource::Cached(CachedTenantDirectory::new(
            Arc::clone(&client),
            &config.tenancy.default_slug,
            config.tenancy.cache_ttl,
        ));
        Self::with_client(config.tenancy.clone(), client, tenants).with_rate_limits(config.rate_limits)
    }

    /// Directory-backed resolution over `tenants`.
    #[must_use]
    pub fn with_client(
        tenancy: TenancyConfig,
        client: Arc<dyn QueryClient>,
        tenants: TenantSource,
    ) -> Self {
        let resolver = Arc::new(DirectoryResolver::new(
            TenantResolver::new(&tenancy),
            tenants.clone(),
        ));
        Self::from_parts(tenancy, client, resolver, tenants)
    }

    /// A fixed tenant snapshot; used by tests and local demos.
    #[must_use]
    pub fn with_directory(
        tenancy: TenancyConfig,
        client: Arc<dyn QueryClient>,
        directory: TenantDirectory,
    ) -> Self {
        Self::with_client(tenancy, client, TenantSource::Fixed(Arc::new(directory)))
    }

    /// Assemble state from explicit parts.
    ///
    /// Tests substitute the resolver or the persistence client here without
    /// touching any handler.
    #[must_use]
    pub fn from_parts(
        tenancy: TenancyConfig,
        client: Arc<dyn QueryClient>,
        resolver: Arc<dyn ResolveTenant>,
        tenants: TenantSource,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                tenancy,
                rate_limits: RateLimitConfig::default(),
                client,
                resolver,
                tenants,
            }),
        }
    }

    /// Replace the admin and platform throttling settings.
    #[must_use]
    pub fn with_rate_limits(self, rate_limits: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                tenancy: self.inner.tenancy.clone(),
                rate_limits,
                client: Arc::clone(&self.inner.client),
                resolver: Arc::clone(&self.inner.resolver),
                tenants: self.inner.tenants.clone(),
            }),
        }
    }

    #[must_use]
    pub fn tenancy(&self) -> &TenancyConfig {
        &self.inner.tenancy
    }

    #[must_use]
    pub fn rate_limits(&self) -> &RateLimitConfig {
        &self.inner.rate_limits
    }

    /// The persistence client. Tenant-owned tables must be reached through
    /// [`crate::scope`], never through this directly.
    #[must_use]
    pub fn client(&self) -> &dyn QueryClient {
        self.inner.client.as_ref()
    }

    #[must_use]
    pub fn resolver(&self) -> &dyn ResolveTenant {
        self.inner.resolver.as_ref()
    }

    /// Source of the tenant registry snapshot.
    #[must_use]
    pub fn tenants(&self) -> &TenantSource {
        &self.inner.tenants
    }
}
