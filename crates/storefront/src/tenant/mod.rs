//! Tenant registry, resolution and request context.

mod context;
mod model;
mod registry;
mod resolver;

pub use context::{
    CurrentTenant, DirectoryResolver, MissingTenantContext, ResolveTenant, TENANT_CUSTOM_DOMAIN_HEADER,
    TENANT_DOMAIN_HEADER, TENANT_SLUG_HEADER, TENANT_SUBDOMAIN_HEADER, TenantContext, TenantSource,
    signals_from_headers, tenant_context_middleware,
};
pub use model::{
    AnalyticsIds, ContactInfo, PublicTenantConfig, SeoMetadata, SocialLinks, Tenant, TenantRow,
    TenantSecrets, ThemeTokens,
};
pub use registry::{
    CachedTenantDirectory, RegistryError, TenantDirectory, TenantRegistry, TenantRepository,
};
pub use resolver::{
    RequestScope, Resolution, ResolutionSignals, ResolutionSource, TenantResolver, normalise_host,
};
