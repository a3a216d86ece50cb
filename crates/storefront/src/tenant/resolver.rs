//! Tenant resolution: maps a request's host and edge signals to one tenant.
//!
//! Resolution is a pure function of its inputs and the registry snapshot it
//! is given. It never fails: anything unrecognised resolves to the default
//! tenant.
//!
//! # Priority
//!
//! 1. `admin.*` hosts: default tenant in the platform-admin scope
//! 2. `DEV_TENANT_SLUG` (development only)
//! 3. `x-tenant-slug` edge signal
//! 4. `x-tenant-custom-domain` edge signal
//! 5. `x-tenant-subdomain` edge signal
//! 6. `<subdomain>.<platform root>` host
//! 7. custom-domain host (exact, `www.` toggled, or alias)
//! 8. default tenant
//!
//! Edge signals (and `x-tenant-domain`, which replaces the raw host) are only
//! read when the deployment trusts its edge layer.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

use super::model::Tenant;
use super::registry::TenantRegistry;
use crate::config::TenancyConfig;

/// Platform subdomains that never name a tenant.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "admin", "api"];

/// Pre-parsed signals injected by the edge layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSignals {
    /// `x-tenant-slug`
    pub tenant_slug: Option<String>,
    /// `x-tenant-domain`, used in place of the `Host` header.
    pub tenant_domain: Option<String>,
    /// `x-tenant-subdomain`
    pub subdomain: Option<String>,
    /// `x-tenant-custom-domain`
    pub custom_domain: Option<String>,
}

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    AdminHost,
    DevOverride,
    EdgeSlug,
    CustomDomainSignal,
    SubdomainSignal,
    HostSubdomain,
    HostCustomDomain,
    Default,
}

impl ResolutionSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminHost => "admin_host",
            Self::DevOverride => "dev_override",
            Self::EdgeSlug => "edge_slug",
            Self::CustomDomainSignal => "custom_domain_signal",
            Self::SubdomainSignal => "subdomain_signal",
            Self::HostSubdomain => "host_subdomain",
            Self::HostCustomDomain => "host_custom_domain",
            Self::Default => "default",
        }
    }
}

/// What kind of request the host addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestScope {
    /// A tenant storefront.
    #[default]
    Storefront,
    /// The platform administration host. The tenant is the default one and
    /// carries no meaning of its own.
    PlatformAdmin,
}

/// Result of resolving one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tenant: Arc<Tenant>,
    pub source: ResolutionSource,
    pub scope: RequestScope,
    /// Normalised host the rules were applied to.
    pub host: String,
}

/// Host-to-tenant rules for one deployment.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    platform_root: String,
    dev_tenant_slug: Option<String>,
    trust_edge_headers: bool,
}

impl TenantResolver {
    #[must_use]
    pub fn new(config: &TenancyConfig) -> Self {
        Self {
            platform_root: normalise_host(&config.platform_root),
            dev_tenant_slug: config.dev_tenant_slug.clone(),
            trust_edge_headers: config.trust_edge_headers,
        }
    }

    #[must_use]
    pub fn platform_root(&self) -> &str {
        &self.platform_root
    }

    /// Resolve a request to exactly one tenant.
    #[must_use]
    pub fn resolve(
        &self,
        request_host: &str,
        signals: &ResolutionSignals,
        registry: &dyn TenantRegistry,
    ) -> Resolution {
        let trusted = self.trust_edge_headers;
        let raw_host = signals
            .tenant_domain
            .as_deref()
            .filter(|_| trusted)
            .unwrap_or(request_host);
        let host = normalise_host(raw_host);

        let found = |tenant: Arc<Tenant>, source| Resolution {
            tenant,
            source,
            scope: RequestScope::Storefront,
            host: host.clone(),
        };

        if host.starts_with("admin.") {
            return Resolution {
                tenant: registry.default_tenant(),
                source: ResolutionSource::AdminHost,
                scope: RequestScope::PlatformAdmin,
                host: host.clone(),
            };
        }

        if let Some(tenant) = self
            .dev_tenant_slug
            .as_deref()
            .and_then(|slug| registry.find_by_slug(slug))
        {
            return found(tenant, ResolutionSource::DevOverride);
        }

        if trusted {
            if let Some(tenant) = signals
                .tenant_slug
                .as_deref()
                .and_then(|slug| registry.find_by_slug(slug.trim()))
            {
                return found(tenant, ResolutionSource::EdgeSlug);
            }
            if let Some(tenant) = signals
                .custom_domain
                .as_deref()
                .and_then(|d| match_custom_domain(&normalise_host(d), registry))
            {
                return found(tenant, ResolutionSource::CustomDomainSignal);
            }
            if let Some(tenant) = signals
                .subdomain
                .as_deref()
                .map(normalise_host)
                .filter(|s| !is_reserved(s))
                .and_then(|s| registry.find_by_subdomain(&s))
            {
                return found(tenant, ResolutionSource::SubdomainSignal);
            }
        }

        if let Some(label) = self.platform_subdomain(&host) {
            if let Some(tenant) = registry.find_by_subdomain(label) {
                return found(tenant, ResolutionSource::HostSubdomain);
            }
        } else if !self.is_platform_host(&host)
            && let Some(tenant) = match_custom_domain(&host, registry)
        {
            return found(tenant, ResolutionSource::HostCustomDomain);
        }

        found(registry.default_tenant(), ResolutionSource::Default)
    }

    /// The non-reserved tenant label of a `<label>.<platform root>` host.
    fn platform_subdomain<'h>(&self, host: &'h str) -> Option<&'h str> {
        host.strip_suffix(self.platform_root.as_str())
            .and_then(|prefix| prefix.strip_suffix('.'))
            .filter(|label| !label.is_empty() && !is_reserved(label))
    }

    /// Hosts that always mean "the platform itself".
    fn is_platform_host(&self, host: &str) -> bool {
        host.is_empty()
            || host == "localhost"
            || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
            || host == self.platform_root
            || host
                .strip_suffix(self.platform_root.as_str())
                .and_then(|prefix| prefix.strip_suffix('.'))
                .is_some_and(is_reserved)
    }
}

fn is_reserved(label: &str) -> bool {
    RESERVED_SUBDOMAINS.contains(&label)
}

/// Try the exact domain, then the same domain with `www.` toggled.
fn match_custom_domain(host: &str, registry: &dyn TenantRegistry) -> Option<Arc<Tenant>> {
    if host.is_empty() {
        return None;
    }
    registry.find_by_custom_domain(host).or_else(|| {
        let toggled = host
            .strip_prefix("www.")
            .map_or_else(|| format!("www.{host}"), str::to_owned);
        registry.find_by_custom_domain(&toggled)
    })
}

/// Lowercase, drop the port and any trailing dot.
///
/// ```
/// use paintstore_storefront::tenant::normalise_host;
///
/// assert_eq!(normalise_host("Pinteya.Example.COM:8443"), "pinteya.example.com");
/// assert_eq!(normalise_host("[::1]:3000"), "::1");
/// assert_eq!(normalise_host("www.pinteya.com."), "www.pinteya.com");
/// ```
#[must_use]
pub fn normalise_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();
    let without_port = if let Some(bracketed) = host.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or_default()
    } else {
        host.as_str()
    };
    without_port.trim_end_matches('.').to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paintstore_core::TenantId;

    use super::*;
    use crate::tenant::registry::TenantDirectory;

    fn directory() -> TenantDirectory {
        TenantDirectory::build(
            vec![
                Tenant::new(TenantId::generate(), "pinteya", "Pinteya")
                    .with_subdomain("pinteya")
                    .with_custom_domain("www.pinteya.com")
                    .with_alias("www.pinteya.com.ar"),
                Tenant::new(TenantId::generate(), "pintemas", "Pintemas")
                    .with_subdomain("pintemas")
                    .with_custom_domain("pintemas.com"),
                Tenant::new(TenantId::generate(), "default", "Platform").with_subdomain("default"),
            ],
            "default",
        )
    }

    fn resolver(trust: bool) -> TenantResolver {
        TenantResolver::new(&TenancyConfig {
            platform_root: "platform.com".to_owned(),
            default_slug: "default".to_owned(),
            trust_edge_headers: trust,
            ..TenancyConfig::default()
        })
    }

    fn slug(resolver: &TenantResolver, host: &str) -> String {
        resolver
            .resolve(host, &ResolutionSignals::default(), &directory())
            .tenant
            .slug
            .clone()
    }

    #[test]
    fn test_subdomain_custom_domain_and_unknown() {
        let r = resolver(false);
        assert_eq!(slug(&r, "pinteya.platform.com"), "pinteya");
        assert_eq!(slug(&r, "www.pinteya.com"), "pinteya");
        assert_eq!(slug(&r, "unknown.platform.com"), "default");
    }

    #[test]
    fn test_platform_hosts_fall_back_to_default() {
        let r = resolver(false);
        for host in [
            "platform.com",
            "www.platform.com",
            "api.platform.com",
            "localhost:3000",
            "127.0.0.1",
            "[::1]:8080",
            "",
            "totally-unrelated.org",
        ] {
            let res = r.resolve(host, &ResolutionSignals::default(), &directory());
            assert_eq!(res.tenant.slug, "default", "host {host}");
            assert_eq!(res.source, ResolutionSource::Default, "host {host}");
            assert_eq!(res.scope, RequestScope::Storefront, "host {host}");
        }
    }

    #[test]
    fn test_admin_host_sets_platform_scope() {
        let res = resolver(false).resolve(
            "admin.platform.com",
            &ResolutionSignals::default(),
            &directory(),
        );
        assert_eq!(res.tenant.slug, "default");
        assert_eq!(res.scope, RequestScope::PlatformAdmin);
        assert_eq!(res.source, ResolutionSource::AdminHost);
    }

    #[test]
    fn test_custom_domain_www_toggle_and_alias() {
        let r = resolver(false);
        assert_eq!(slug(&r, "pinteya.com"), "pinteya");
        assert_eq!(slug(&r, "www.pintemas.com"), "pintemas");
        assert_eq!(slug(&r, "WWW.PINTEYA.COM.AR:443"), "pinteya");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let r = resolver(true);
        let dir = directory();
        let signals = ResolutionSignals {
            subdomain: Some("pintemas".into()),
            ..ResolutionSignals::default()
        };
        let first = r.resolve("pinteya.platform.com", &signals, &dir);
        let second = r.resolve("pinteya.platform.com", &signals, &dir);
        assert_eq!(first.tenant.id, second.tenant.id);
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn test_signal_priority_when_trusted() {
        let r = resolver(true);
        let dir = directory();

        let both = ResolutionSignals {
            custom_domain: Some("pintemas.com".into()),
            subdomain: Some("pinteya".into()),
            ..ResolutionSignals::default()
        };
        let res = r.resolve("unknown.platform.com", &both, &dir);
        assert_eq!(res.tenant.slug, "pintemas");
        assert_eq!(res.source, ResolutionSource::CustomDomainSignal);

        let sub = ResolutionSignals {
            subdomain: Some("pinteya".into()),
            ..ResolutionSignals::default()
        };
        let res = r.resolve("pintemas.platform.com", &sub, &dir);
        assert_eq!(res.tenant.slug, "pinteya");
        assert_eq!(res.source, ResolutionSource::SubdomainSignal);

        let slug_signal = ResolutionSignals {
            tenant_slug: Some("pintemas".into()),
            custom_domain: Some("www.pinteya.com".into()),
            ..ResolutionSignals::default()
        };
        let res = r.resolve("pinteya.platform.com", &slug_signal, &dir);
        assert_eq!(res.source, ResolutionSource::EdgeSlug);
        assert_eq!(res.tenant.slug, "pintemas");
    }

    #[test]
    fn test_untrusted_signals_are_ignored() {
        let r = resolver(false);
        let forged = ResolutionSignals {
            tenant_slug: Some("pintemas".into()),
            tenant_domain: Some("pintemas.com".into()),
            subdomain: Some("pintemas".into()),
            custom_domain: Some("pintemas.com".into()),
        };
        let res = r.resolve("pinteya.platform.com", &forged, &directory());
        assert_eq!(res.tenant.slug, "pinteya");
        assert_eq!(res.source, ResolutionSource::HostSubdomain);
    }

    #[test]
    fn test_edge_domain_replaces_host() {
        let signals = ResolutionSignals {
            tenant_domain: Some("pintemas.com".into()),
            ..ResolutionSignals::default()
        };
        let res = resolver(true).resolve("10.0.0.7:8080", &signals, &directory());
        assert_eq!(res.tenant.slug, "pintemas");
        assert_eq!(res.host, "pintemas.com");
    }

    #[test]
    fn test_reserved_subdomain_signal_is_ignored() {
        let signals = ResolutionSignals {
            subdomain: Some("www".into()),
            ..ResolutionSignals::default()
        };
        let res = resolver(true).resolve("pinteya.platform.com", &signals, &directory());
        assert_eq!(res.source, ResolutionSource::HostSubdomain);
    }

    #[test]
    fn test_dev_override_wins_and_unknown_slug_falls_through() {
        let mut config = TenancyConfig {
            platform_root: "platform.com".to_owned(),
            default_slug: "default".to_owned(),
            dev_tenant_slug: Some("pintemas".to_owned()),
            ..TenancyConfig::default()
        };
        let dir = directory();
        let res = TenantResolver::new(&config).resolve(
            "pinteya.platform.com",
            &ResolutionSignals::default(),
            &dir,
        );
        assert_eq!(res.tenant.slug, "pintemas");
        assert_eq!(res.source, ResolutionSource::DevOverride);

        config.dev_tenant_slug = Some("ghost".to_owned());
        let res = TenantResolver::new(&config).resolve(
            "pinteya.platform.com",
            &ResolutionSignals::default(),
            &dir,
        );
        assert_eq!(res.tenant.slug, "pinteya");
    }

    #[test]
    fn test_normalise_host() {
        assert_eq!(normalise_host(" Pinteya.Platform.com:3000 "), "pinteya.platform.com");
        assert_eq!(normalise_host("::1"), "::1");
        assert_eq!(normalise_host("[::1]"), "::1");
        assert_eq!(normalise_host("shop.example.com."), "shop.example.com");
    }
}
