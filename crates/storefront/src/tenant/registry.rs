//! Tenant registry: lookup of tenant records by domain, slug or id.
//!
//! The registry is read-heavy and rarely mutated, so lookups run against an
//! immutable [`TenantDirectory`] snapshot. [`CachedTenantDirectory`] keeps the
//! latest snapshot in a `moka` cache and reloads it after the TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use paintstore_core::TenantId;

use super::model::Tenant;
use crate::db::{Collection, Predicate, QueryClient, QueryError, QueryOptions};

/// Errors loading tenant records.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("tenant row is malformed: {0}")]
    DataCorruption(String),
}

/// Lookup interface over tenant records.
///
/// Finders only ever return active tenants.
pub trait TenantRegistry: Send + Sync {
    fn find_by_subdomain(&self, subdomain: &str) -> Option<Arc<Tenant>>;
    fn find_by_custom_domain(&self, domain: &str) -> Option<Arc<Tenant>>;
    fn find_by_id(&self, id: TenantId) -> Option<Arc<Tenant>>;
    fn find_by_slug(&self, slug: &str) -> Option<Arc<Tenant>>;
    /// The tenant served when nothing else matches. Always available.
    fn default_tenant(&self) -> Arc<Tenant>;
}

/// Immutable, indexed snapshot of the active tenants.
#[derive(Debug)]
pub struct TenantDirectory {
    by_id: HashMap<TenantId, Arc<Tenant>>,
    by_slug: HashMap<String, Arc<Tenant>>,
    by_subdomain: HashMap<String, Arc<Tenant>>,
    by_domain: HashMap<String, Arc<Tenant>>,
    default: Arc<Tenant>,
}

impl TenantDirectory {
    /// Index `tenants`, dropping inactive ones.
    ///
    /// If no active tenant has `default_slug`, a built-in default is
    /// fabricated so resolution can still never fail.
    #[must_use]
    pub fn build(tenants: Vec<Tenant>, default_slug: &str) -> Self {
        let mut by_id = HashMap::new();
        let mut by_slug = HashMap::new();
        let mut by_subdomain = HashMap::new();
        let mut by_domain = HashMap::new();

        for tenant in tenants.into_iter().filter(|t| t.is_active) {
            let tenant = Arc::new(tenant);

            if by_slug.contains_key(&tenant.slug) {
                warn!(slug = %tenant.slug, "Duplicate tenant slug ignored");
                continue;
            }
            by_id.insert(tenant.id, Arc::clone(&tenant));
            by_slug.insert(tenant.slug.clone(), Arc::clone(&tenant));

            if let Some(subdomain) = &tenant.subdomain {
                by_subdomain
                    .entry(subdomain.clone())
                    .or_insert_with(|| Arc::clone(&tenant));
            }
            for domain in tenant.custom_domains() {
                if by_domain.contains_key(domain) {
                    warn!(domain, slug = %tenant.slug, "Custom domain already claimed");
                    continue;
                }
                by_domain.insert(domain.to_owned(), Arc::clone(&tenant));
            }
        }

        let default = by_slug.get(default_slug).cloned().unwrap_or_else(|| {
            error!(
                default_slug,
                "Default tenant missing from registry, serving built-in default"
            );
            Arc::new(Tenant::builtin_default(default_slug))
        });

        Self {
            by_id,
            by_slug,
            by_subdomain,
            by_domain,
            default,
        }
    }

    /// Active tenants sorted by slug.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Tenant>> {
        let mut tenants: Vec<_> = self.by_id.values().cloned().collect();
        tenants.sort_by(|a, b| a.slug.cmp(&b.slug));
        tenants
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl TenantRegistry for TenantDirectory {
    fn find_by_subdomain(&self, subdomain: &str) -> Option<Arc<Tenant>> {
        self.by_subdomain.get(subdomain).cloned()
    }

    fn find_by_custom_domain(&self, domain: &str) -> Option<Arc<Tenant>> {
        self.by_domain.get(domain).cloned()
    }

    fn find_by_id(&self, id: TenantId) -> Option<Arc<Tenant>> {
        self.by_id.get(&id).cloned()
    }

    fn find_by_slug(&self, slug: &str) -> Option<Arc<Tenant>> {
        self.by_slug.get(slug).cloned()
    }

    fn default_tenant(&self) -> Arc<Tenant> {
        Arc::clone(&self.default)
    }
}

/// Loads tenant records through the persistence client.
pub struct TenantRepository<'a> {
    client: &'a dyn QueryClient,
}

impl<'a> TenantRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a dyn QueryClient) -> Self {
        Self { client }
    }

    /// Load every active tenant.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the query fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn load_active(&self) -> Result<Vec<Tenant>, RegistryError> {
        let rows = self
            .client
            .select(
                Collection::Tenants,
                &[Predicate::eq("is_active", true)],
                &QueryOptions::default(),
            )
            .await?;

        rows.into_iter()
            .map(|row| Tenant::from_row(row).map_err(|e| RegistryError::DataCorruption(e.to_string())))
            .collect()
    }

    /// Insert a tenant record.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Query` with `QueryError::Conflict` if the
    /// slug, subdomain or custom domain is already taken.
    #[instrument(skip(self, tenant), fields(slug = %tenant.slug))]
    pub async fn create(&self, tenant: &Tenant) -> Result<(), RegistryError> {
        let row = tenant
            .to_row()
            .map_err(|e| RegistryError::DataCorruption(e.to_string()))?;
        self.client.insert(Collection::Tenants, row).await?;
        Ok(())
    }
}

/// TTL-cached [`TenantDirectory`] loaded from the database.
#[derive(Clone)]
pub struct CachedTenantDirectory {
    client: Arc<dyn QueryClient>,
    default_slug: Arc<str>,
    cache: Cache<(), Arc<TenantDirectory>>,
}

impl CachedTenantDirectory {
    #[must_use]
    pub fn new(client: Arc<dyn QueryClient>, default_slug: &str, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            client,
            default_slug: Arc::from(default_slug),
            cache,
        }
    }

    /// The current directory snapshot.
    ///
    /// A load failure is logged and answered with an uncached directory that
    /// holds only the built-in default, so the next request retries the load.
    pub async fn snapshot(&self) -> Arc<TenantDirectory> {
        let load = async {
            let tenants = TenantRepository::new(self.client.as_ref())
                .load_active()
                .await?;
            debug!(count = tenants.len(), "Loaded tenant directory");
            Ok::<_, RegistryError>(Arc::new(TenantDirectory::build(
                tenants,
                &self.default_slug,
            )))
        };

        match self.cache.try_get_with((), load).await {
            Ok(directory) => directory,
            Err(e) => {
                error!(error = %e, "Failed to load tenant directory");
                Arc::new(TenantDirectory::build(Vec::new(), &self.default_slug))
            }
        }
    }

    /// Drop the cached snapshot so the next lookup reloads.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryQueryClient;

    fn pinteya() -> Tenant {
        Tenant::new(TenantId::generate(), "pinteya", "Pinteya")
            .with_subdomain("pinteya")
            .with_custom_domain("www.pinteya.com")
            .with_alias("www.pinteya.com.ar")
    }

    #[test]
    fn test_directory_indexes_all_keys() {
        let tenant = pinteya();
        let id = tenant.id;
        let dir = TenantDirectory::build(vec![tenant], "pinteya");

        assert_eq!(dir.find_by_subdomain("pinteya").unwrap().id, id);
        assert_eq!(dir.find_by_custom_domain("www.pinteya.com").unwrap().id, id);
        assert_eq!(dir.find_by_custom_domain("www.pinteya.com.ar").unwrap().id, id);
        assert_eq!(dir.find_by_id(id).unwrap().slug, "pinteya");
        assert_eq!(dir.default_tenant().id, id);
    }

    #[test]
    fn test_inactive_tenants_are_invisible() {
        let closed = Tenant::new(TenantId::generate(), "closed", "Closed")
            .with_subdomain("closed")
            .deactivated();
        let closed_id = closed.id;
        let dir = TenantDirectory::build(vec![pinteya(), closed], "pinteya");

        assert!(dir.find_by_subdomain("closed").is_none());
        assert!(dir.find_by_id(closed_id).is_none());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_missing_default_uses_builtin() {
        let dir = TenantDirectory::build(Vec::new(), "pinteya");
        let default = dir.default_tenant();
        assert_eq!(default.id, TenantId::builtin_default());
        assert_eq!(default.slug, "pinteya");
        assert!(dir.is_empty());
    }

    #[test]
    fn test_duplicate_domain_first_wins() {
        let first = pinteya();
        let first_id = first.id;
        let squatter = Tenant::new(TenantId::generate(), "squatter", "Squatter")
            .with_custom_domain("www.pinteya.com");
        let dir = TenantDirectory::build(vec![first, squatter], "pinteya");
        assert_eq!(dir.find_by_custom_domain("www.pinteya.com").unwrap().id, first_id);
    }

    #[tokio::test]
    async fn test_cached_directory_loads_and_invalidates() {
        let client: Arc<dyn QueryClient> = Arc::new(MemoryQueryClient::new());
        TenantRepository::new(client.as_ref())
            .create(&pinteya())
            .await
            .unwrap();

        let cached = CachedTenantDirectory::new(Arc::clone(&client), "pinteya", Duration::from_secs(60));
        assert_eq!(cached.snapshot().await.len(), 1);

        let other = Tenant::new(TenantId::generate(), "pintemas", "Pintemas").with_subdomain("pintemas");
        TenantRepository::new(client.as_ref()).create(&other).await.unwrap();
        assert_eq!(cached.snapshot().await.len(), 1);

        cached.invalidate().await;
        let snapshot = cached.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.find_by_subdomain("pintemas").is_some());
    }
}
