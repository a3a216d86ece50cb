//! Shared stock pools and the tenants allowed to draw on them.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use paintstore_core::SharedPoolId;

use crate::db::{Collection, Predicate, QueryClient, QueryError, QueryOptions, Row};
use crate::models::{PoolMembership, SharedStockPool, TenantProduct};
use crate::scope::{Affected, ScopeError, ScopedRepository, TenantScope};

#[derive(Debug, Serialize)]
struct MembershipWrite {
    pool_id: SharedPoolId,
}

/// Create a pool holding `quantity` units (platform table).
///
/// # Errors
///
/// Returns `QueryError` if the insert fails.
#[instrument(skip(client))]
pub async fn create_shared_pool(
    client: &dyn QueryClient,
    name: &str,
    quantity: i64,
) -> Result<SharedStockPool, QueryError> {
    let row: Row = match json!({
        "id": SharedPoolId::generate(),
        "name": name,
        "quantity": quantity.max(0),
        "created_at": Utc::now(),
    }) {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    };
    let stored = client.insert(Collection::SharedStockPools, row).await?;
    serde_json::from_value(serde_json::Value::Object(stored))
        .map_err(|e| QueryError::Serialization(e.to_string()))
}

/// Pool memberships of one tenant.
pub struct PoolSharing<'a> {
    client: &'a dyn QueryClient,
    memberships: ScopedRepository<'a, PoolMembership>,
    associations: ScopedRepository<'a, TenantProduct>,
}

impl<'a> PoolSharing<'a> {
    #[must_use]
    pub fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        Self {
            client,
            memberships: ScopedRepository::new(client, scope),
            associations: ScopedRepository::new(client, scope),
        }
    }

    /// Let this tenant link associations to `pool_id`. Sharing twice
    /// returns the existing membership.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::PoolUnavailable` if the pool does not exist.
    #[instrument(skip(self), fields(tenant_id = %self.memberships.scope().tenant_id()))]
    pub async fn share(&self, pool_id: SharedPoolId) -> Result<PoolMembership, ScopeError> {
        let pool = self
            .client
            .select(
                Collection::SharedStockPools,
                &[Predicate::eq("id", pool_id)],
                &QueryOptions::default(),
            )
            .await?;
        if pool.is_empty() {
            return Err(ScopeError::PoolUnavailable(pool_id));
        }

        if let Some(existing) = self.membership(pool_id).await? {
            return Ok(existing);
        }
        match self.memberships.insert(&MembershipWrite { pool_id }).await {
            Ok(membership) => Ok(membership),
            Err(ScopeError::Query(QueryError::Conflict(_))) => self
                .membership(pool_id)
                .await?
                .ok_or(ScopeError::PoolUnavailable(pool_id)),
            Err(e) => Err(e),
        }
    }

    /// Withdraw `pool_id` from this tenant. Associations linked to it fall
    /// back to their own stock.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if a write fails.
    #[instrument(skip(self), fields(tenant_id = %self.memberships.scope().tenant_id()))]
    pub async fn unshare(&self, pool_id: SharedPoolId) -> Result<Affected, ScopeError> {
        let unlinked = self
            .associations
            .update_where(
                &[Predicate::eq("shared_pool_id", pool_id)],
                &json!({ "shared_pool_id": null }),
            )
            .await?;
        if unlinked.any() {
            tracing::info!(%pool_id, unlinked = unlinked.0, "associations unlinked from pool");
        }
        self.memberships
            .delete_where(&[Predicate::eq("pool_id", pool_id)])
            .await
    }

    async fn membership(&self, pool_id: SharedPoolId) -> Result<Option<PoolMembership>, ScopeError> {
        Ok(self
            .memberships
            .list(&[Predicate::eq("pool_id", pool_id)], &QueryOptions::default())
            .await?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use paintstore_core::{ProductId, TenantId};

    use super::*;
    use crate::db::MemoryQueryClient;
    use crate::models::AssociationSettings;
    use crate::scope::CatalogRepository;
    use crate::tenant::Tenant;

    fn scope_for(slug: &str) -> TenantScope {
        TenantScope::for_tenant(&Tenant::new(TenantId::generate(), slug, slug)).unwrap()
    }

    async fn seed_product(client: &MemoryQueryClient) -> ProductId {
        let id = ProductId::generate();
        let row = match json!({
            "id": id, "name": "Látex interior", "slug": format!("latex-{id}"),
            "description": null, "brand": null, "image_url": null, "created_at": Utc::now(),
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        client.insert(Collection::Products, row).await.unwrap();
        id
    }

    fn pooled(pool: SharedPoolId) -> AssociationSettings {
        AssociationSettings {
            price: Decimal::new(700, 0),
            stock: 0,
            is_visible: true,
            is_featured: false,
            shared_pool_id: Some(pool),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_sharing_is_idempotent() {
        let client = MemoryQueryClient::new();
        let pool = create_shared_pool(&client, "depósito norte", 8).await.unwrap();
        let sharing = PoolSharing::new(&client, scope_for("one"));

        let first = sharing.share(pool.id).await.unwrap();
        let second = sharing.share(pool.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(client.snapshot(Collection::SharedPoolMembers).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_pool_cannot_be_shared() {
        let client = MemoryQueryClient::new();
        let result = PoolSharing::new(&client, scope_for("one"))
            .share(SharedPoolId::generate())
            .await;
        assert!(matches!(result, Err(ScopeError::PoolUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unshared_pool_unlinks_associations() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client).await;
        let pool = create_shared_pool(&client, "depósito sur", 5).await.unwrap();
        let scope = scope_for("one");
        let sharing = PoolSharing::new(&client, scope);
        let catalog = CatalogRepository::new(&client, scope);

        sharing.share(pool.id).await.unwrap();
        catalog.upsert_association(product, &pooled(pool.id)).await.unwrap();
        assert_eq!(catalog.stock(product).await.unwrap(), Some(5));

        assert!(sharing.unshare(pool.id).await.unwrap().any());
        assert_eq!(catalog.stock(product).await.unwrap(), Some(0));
        assert!(matches!(
            catalog.upsert_association(product, &pooled(pool.id)).await,
            Err(ScopeError::PoolUnavailable(id)) if id == pool.id
        ));
    }
}
