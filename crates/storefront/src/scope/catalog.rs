//! Tenant catalog read path and shared-pool stock.
//!
//! Storefront prices and stock always come from the tenant's association
//! (or the pool it points at), never from the canonical product.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use paintstore_core::{CategoryId, ProductId, SharedPoolId};

use crate::db::{Adjustment, Collection, Predicate, QueryClient, QueryOptions, Write};
use crate::models::{
    AssociationSettings, PoolMembership, Product, SharedStockPool, StorefrontProduct,
    TenantProduct,
};

use super::{ScopeError, ScopedRepository, TenantScope};

/// Filters for the storefront product listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub featured_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Catalog access for one tenant.
pub struct CatalogRepository<'a> {
    client: &'a dyn QueryClient,
    associations: ScopedRepository<'a, TenantProduct>,
    memberships: ScopedRepository<'a, PoolMembership>,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        Self {
            client,
            associations: ScopedRepository::new(client, scope),
            memberships: ScopedRepository::new(client, scope),
        }
    }

    /// Products visible in this tenant's storefront.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if any lookup fails.
    #[instrument(skip(self), fields(tenant_id = %self.associations.scope().tenant_id()))]
    pub async fn list_visible(
        &self,
        query: &CatalogQuery,
    ) -> Result<Vec<StorefrontProduct>, ScopeError> {
        let mut filters = vec![Predicate::eq("is_visible", true)];
        if let Some(category) = query.category_id {
            filters.push(Predicate::eq("category_id", category));
        }
        if query.featured_only {
            filters.push(Predicate::eq("is_featured", true));
        }
        let options = QueryOptions {
            order_by: Some(("created_at", crate::db::Direction::Descending)),
            limit: query.limit.map(|l| l.clamp(1, 100)),
            offset: query.offset.map(|o| o.max(0)),
        };

        let associations = self.associations.list(&filters, &options).await?;
        self.join(associations).await
    }

    /// One product as this tenant shows it; `None` if not offered or hidden.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if any lookup fails.
    #[instrument(skip(self), fields(tenant_id = %self.associations.scope().tenant_id()))]
    pub async fn get_visible(
        &self,
        product_id: ProductId,
    ) -> Result<Option<StorefrontProduct>, ScopeError> {
        let Some(association) = self.association(product_id).await? else {
            return Ok(None);
        };
        if !association.is_visible {
            return Ok(None);
        }
        Ok(self.join(vec![association]).await?.into_iter().next())
    }

    /// Effective stock of a product for this tenant.
    ///
    /// Associations that reference a shared pool report the pool quantity,
    /// so every tenant sharing the pool sees the same number.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if any lookup fails.
    pub async fn stock(&self, product_id: ProductId) -> Result<Option<i64>, ScopeError> {
        let Some(association) = self.association(product_id).await? else {
            return Ok(None);
        };
        match association.shared_pool_id {
            Some(pool_id) => Ok(self.pools(&[pool_id]).await?.get(&pool_id).map(|p| p.quantity)),
            None => Ok(Some(association.stock)),
        }
    }

    /// Atomically change stock by `delta`; returns the new quantity.
    ///
    /// Pooled associations change the pool record. The write never takes
    /// stock below zero.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::InsufficientStock` if the change would oversell
    /// and `ScopeError::ProductUnavailable` if the tenant does not offer the
    /// product.
    #[instrument(skip(self), fields(tenant_id = %self.associations.scope().tenant_id()))]
    pub async fn adjust_stock(&self, product_id: ProductId, delta: i64) -> Result<i64, ScopeError> {
        let (collection, predicates, column) = self.stock_target(product_id).await?;
        let outcome = self
            .client
            .adjust(collection, &predicates, column, delta)
            .await?;
        stock_outcome(product_id, delta, outcome)
    }

    /// Build the stock change for `product_id` as a write for an atomic
    /// batch. The target (association or shared pool) is resolved now.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::ProductUnavailable` if the tenant does not offer
    /// the product.
    pub async fn stage_stock_adjustment(
        &self,
        product_id: ProductId,
        delta: i64,
    ) -> Result<Write, ScopeError> {
        let (collection, predicates, column) = self.stock_target(product_id).await?;
        Ok(Write::Adjust {
            collection,
            predicates,
            column,
            delta,
        })
    }

    /// Create or replace this tenant's association with a canonical product.
    ///
    /// A shared pool may only be named if the platform made this tenant a
    /// member of it.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::ProductUnavailable` if the product does not exist
    /// and `ScopeError::PoolUnavailable` if the pool is not shared with this
    /// tenant.
    #[instrument(skip(self, settings), fields(tenant_id = %self.associations.scope().tenant_id()))]
    pub async fn upsert_association(
        &self,
        product_id: ProductId,
        settings: &AssociationSettings,
    ) -> Result<TenantProduct, ScopeError> {
        if self.products(&[product_id]).await?.is_empty() {
            return Err(ScopeError::ProductUnavailable(product_id));
        }
        if let Some(pool_id) = settings.shared_pool_id
            && !self.is_pool_member(pool_id).await?
        {
            tracing::warn!(%pool_id, %product_id, "association names a pool not shared with this tenant");
            return Err(ScopeError::PoolUnavailable(pool_id));
        }

        if let Some(existing) = self.association(product_id).await? {
            self.associations.update(existing.id, settings).await?;
        } else {
            let mut payload = serde_json::to_value(settings)?;
            payload["product_id"] = serde_json::to_value(product_id)?;
            self.associations.insert(&payload).await?;
        }

        self.association(product_id)
            .await?
            .ok_or(ScopeError::ProductUnavailable(product_id))
    }

    /// Pools this tenant may link associations to.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if a lookup fails.
    pub async fn member_pools(&self) -> Result<Vec<SharedStockPool>, ScopeError> {
        let ids: Vec<SharedPoolId> = self
            .memberships
            .list(&[], &QueryOptions::default())
            .await?
            .into_iter()
            .map(|m| m.pool_id)
            .collect();
        let mut pools: Vec<SharedStockPool> = self.pools(&ids).await?.into_values().collect();
        pools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pools)
    }

    async fn stock_target(
        &self,
        product_id: ProductId,
    ) -> Result<(Collection, Vec<Predicate>, &'static str), ScopeError> {
        let association = self
            .association(product_id)
            .await?
            .ok_or(ScopeError::ProductUnavailable(product_id))?;

        Ok(match association.shared_pool_id {
            Some(pool_id) => (
                Collection::SharedStockPools,
                vec![Predicate::eq("id", pool_id)],
                "quantity",
            ),
            None => (
                Collection::TenantProducts,
                vec![
                    Predicate::eq("id", association.id),
                    Predicate::eq("tenant_id", self.associations.scope().tenant_id()),
                ],
                "stock",
            ),
        })
    }

    async fn is_pool_member(&self, pool_id: SharedPoolId) -> Result<bool, ScopeError> {
        let options = QueryOptions {
            limit: Some(1),
            ..QueryOptions::default()
        };
        Ok(!self
            .memberships
            .list(&[Predicate::eq("pool_id", pool_id)], &options)
            .await?
            .is_empty())
    }

    async fn association(&self, product_id: ProductId) -> Result<Option<TenantProduct>, ScopeError> {
        let options = QueryOptions {
            limit: Some(1),
            ..QueryOptions::default()
        };
        Ok(self
            .associations
            .list(&[Predicate::eq("product_id", product_id)], &options)
            .await?
            .into_iter()
            .next())
    }

    async fn join(
        &self,
        associations: Vec<TenantProduct>,
    ) -> Result<Vec<StorefrontProduct>, ScopeError> {
        let product_ids: Vec<ProductId> = associations.iter().map(|a| a.product_id).collect();
        let pool_ids: Vec<SharedPoolId> =
            associations.iter().filter_map(|a| a.shared_pool_id).collect();

        let mut products = self.products(&product_ids).await?;
        let pools = self.pools(&pool_ids).await?;

        let mut out = Vec::with_capacity(associations.len());
        for association in associations {
            let Some(product) = products.remove(&association.product_id) else {
                tracing::warn!(product_id = %association.product_id, "association without canonical product");
                continue;
            };
            let stock = match association.shared_pool_id {
                Some(pool_id) => pools.get(&pool_id).map_or(0, |p| p.quantity),
                None => association.stock,
            };
            out.push(StorefrontProduct::from_parts(product, &association, stock));
        }
        Ok(out)
    }

    async fn products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>, ScopeError> {
        let rows = self
            .client
            .select(
                Collection::Products,
                &[Predicate::any_of("id", ids.iter().copied())],
                &QueryOptions::default(),
            )
            .await?;
        rows.into_iter()
            .map(|row| -> Result<_, ScopeError> {
                let product: Product = serde_json::from_value(Value::Object(row))?;
                Ok((product.id, product))
            })
            .collect()
    }

    async fn pools(
        &self,
        ids: &[SharedPoolId],
    ) -> Result<HashMap<SharedPoolId, SharedStockPool>, ScopeError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .client
            .select(
                Collection::SharedStockPools,
                &[Predicate::any_of("id", ids.iter().copied())],
                &QueryOptions::default(),
            )
            .await?;
        rows.into_iter()
            .map(|row| -> Result<_, ScopeError> {
                let pool: SharedStockPool = serde_json::from_value(Value::Object(row))?;
                Ok((pool.id, pool))
            })
            .collect()
    }
}

fn stock_outcome(
    product_id: ProductId,
    delta: i64,
    outcome: Adjustment,
) -> Result<i64, ScopeError> {
    match outcome {
        Adjustment::Applied(quantity) => Ok(quantity),
        Adjustment::Insufficient => {
            tracing::info!(%product_id, delta, "stock change refused");
            Err(ScopeError::InsufficientStock {
                product: product_id,
            })
        }
        Adjustment::NoMatch => {
            tracing::warn!(%product_id, "stock record missing");
            Err(ScopeError::ProductUnavailable(product_id))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use paintstore_core::TenantId;

    use super::*;
    use crate::db::{BatchOutcome, MemoryQueryClient, Row};
    use crate::services::PoolSharing;
    use crate::tenant::Tenant;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn scope_for(slug: &str) -> TenantScope {
        TenantScope::for_tenant(&Tenant::new(TenantId::generate(), slug, slug)).unwrap()
    }

    async fn seed_product(client: &MemoryQueryClient, name: &str) -> ProductId {
        let id = ProductId::generate();
        client
            .insert(
                Collection::Products,
                row(json!({
                    "id": id, "name": name, "slug": name.to_lowercase(),
                    "description": null, "brand": "Sinteplast", "image_url": null,
                    "created_at": Utc::now(),
                })),
            )
            .await
            .unwrap();
        id
    }

    async fn seed_pool(client: &MemoryQueryClient, quantity: i64) -> SharedPoolId {
        let id = SharedPoolId::generate();
        client
            .insert(
                Collection::SharedStockPools,
                row(json!({ "id": id, "name": "depósito central", "quantity": quantity, "created_at": Utc::now() })),
            )
            .await
            .unwrap();
        id
    }

    async fn share(client: &MemoryQueryClient, scope: TenantScope, pool: SharedPoolId) {
        PoolSharing::new(client, scope).share(pool).await.unwrap();
    }

    fn settings(price: i64, stock: i64, pool: Option<SharedPoolId>) -> AssociationSettings {
        AssociationSettings {
            price: Decimal::new(price, 0),
            stock,
            is_visible: true,
            is_featured: false,
            shared_pool_id: pool,
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_price_comes_from_association() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Esmalte").await;
        let one = scope_for("one");
        let two = scope_for("two");

        CatalogRepository::new(&client, one)
            .upsert_association(product, &settings(100, 3, None))
            .await
            .unwrap();
        CatalogRepository::new(&client, two)
            .upsert_association(product, &settings(250, 9, None))
            .await
            .unwrap();

        let seen_by_one = CatalogRepository::new(&client, one)
            .get_visible(product)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen_by_one.price, Decimal::new(100, 0));
        assert_eq!(seen_by_one.stock, 3);

        let listed_by_two = CatalogRepository::new(&client, two)
            .list_visible(&CatalogQuery::default())
            .await
            .unwrap();
        assert_eq!(listed_by_two.len(), 1);
        assert_eq!(listed_by_two[0].price, Decimal::new(250, 0));
    }

    #[tokio::test]
    async fn test_hidden_and_unassociated_products_are_not_visible() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Barniz").await;
        let unlisted = seed_product(&client, "Thinner").await;
        let scope = scope_for("one");
        let catalog = CatalogRepository::new(&client, scope);

        let mut hidden = settings(10, 1, None);
        hidden.is_visible = false;
        catalog.upsert_association(product, &hidden).await.unwrap();

        assert!(catalog.get_visible(product).await.unwrap().is_none());
        assert!(catalog.get_visible(unlisted).await.unwrap().is_none());
        assert!(catalog
            .list_visible(&CatalogQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_pooled_stock_is_shared_between_tenants() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Latex").await;
        let pool = seed_pool(&client, 10).await;
        let one = scope_for("one");
        let two = scope_for("two");

        for scope in [one, two] {
            share(&client, scope, pool).await;
            CatalogRepository::new(&client, scope)
                .upsert_association(product, &settings(100, 999, Some(pool)))
                .await
                .unwrap();
        }

        let remaining = CatalogRepository::new(&client, one)
            .adjust_stock(product, -4)
            .await
            .unwrap();
        assert_eq!(remaining, 6);

        let via_one = CatalogRepository::new(&client, one).stock(product).await.unwrap();
        let via_two = CatalogRepository::new(&client, two).stock(product).await.unwrap();
        assert_eq!(via_one, Some(6));
        assert_eq!(via_one, via_two);
    }

    #[tokio::test]
    async fn test_oversell_is_refused() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Rodillo").await;
        let scope = scope_for("one");
        let catalog = CatalogRepository::new(&client, scope);
        catalog
            .upsert_association(product, &settings(50, 2, None))
            .await
            .unwrap();

        assert!(matches!(
            catalog.adjust_stock(product, -3).await,
            Err(ScopeError::InsufficientStock { .. })
        ));
        assert_eq!(catalog.stock(product).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_pool_purchases_never_oversell() {
        let client = Arc::new(MemoryQueryClient::new());
        let product = seed_product(&client, "Pincel").await;
        let pool = seed_pool(&client, 5).await;
        let scopes = [scope_for("one"), scope_for("two")];
        for scope in scopes {
            share(&client, scope, pool).await;
            CatalogRepository::new(client.as_ref(), scope)
                .upsert_association(product, &settings(10, 0, Some(pool)))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..12 {
            let client = Arc::clone(&client);
            let scope = scopes[i % 2];
            handles.push(tokio::spawn(async move {
                CatalogRepository::new(client.as_ref(), scope)
                    .adjust_stock(product, -1)
                    .await
                    .is_ok()
            }));
        }
        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap() {
                sold += 1;
            }
        }

        assert_eq!(sold, 5);
        let left = CatalogRepository::new(client.as_ref(), scopes[0])
            .stock(product)
            .await
            .unwrap();
        assert_eq!(left, Some(0));
    }

    #[tokio::test]
    async fn test_unknown_product_cannot_be_associated() {
        let client = MemoryQueryClient::new();
        let catalog = CatalogRepository::new(&client, scope_for("one"));
        assert!(matches!(
            catalog
                .upsert_association(ProductId::generate(), &settings(1, 1, None))
                .await,
            Err(ScopeError::ProductUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_pool_of_another_tenant_cannot_be_linked() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Sellador").await;
        let pool = seed_pool(&client, 40).await;
        let owner = scope_for("one");
        let intruder = scope_for("two");
        share(&client, owner, pool).await;

        let result = CatalogRepository::new(&client, intruder)
            .upsert_association(product, &settings(10, 0, Some(pool)))
            .await;
        assert!(matches!(result, Err(ScopeError::PoolUnavailable(id)) if id == pool));
        assert!(client.snapshot(Collection::TenantProducts).await.is_empty());

        let listed = CatalogRepository::new(&client, owner).member_pools().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(CatalogRepository::new(&client, intruder)
            .member_pools()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_staged_adjustment_targets_the_pool() {
        let client = MemoryQueryClient::new();
        let product = seed_product(&client, "Enduido").await;
        let pool = seed_pool(&client, 6).await;
        let scope = scope_for("one");
        share(&client, scope, pool).await;
        let catalog = CatalogRepository::new(&client, scope);
        catalog
            .upsert_association(product, &settings(10, 99, Some(pool)))
            .await
            .unwrap();

        let write = catalog.stage_stock_adjustment(product, -2).await.unwrap();
        assert_eq!(write.collection(), Collection::SharedStockPools);
        assert!(matches!(
            client.apply_batch(vec![write]).await.unwrap(),
            BatchOutcome::Committed(_)
        ));
        assert_eq!(catalog.stock(product).await.unwrap(), Some(4));
    }
}
