//! Order placement from a principal's cart.
//!
//! The stock decrements (pool-aware, never below zero), the order insert and
//! the cart clear are applied as one batch. Either all of them land or none
//! do.

use thiserror::Error;
use tracing::instrument;

use paintstore_core::ProductId;

use crate::auth::Principal;
use crate::db::{Adjustment, BatchOutcome, Predicate, QueryClient, QueryOptions, WriteResult};
use crate::models::{CartItem, NewOrder, Order, OrderLine};
use crate::scope::{CatalogRepository, ScopeError, ScopedRepository, TenantScope};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// Checkout for one tenant.
pub struct Checkout<'a> {
    client: &'a dyn QueryClient,
    scope: TenantScope,
}

impl<'a> Checkout<'a> {
    #[must_use]
    pub const fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        Self { client, scope }
    }

    /// Turn the principal's cart into a pending order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy,
    /// `ScopeError::ProductUnavailable` if a line is no longer offered and
    /// `ScopeError::InsufficientStock` if a line cannot be fulfilled.
    #[instrument(skip(self, principal), fields(tenant_id = %self.scope.tenant_id(), principal_id = %principal.id))]
    pub async fn place_order(
        &self,
        principal: &Principal,
        currency: &str,
    ) -> Result<Order, CheckoutError> {
        let cart = ScopedRepository::<CartItem>::new(self.client, self.scope);
        let items = cart
            .list(
                &[Predicate::eq("principal_id", principal.id)],
                &QueryOptions::default(),
            )
            .await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let catalog = CatalogRepository::new(self.client, self.scope);
        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = catalog
                .get_visible(item.product_id)
                .await?
                .ok_or(ScopeError::ProductUnavailable(item.product_id))?;
            lines.push(OrderLine {
                product_id: product.product_id,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        let product_ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let mut writes = Vec::with_capacity(lines.len() + 2);
        for line in &lines {
            writes.push(
                catalog
                    .stage_stock_adjustment(line.product_id, -line.quantity)
                    .await?,
            );
        }
        let orders = ScopedRepository::<Order>::new(self.client, self.scope);
        writes.push(orders.stage_insert(&NewOrder::pending(
            Some(principal.id),
            Some(principal.email.clone()),
            lines,
            currency,
        ))?);
        writes.push(cart.stage_delete_where(&[Predicate::eq("principal_id", principal.id)]));

        let results = match self.client.apply_batch(writes).await.map_err(ScopeError::from)? {
            BatchOutcome::Committed(results) => results,
            BatchOutcome::Refused { index, adjustment } => {
                let product = product_ids.get(index).copied().ok_or_else(|| {
                    ScopeError::DataCorruption(format!("refused write {index} is not a stock line"))
                })?;
                tracing::info!(%product, ?adjustment, "checkout refused");
                return Err(match adjustment {
                    Adjustment::NoMatch => ScopeError::ProductUnavailable(product),
                    _ => ScopeError::InsufficientStock { product },
                }
                .into());
            }
        };

        let mut results = results.into_iter().skip(product_ids.len());
        let Some(WriteResult::Inserted(row)) = results.next() else {
            return Err(ScopeError::DataCorruption("order insert missing from batch".to_owned()).into());
        };
        let cleared = match results.next() {
            Some(WriteResult::Deleted(n)) => n,
            _ => 0,
        };
        let order = orders.decode(row)?;
        tracing::info!(order_id = %order.id, total = %order.total, cleared, "order placed");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use paintstore_core::{Email, PrincipalId, TenantId};

    use super::*;
    use crate::db::{Collection, MemoryQueryClient, QueryError, Row};
    use crate::models::{AssociationSettings, NewCartItem};
    use crate::tenant::Tenant;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn offer(client: &MemoryQueryClient, scope: TenantScope, price: i64, stock: i64) -> ProductId {
        let id = ProductId::generate();
        client
            .insert(
                Collection::Products,
                row(json!({
                    "id": id, "name": "Esmalte sintético", "slug": format!("esmalte-{id}"),
                    "description": null, "brand": null, "image_url": null, "created_at": Utc::now(),
                })),
            )
            .await
            .unwrap();
        CatalogRepository::new(client, scope)
            .upsert_association(
                id,
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
        id
    }

    fn buyer() -> Principal {
        Principal {
            id: PrincipalId::generate(),
            email: Email::parse("cliente@example.com").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_order_decrements_stock_and_clears_cart() {
        let client = MemoryQueryClient::new();
        let scope = TenantScope::for_tenant(&Tenant::new(TenantId::generate(), "one", "One")).unwrap();
        let product = offer(&client, scope, 1200, 5).await;
        let principal = buyer();

        ScopedRepository::<CartItem>::new(&client, scope)
            .insert(&NewCartItem {
                principal_id: principal.id,
                product_id: product,
                quantity: 2,
            })
            .await
            .unwrap();

        let order = Checkout::new(&client, scope)
            .place_order(&principal, "ARS")
            .await
            .unwrap();

        assert_eq!(order.tenant_id, scope.tenant_id());
        assert_eq!(order.total, Decimal::new(2400, 0));
        assert_eq!(
            CatalogRepository::new(&client, scope).stock(product).await.unwrap(),
            Some(3)
        );
        assert!(client.snapshot(Collection::CartItems).await.is_empty());
    }

    async fn fill_cart(client: &MemoryQueryClient, scope: TenantScope, principal: &Principal, lines: &[(ProductId, i64)]) {
        let cart = ScopedRepository::<CartItem>::new(client, scope);
        for &(product_id, quantity) in lines {
            cart.insert(&NewCartItem {
                principal_id: principal.id,
                product_id,
                quantity,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_failed_line_leaves_no_partial_writes() {
        let client = MemoryQueryClient::new();
        let scope = TenantScope::for_tenant(&Tenant::new(TenantId::generate(), "one", "One")).unwrap();
        let plenty = offer(&client, scope, 10, 10).await;
        let scarce = offer(&client, scope, 10, 1).await;
        let principal = buyer();
        fill_cart(&client, scope, &principal, &[(plenty, 3), (scarce, 2)]).await;

        let result = Checkout::new(&client, scope).place_order(&principal, "ARS").await;
        assert!(matches!(
            result,
            Err(CheckoutError::Scope(ScopeError::InsufficientStock { product })) if product == scarce
        ));

        let catalog = CatalogRepository::new(&client, scope);
        assert_eq!(catalog.stock(plenty).await.unwrap(), Some(10));
        assert_eq!(catalog.stock(scarce).await.unwrap(), Some(1));
        assert!(client.snapshot(Collection::Orders).await.is_empty());
        assert_eq!(client.snapshot(Collection::CartItems).await.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_after_order_insert_rolls_back_checkout() {
        let client = MemoryQueryClient::new();
        let scope = TenantScope::for_tenant(&Tenant::new(TenantId::generate(), "one", "One")).unwrap();
        let product = offer(&client, scope, 500, 4).await;
        let principal = buyer();
        fill_cart(&client, scope, &principal, &[(product, 3)]).await;

        // The cart clear runs after the order insert.
        client.fail_writes_to(Collection::CartItems).await;
        let result = Checkout::new(&client, scope).place_order(&principal, "ARS").await;
        assert!(matches!(
            result,
            Err(CheckoutError::Scope(ScopeError::Query(QueryError::Unavailable(_))))
        ));

        assert_eq!(
            CatalogRepository::new(&client, scope).stock(product).await.unwrap(),
            Some(4)
        );
        assert!(client.snapshot(Collection::Orders).await.is_empty());
        assert_eq!(client.snapshot(Collection::CartItems).await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let client = MemoryQueryClient::new();
        let scope = TenantScope::for_tenant(&Tenant::new(TenantId::generate(), "one", "One")).unwrap();
        assert!(matches!(
            Checkout::new(&client, scope).place_order(&buyer(), "ARS").await,
            Err(CheckoutError::EmptyCart)
        ));
    }
}
