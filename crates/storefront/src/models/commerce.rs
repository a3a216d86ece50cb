//! Orders and cart items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstore_core::{CartItemId, Email, OrderId, PrincipalId, ProductId, TenantId};

use crate::db::Collection;
use crate::scope::TenantOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// One purchased product, priced at the moment of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub principal_id: Option<PrincipalId>,
    pub customer_email: Option<Email>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for Order {
    const COLLECTION: Collection = Collection::Orders;
    type Id = OrderId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Insert payload for an order. The tenant is assigned by the scope.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub principal_id: Option<PrincipalId>,
    pub customer_email: Option<Email>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub currency: String,
}

impl NewOrder {
    /// Build a pending order whose total is computed from its lines.
    #[must_use]
    pub fn pending(
        principal_id: Option<PrincipalId>,
        customer_email: Option<Email>,
        lines: Vec<OrderLine>,
        currency: impl Into<String>,
    ) -> Self {
        let total = lines.iter().map(OrderLine::subtotal).sum();
        Self {
            principal_id,
            customer_email,
            status: OrderStatus::Pending,
            lines,
            total,
            currency: currency.into(),
        }
    }
}

/// Admin-side order changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for CartItem {
    const COLLECTION: Collection = Collection::CartItems;
    type Id = CartItemId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem {
    pub principal_id: PrincipalId,
    pub product_id: ProductId,
    pub quantity: i64,
}
