//! Catalog types.
//!
//! A [`Product`] is canonical and tenant-agnostic. Whether and how a tenant
//! sells it is decided by its [`TenantProduct`] association: price, stock,
//! visibility and an optional shared stock pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstore_core::{
    CategoryId, PoolMembershipId, ProductId, SharedPoolId, TenantId, TenantProductId,
};

use crate::db::Collection;
use crate::scope::TenantOwned;

/// Canonical product row (platform table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stock shared by several tenants' associations (platform table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedStockPool {
    pub id: SharedPoolId,
    pub name: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A tenant's permission to draw on a shared pool.
///
/// Provisioned by platform operators; a tenant can only link associations
/// to pools it is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMembership {
    pub id: PoolMembershipId,
    pub tenant_id: TenantId,
    pub pool_id: SharedPoolId,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for PoolMembership {
    const COLLECTION: Collection = Collection::SharedPoolMembers;
    type Id = PoolMembershipId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// A tenant's offer of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProduct {
    pub id: TenantProductId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub price: Decimal,
    /// Ignored while `shared_pool_id` is set.
    pub stock: i64,
    pub is_visible: bool,
    pub is_featured: bool,
    pub shared_pool_id: Option<SharedPoolId>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for TenantProduct {
    const COLLECTION: Collection = Collection::TenantProducts;
    type Id = TenantProductId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Settings a tenant admin controls on an association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSettings {
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub shared_pool_id: Option<SharedPoolId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

const fn default_true() -> bool {
    true
}

/// A product as one tenant's storefront shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorefrontProduct {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub is_featured: bool,
    pub category_id: Option<CategoryId>,
    pub shared_pool_id: Option<SharedPoolId>,
}

impl StorefrontProduct {
    /// Join a canonical product with a tenant's association and effective stock.
    #[must_use]
    pub fn from_parts(product: Product, association: &TenantProduct, stock: i64) -> Self {
        Self {
            product_id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            brand: product.brand,
            image_url: product.image_url,
            price: association.price,
            stock,
            is_featured: association.is_featured,
            category_id: association.category_id,
            shared_pool_id: association.shared_pool_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for Category {
    const COLLECTION: Collection = Collection::Categories;
    type Id = CategoryId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
