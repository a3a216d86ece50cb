//! Generic query interface over the shared tables.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Errors returned by a [`QueryClient`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A column name failed identifier validation.
    #[error("invalid column identifier: {0}")]
    InvalidIdentifier(String),

    /// A row could not be converted to or from JSON.
    #[error("row serialization failed: {0}")]
    Serialization(String),

    /// The backing store refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Every table the storefront reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tenants,
    SuperAdmins,
    Products,
    SharedStockPools,
    TenantProducts,
    Orders,
    CartItems,
    Categories,
    Coupons,
    Promotions,
    AnalyticsEvents,
    UserProfiles,
    RoleAssignments,
    SharedPoolMembers,
    AdminAuditLog,
}

impl Collection {
    /// Table name inside the `storefront` schema.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Tenants => "tenants",
            Self::SuperAdmins => "super_admins",
            Self::Products => "products",
            Self::SharedStockPools => "shared_stock_pools",
            Self::TenantProducts => "tenant_products",
            Self::Orders => "orders",
            Self::CartItems => "cart_items",
            Self::Categories => "categories",
            Self::Coupons => "coupons",
            Self::Promotions => "promotions",
            Self::AnalyticsEvents => "analytics_events",
            Self::UserProfiles => "user_profiles",
            Self::RoleAssignments => "tenant_user_roles",
            Self::SharedPoolMembers => "shared_stock_pool_members",
            Self::AdminAuditLog => "admin_audit_log",
        }
    }

    /// Whether rows of this table belong to exactly one tenant.
    #[must_use]
    pub const fn is_tenant_owned(self) -> bool {
        !matches!(
            self,
            Self::Tenants | Self::SuperAdmins | Self::Products | Self::SharedStockPools
        )
    }

    /// Column sets that must be unique across the table (besides `id`).
    #[must_use]
    pub const fn unique_keys(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Tenants => &[&["slug"], &["subdomain"], &["custom_domain"]],
            Self::SuperAdmins => &[&["principal_id"]],
            Self::TenantProducts => &[&["tenant_id", "product_id"]],
            Self::RoleAssignments => &[&["tenant_id", "principal_id"]],
            Self::Coupons => &[&["tenant_id", "code"]],
            Self::Categories => &[&["tenant_id", "slug"]],
            Self::UserProfiles => &[&["tenant_id", "principal_id"]],
            Self::SharedPoolMembers => &[&["tenant_id", "pool_id"]],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// An equality predicate on one column.
///
/// Column names are `&'static str` so that only code, never request input,
/// can name a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value` (`column IS NULL` when the value is `null`).
    Eq(&'static str, Value),
    /// `column IN (values)`; an empty list matches nothing.
    In(&'static str, Vec<Value>),
}

impl Predicate {
    /// Build an equality predicate from any serializable value.
    ///
    /// Values that fail to serialize become `null`.
    pub fn eq(column: &'static str, value: impl serde::Serialize) -> Self {
        Self::Eq(column, serde_json::to_value(value).unwrap_or(Value::Null))
    }

    /// Build a membership predicate from serializable values.
    pub fn any_of<T: serde::Serialize>(column: &'static str, values: impl IntoIterator<Item = T>) -> Self {
        Self::In(
            column,
            values
                .into_iter()
                .filter_map(|v| serde_json::to_value(v).ok())
                .collect(),
        )
    }

    /// The column this predicate constrains.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Eq(column, _) | Self::In(column, _) => column,
        }
    }

    /// Whether `row` satisfies this predicate.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, expected) => actual == expected,
            Self::In(_, values) => values.contains(actual),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Ordering and pagination for a select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub order_by: Option<(&'static str, Direction)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryOptions {
    /// Newest rows first.
    #[must_use]
    pub const fn newest_first() -> Self {
        Self {
            order_by: Some(("created_at", Direction::Descending)),
            limit: None,
            offset: None,
        }
    }

    /// Set the page window.
    #[must_use]
    pub const fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Outcome of an atomic counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// The counter was changed; carries the new value.
    Applied(i64),
    /// A row matched but the change would have made the counter negative.
    Insufficient,
    /// No row matched the predicates.
    NoMatch,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert {
        collection: Collection,
        row: Row,
    },
    Delete {
        collection: Collection,
        predicates: Vec<Predicate>,
    },
    /// Counter change that must apply, or the whole batch is abandoned.
    Adjust {
        collection: Collection,
        predicates: Vec<Predicate>,
        column: &'static str,
        delta: i64,
    },
}

impl Write {
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Insert { collection, .. }
            | Self::Delete { collection, .. }
            | Self::Adjust { collection, .. } => *collection,
        }
    }
}

/// What one write of a committed batch did.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    Inserted(Row),
    Deleted(u64),
    Adjusted(i64),
}

/// Outcome of [`QueryClient::apply_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every write applied; one result per write, in order.
    Committed(Vec<WriteResult>),
    /// The adjustment at `index` did not apply. Nothing was written.
    Refused {
        index: usize,
        adjustment: Adjustment,
    },
}

/// Generic per-collection query client.
///
/// Implementations apply predicates verbatim; they know nothing about
/// tenants. Tenant scoping is layered on top by [`crate::scope`].
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Select rows matching every predicate.
    async fn select(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<Row>, QueryError>;

    /// Insert a row and return it as stored.
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, QueryError>;

    /// Set the columns in `patch` on every row matching the predicates.
    /// Returns the number of rows affected.
    async fn update(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<u64, QueryError>;

    /// Delete every row matching the predicates. Returns the number deleted.
    async fn delete(&self, collection: Collection, predicates: &[Predicate])
    -> Result<u64, QueryError>;

    /// Atomically add `delta` to an integer column, refusing to go below zero.
    ///
    /// Concurrent adjustments of the same row are serialized.
    async fn adjust(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        column: &'static str,
        delta: i64,
    ) -> Result<Adjustment, QueryError>;

    /// Apply `writes` in order as one atomic unit.
    ///
    /// Either every write is applied or none is: an error, a refused
    /// adjustment or a dropped future leaves the store unchanged.
    async fn apply_batch(&self, writes: Vec<Write>) -> Result<BatchOutcome, QueryError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), QueryError>;
}
