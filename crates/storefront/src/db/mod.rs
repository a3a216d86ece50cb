//! Persistence client for the shared storefront database.
//!
//! # Database: `storefront` schema
//!
//! All tenants share the same tables. Tenant-owned tables carry a `tenant_id`
//! column; platform tables do not:
//!
//! ## Platform tables
//!
//! - `tenants` - Tenant registry (slug, domains, theme, analytics IDs, secrets)
//! - `super_admins` - Tenant-independent super-admin flag per principal
//! - `products` - Canonical, tenant-agnostic product rows
//! - `shared_stock_pools` - Stock quantities shared across tenants
//!
//! ## Tenant-owned tables
//!
//! - `tenant_products` - Per-tenant price/stock/visibility for a product
//! - `orders`, `cart_items`, `categories`, `coupons`, `promotions`
//! - `analytics_events`, `user_profiles`, `tenant_user_roles`
//! - `shared_stock_pool_members` - Pools a tenant may link associations to
//! - `admin_audit_log` - Admin mutations and refused admin requests
//!
//! # Access
//!
//! The [`QueryClient`] trait is the generic query interface. Application code
//! never calls it directly for tenant-owned tables; it goes through the
//! access scoping engine in [`crate::scope`], which adds the tenant predicate.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p paintstore-cli -- migrate
//! ```

mod memory;
mod postgres;
mod query;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use memory::MemoryQueryClient;
pub use postgres::PgQueryClient;
pub use query::{
    Adjustment, BatchOutcome, Collection, Direction, Predicate, QueryClient, QueryError,
    QueryOptions, Row, Write, WriteResult,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
