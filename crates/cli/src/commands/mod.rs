//! Command implementations.

pub mod migrate;
pub mod pools;
pub mod report;
pub mod roles;
pub mod tenants;

use paintstore_storefront::config::{ConfigError, get_database_url};
use paintstore_storefront::db::{PgQueryClient, QueryError, create_pool};
use paintstore_storefront::scope::ScopeError;
use paintstore_storefront::services::RoleError;
use paintstore_storefront::tenant::{RegistryError, Tenant, TenantRepository};
use thiserror::Error;

/// Errors surfaced by any command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Scope(#[from] ScopeError),

    #[error("{0}")]
    Role(#[from] RoleError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`
/// (or `DATABASE_URL`).
pub async fn connect() -> Result<PgQueryClient, CommandError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&database_url).await?;
    Ok(PgQueryClient::new(pool))
}

/// The active tenant with `slug`.
pub async fn active_tenant(
    repository: &TenantRepository<'_>,
    slug: &str,
) -> Result<Tenant, CommandError> {
    repository
        .load_active()
        .await?
        .into_iter()
        .find(|t| t.slug == slug)
        .ok_or_else(|| CommandError::InvalidArgument(format!("no active tenant '{slug}'")))
}
