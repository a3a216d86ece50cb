//! Shared stock pools and the tenants allowed to draw on them.
//!
//! ```bash
//! ps-cli pools create --name "Depósito central" --quantity 120
//! ps-cli pools share -t pinteya --pool <pool-uuid>
//! ps-cli pools unshare -t pinteya --pool <pool-uuid>
//! ```

use paintstore_core::SharedPoolId;
use paintstore_storefront::scope::TenantScope;
use paintstore_storefront::services::{PoolSharing, create_shared_pool};
use paintstore_storefront::tenant::TenantRepository;
use serde_json::json;

use super::{CommandError, active_tenant, connect};

fn parse_pool(raw: &str) -> Result<SharedPoolId, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidArgument(format!("pool id '{raw}' is not a UUID")))
}

/// Create a pool and print it as JSON.
#[allow(clippy::print_stdout)]
pub async fn create(name: &str, quantity: i64) -> Result<(), CommandError> {
    if name.trim().is_empty() || quantity < 0 {
        return Err(CommandError::InvalidArgument(
            "a pool needs a name and a non-negative quantity".to_owned(),
        ));
    }
    let client = connect().await?;
    let pool = create_shared_pool(&client, name.trim(), quantity).await?;
    println!(
        "{}",
        serde_json::to_string(&json!({ "id": pool.id, "name": pool.name, "quantity": pool.quantity }))?
    );
    tracing::info!(pool_id = %pool.id, quantity, "Shared pool created");
    Ok(())
}

/// Let a tenant link its associations to a pool.
pub async fn share(tenant: &str, pool: &str) -> Result<(), CommandError> {
    let pool_id = parse_pool(pool)?;
    let client = connect().await?;
    let tenant = active_tenant(&TenantRepository::new(&client), tenant).await?;
    PoolSharing::new(&client, TenantScope::for_tenant(&tenant)?)
        .share(pool_id)
        .await?;
    tracing::info!(tenant = %tenant.slug, %pool_id, "Pool shared");
    Ok(())
}

/// Withdraw a pool from a tenant; its linked associations fall back to their own stock.
pub async fn unshare(tenant: &str, pool: &str) -> Result<(), CommandError> {
    let pool_id = parse_pool(pool)?;
    let client = connect().await?;
    let tenant = active_tenant(&TenantRepository::new(&client), tenant).await?;
    let removed = PoolSharing::new(&client, TenantScope::for_tenant(&tenant)?)
        .unshare(pool_id)
        .await?;
    if removed.any() {
        tracing::info!(tenant = %tenant.slug, %pool_id, "Pool unshared");
    } else {
        tracing::warn!(tenant = %tenant.slug, %pool_id, "Pool was not shared with tenant");
    }
    Ok(())
}
