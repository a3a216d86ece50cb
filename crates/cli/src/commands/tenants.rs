//! Tenant registry inspection.

use paintstore_storefront::config::TenancyConfig;
use paintstore_storefront::tenant::{Tenant, TenantRepository};
use serde_json::json;

use super::{CommandError, connect};

/// Print every active tenant as JSON lines.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CommandError> {
    let client = connect().await?;
    let tenancy = TenancyConfig::from_env()?;

    let mut tenants: Vec<Tenant> = TenantRepository::new(&client).load_active().await?;
    tenants.sort_by(|a, b| a.slug.cmp(&b.slug));

    for tenant in &tenants {
        let line = json!({
            "id": tenant.id,
            "slug": tenant.slug,
            "name": tenant.name,
            "base_url": tenant.base_url(&tenancy.platform_root),
            "default": tenant.slug == tenancy.default_slug,
        });
        println!("{}", serde_json::to_string(&line)?);
    }
    tracing::info!(count = tenants.len(), "active tenants listed");
    Ok(())
}
