//! Tenant roles and the super-admin flag.
//!
//! ```bash
//! ps-cli roles grant -t pinteya -p <principal-uuid> -r tenant_admin
//! ps-cli roles revoke -t pinteya -p <principal-uuid>
//! ps-cli super-admin grant -p <principal-uuid>
//! ```

use paintstore_core::{PermissionMatrix, PrincipalId, TenantRole};
use paintstore_storefront::models::RoleGrant;
use paintstore_storefront::scope::TenantScope;
use paintstore_storefront::services::{TenantRoles, grant_super_admin, revoke_super_admin};
use paintstore_storefront::tenant::TenantRepository;

use super::{CommandError, active_tenant, connect};

fn parse_principal(raw: &str) -> Result<PrincipalId, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidArgument(format!("principal id '{raw}' is not a UUID")))
}

/// Grant a tenant role.
///
/// Permissions are given as JSON; a tenant admin always holds every
/// capability regardless.
pub async fn grant(
    tenant: &str,
    principal: &str,
    role: &str,
    permissions: Option<&str>,
) -> Result<(), CommandError> {
    let principal_id = parse_principal(principal)?;
    let role: TenantRole = role
        .parse()
        .map_err(|e| CommandError::InvalidArgument(format!("{e}")))?;
    let permissions: PermissionMatrix = match permissions {
        Some(raw) => serde_json::from_str(raw)?,
        None => PermissionMatrix::none(),
    };

    let client = connect().await?;
    let tenant = active_tenant(&TenantRepository::new(&client), tenant).await?;
    let assignment = TenantRoles::new(&client, TenantScope::for_tenant(&tenant)?)
        .grant(principal_id, &RoleGrant { role, permissions })
        .await?;

    tracing::info!(
        tenant = %tenant.slug,
        %principal_id,
        role = %assignment.role,
        "Tenant role granted"
    );
    Ok(())
}

/// Revoke a tenant role.
pub async fn revoke(tenant: &str, principal: &str) -> Result<(), CommandError> {
    let principal_id = parse_principal(principal)?;
    let client = connect().await?;
    let tenant = active_tenant(&TenantRepository::new(&client), tenant).await?;

    let affected = TenantRoles::new(&client, TenantScope::for_tenant(&tenant)?)
        .revoke(principal_id)
        .await?;
    if affected.any() {
        tracing::info!(tenant = %tenant.slug, %principal_id, "Tenant role revoked");
    } else {
        tracing::warn!(tenant = %tenant.slug, %principal_id, "No role assignment to revoke");
    }
    Ok(())
}

/// Set the super-admin flag.
pub async fn grant_super(principal: &str) -> Result<(), CommandError> {
    let principal_id = parse_principal(principal)?;
    let client = connect().await?;
    if grant_super_admin(&client, principal_id).await? {
        tracing::info!(%principal_id, "Super admin granted");
    } else {
        tracing::info!(%principal_id, "Principal is already a super admin");
    }
    Ok(())
}

/// Clear the super-admin flag.
pub async fn revoke_super(principal: &str) -> Result<(), CommandError> {
    let principal_id = parse_principal(principal)?;
    let client = connect().await?;
    if revoke_super_admin(&client, principal_id).await? {
        tracing::info!(%principal_id, "Super admin revoked");
    } else {
        tracing::warn!(%principal_id, "Principal was not a super admin");
    }
    Ok(())
}
