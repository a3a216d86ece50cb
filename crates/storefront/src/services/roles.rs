//! Tenant role management and the super-admin flag.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use paintstore_core::{PermissionMatrix, PrincipalId, TenantRole};

use crate::db::{Collection, Predicate, QueryClient, QueryError, QueryOptions, Row};
use crate::models::{RoleAssignment, RoleGrant};
use crate::scope::{Affected, ScopeError, ScopedRepository, TenantScope};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("role {0} cannot be assigned per tenant")]
    NotAssignable(TenantRole),

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

#[derive(Debug, Serialize)]
struct AssignmentWrite {
    principal_id: PrincipalId,
    role: TenantRole,
    permissions: PermissionMatrix,
    is_active: bool,
}

/// Role assignments of one tenant.
pub struct TenantRoles<'a> {
    assignments: ScopedRepository<'a, RoleAssignment>,
}

impl<'a> TenantRoles<'a> {
    #[must_use]
    pub fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        Self {
            assignments: ScopedRepository::new(client, scope),
        }
    }

    /// Give `principal_id` a role, replacing any existing assignment.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::NotAssignable` for roles that are not per-tenant
    /// and `RoleError::Scope` if the write fails.
    #[instrument(skip(self, grant), fields(role = %grant.role))]
    pub async fn grant(
        &self,
        principal_id: PrincipalId,
        grant: &RoleGrant,
    ) -> Result<RoleAssignment, RoleError> {
        if !grant.role.is_assignable() {
            return Err(RoleError::NotAssignable(grant.role));
        }
        let write = AssignmentWrite {
            principal_id,
            role: grant.role,
            permissions: grant.effective_permissions(),
            is_active: true,
        };
        let filter = [Predicate::eq("principal_id", principal_id)];

        if self.assignments.update_where(&filter, &write).await?.any() {
            let updated = self
                .assignments
                .list(&filter, &QueryOptions::default())
                .await?
                .into_iter()
                .next();
            if let Some(assignment) = updated {
                return Ok(assignment);
            }
        }
        Ok(self.assignments.insert(&write).await?)
    }

    /// Remove `principal_id`'s assignment.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the delete fails.
    #[instrument(skip(self))]
    pub async fn revoke(&self, principal_id: PrincipalId) -> Result<Affected, ScopeError> {
        self.assignments
            .delete_where(&[Predicate::eq("principal_id", principal_id)])
            .await
    }
}

/// Set the super-admin flag. Granting twice is a no-op.
///
/// # Errors
///
/// Returns `QueryError` if the write fails.
#[instrument(skip(client))]
pub async fn grant_super_admin(
    client: &dyn QueryClient,
    principal_id: PrincipalId,
) -> Result<bool, QueryError> {
    let existing = client
        .select(
            Collection::SuperAdmins,
            &[Predicate::eq("principal_id", principal_id)],
            &QueryOptions::default(),
        )
        .await?;
    if !existing.is_empty() {
        return Ok(false);
    }
    let row: Row = match json!({ "principal_id": principal_id, "granted_at": Utc::now() }) {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    };
    match client.insert(Collection::SuperAdmins, row).await {
        Ok(_) => Ok(true),
        Err(QueryError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Clear the super-admin flag.
///
/// # Errors
///
/// Returns `QueryError` if the delete fails.
#[instrument(skip(client))]
pub async fn revoke_super_admin(
    client: &dyn QueryClient,
    principal_id: PrincipalId,
) -> Result<bool, QueryError> {
    let removed = client
        .delete(
            Collection::SuperAdmins,
            &[Predicate::eq("principal_id", principal_id)],
        )
        .await?;
    Ok(removed > 0)
}
