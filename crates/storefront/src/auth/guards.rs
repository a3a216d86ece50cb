//! Authorization guards.
//!
//! # Tenant-admin guard states
//!
//! ```text
//! Unauthenticated ──────────────────────────────────────────▶ (unauthorized)
//! SessionResolved ──super-admin flag──▶ SuperAdmin            (authorized, full matrix)
//!                 ──role lookup───────▶ NoRole                (unauthorized)
//!                                     ▶ RoleFound             (authorized, row matrix)
//! ```
//!
//! Each check moves forward only; no state is re-entered.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use paintstore_core::{
    Capability, Domain, PermissionMatrix, PrincipalId, TenantId, TenantRole,
};

use super::Principal;
use crate::db::{Collection, Predicate, QueryClient, QueryError, QueryOptions};
use crate::models::RoleAssignment;
use crate::scope::{ScopeError, ScopedRepository, TenantScope};
use crate::tenant::Tenant;

/// Authorization failures.
///
/// `Unauthorized` and `PermissionDenied` are told apart only in logs.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("no authenticated principal")]
    Unauthenticated,

    /// No administrative standing in the tenant.
    #[error("principal has no standing in tenant {tenant}")]
    Unauthorized { tenant: String },

    /// Standing, but the permission-matrix field is false.
    #[error("permission denied: {domain}.{capability}")]
    PermissionDenied {
        domain: Domain,
        capability: Capability,
    },

    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl From<QueryError> for AuthzError {
    fn from(err: QueryError) -> Self {
        Self::Scope(ScopeError::Query(err))
    }
}

/// Result of the super-admin guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuperAdminCheck {
    pub is_super_admin: bool,
}

/// Checks the tenant-independent super-admin flag.
pub struct SuperAdminGuard<'a> {
    client: &'a dyn QueryClient,
}

impl<'a> SuperAdminGuard<'a> {
    #[must_use]
    pub const fn new(client: &'a dyn QueryClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `QueryError` if the lookup fails.
    pub async fn check(&self, principal: Option<&Principal>) -> Result<SuperAdminCheck, QueryError> {
        let is_super_admin = match principal {
            Some(principal) => self.is_super_admin(principal.id).await?,
            None => false,
        };
        Ok(SuperAdminCheck { is_super_admin })
    }

    async fn is_super_admin(&self, principal_id: PrincipalId) -> Result<bool, QueryError> {
        let rows = self
            .client
            .select(
                Collection::SuperAdmins,
                &[Predicate::eq("principal_id", principal_id)],
                &QueryOptions {
                    limit: Some(1),
                    ..QueryOptions::default()
                },
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

/// Where a tenant-admin check currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    SessionResolved(PrincipalId),
    SuperAdmin(PrincipalId),
    NoRole(PrincipalId),
    RoleFound {
        principal_id: PrincipalId,
        role: TenantRole,
        permissions: PermissionMatrix,
    },
}

impl GuardState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::SessionResolved(_))
    }

    fn into_check(self, tenant: &Tenant) -> TenantAdminCheck {
        let (is_authorized, principal_id, role, permissions) = match self {
            Self::Unauthenticated => (false, None, TenantRole::Customer, PermissionMatrix::none()),
            Self::SessionResolved(id) | Self::NoRole(id) => {
                (false, Some(id), TenantRole::Customer, PermissionMatrix::none())
            }
            Self::SuperAdmin(id) => (true, Some(id), TenantRole::SuperAdmin, PermissionMatrix::full()),
            Self::RoleFound {
                principal_id,
                role,
                permissions,
            } => (true, Some(principal_id), role, permissions),
        };
        TenantAdminCheck {
            is_authorized,
            principal_id,
            role,
            permissions,
            tenant_id: tenant.id,
            tenant_slug: tenant.slug.clone(),
        }
    }
}

/// Outcome of the tenant-admin guard.
///
/// `is_authorized` means administrative standing in the tenant, not
/// permission for any particular action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantAdminCheck {
    pub is_authorized: bool,
    pub principal_id: Option<PrincipalId>,
    pub role: TenantRole,
    pub permissions: PermissionMatrix,
    pub tenant_id: TenantId,
    pub tenant_slug: String,
}

/// Decides a principal's standing in one tenant.
pub struct TenantAdminGuard<'a> {
    client: &'a dyn QueryClient,
}

impl<'a> TenantAdminGuard<'a> {
    #[must_use]
    pub const fn new(client: &'a dyn QueryClient) -> Self {
        Self { client }
    }

    /// Run the guard for `principal` in `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Scope` if a lookup fails or the tenant is
    /// inactive.
    #[instrument(skip_all, fields(tenant = %tenant.slug))]
    pub async fn check(
        &self,
        principal: Option<&Principal>,
        tenant: &Tenant,
    ) -> Result<TenantAdminCheck, AuthzError> {
        let mut state = principal.map_or(GuardState::Unauthenticated, |p| {
            GuardState::SessionResolved(p.id)
        });
        while !state.is_terminal() {
            state = self.advance(state, tenant).await?;
        }
        tracing::debug!(?state, "tenant admin guard finished");
        Ok(state.into_check(tenant))
    }

    async fn advance(&self, state: GuardState, tenant: &Tenant) -> Result<GuardState, AuthzError> {
        let GuardState::SessionResolved(principal_id) = state else {
            return Ok(state);
        };

        if SuperAdminGuard::new(self.client)
            .is_super_admin(principal_id)
            .await?
        {
            return Ok(GuardState::SuperAdmin(principal_id));
        }

        let scope = TenantScope::for_tenant(tenant)?;
        let assignment = ScopedRepository::<RoleAssignment>::new(self.client, scope)
            .list(
                &[
                    Predicate::eq("principal_id", principal_id),
                    Predicate::eq("is_active", true),
                ],
                &QueryOptions {
                    limit: Some(1),
                    ..QueryOptions::default()
                },
            )
            .await?
            .into_iter()
            .next();

        Ok(match assignment {
            Some(row) if row.role.is_assignable() => GuardState::RoleFound {
                principal_id,
                role: row.role,
                permissions: row.permissions,
            },
            _ => GuardState::NoRole(principal_id),
        })
    }
}

/// An administrator's standing in the request's tenant.
#[derive(Debug, Clone)]
pub struct AdminAccess {
    check: TenantAdminCheck,
    scope: TenantScope,
}

impl AdminAccess {
    /// Accept a guard result with standing.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Unauthenticated` without a principal and
    /// `AuthzError::Unauthorized` without standing.
    pub fn from_check(check: TenantAdminCheck, scope: TenantScope) -> Result<Self, AuthzError> {
        if check.is_authorized {
            return Ok(Self { check, scope });
        }
        let Some(principal_id) = check.principal_id else {
            return Err(AuthzError::Unauthenticated);
        };
        tracing::warn!(
            reason = "unauthorized",
            %principal_id,
            tenant = %check.tenant_slug,
            "admin access denied"
        );
        Err(AuthzError::Unauthorized {
            tenant: check.tenant_slug,
        })
    }

    /// Require one capability in one domain.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::PermissionDenied` if the matrix field is false.
    pub fn require(&self, domain: Domain, capability: Capability) -> Result<(), AuthzError> {
        if self.check.permissions.allows(domain, capability) {
            return Ok(());
        }
        tracing::warn!(
            reason = "permission_denied",
            principal_id = ?self.check.principal_id,
            role = %self.check.role,
            tenant = %self.check.tenant_slug,
            %domain,
            %capability,
            "admin access denied"
        );
        Err(AuthzError::PermissionDenied { domain, capability })
    }

    #[must_use]
    pub const fn check(&self) -> &TenantAdminCheck {
        &self.check
    }

    /// Data scope of the tenant the access was granted in.
    #[must_use]
    pub const fn scope(&self) -> TenantScope {
        self.scope
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::{Value, json};

    use paintstore_core::{CapabilitySet, Email};

    use super::*;
    use crate::db::{MemoryQueryClient, Row};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn principal() -> Principal {
        Principal {
            id: PrincipalId::generate(),
            email: Email::parse("staff@pinteya.com").unwrap(),
        }
    }

    async fn assign(
        client: &MemoryQueryClient,
        tenant: &Tenant,
        principal: &Principal,
        role: TenantRole,
        permissions: PermissionMatrix,
        is_active: bool,
    ) {
        client
            .insert(
                Collection::RoleAssignments,
                row(json!({
                    "id": uuid::Uuid::new_v4(),
                    "tenant_id": tenant.id,
                    "principal_id": principal.id,
                    "role": role,
                    "permissions": permissions,
                    "is_active": is_active,
                    "created_at": Utc::now(),
                })),
            )
            .await
            .unwrap();
    }

    async fn make_super_admin(client: &MemoryQueryClient, principal: &Principal) {
        client
            .insert(
                Collection::SuperAdmins,
                row(json!({ "principal_id": principal.id, "granted_at": Utc::now() })),
            )
            .await
            .unwrap();
    }

    fn tenant(slug: &str) -> Tenant {
        Tenant::new(TenantId::generate(), slug, slug)
    }

    #[tokio::test]
    async fn test_anonymous_is_customer() {
        let client = MemoryQueryClient::new();
        let t1 = tenant("tenant-1");
        let check = TenantAdminGuard::new(&client).check(None, &t1).await.unwrap();
        assert!(!check.is_authorized);
        assert_eq!(check.role, TenantRole::Customer);
        assert!(check.permissions.is_empty());
        assert_eq!(check.tenant_slug, "tenant-1");
    }

    #[tokio::test]
    async fn test_principal_without_assignment_is_customer() {
        let client = MemoryQueryClient::new();
        let t1 = tenant("tenant-1");
        let t2 = tenant("tenant-2");
        let p = principal();
        assign(&client, &t2, &p, TenantRole::TenantAdmin, PermissionMatrix::full(), true).await;

        let check = TenantAdminGuard::new(&client).check(Some(&p), &t1).await.unwrap();
        assert!(!check.is_authorized);
        assert_eq!(check.role, TenantRole::Customer);
        assert_eq!(check.principal_id, Some(p.id));
    }

    #[tokio::test]
    async fn test_inactive_assignment_is_ignored() {
        let client = MemoryQueryClient::new();
        let t1 = tenant("tenant-1");
        let p = principal();
        assign(&client, &t1, &p, TenantRole::TenantStaff, PermissionMatrix::full(), false).await;

        let check = TenantAdminGuard::new(&client).check(Some(&p), &t1).await.unwrap();
        assert!(!check.is_authorized);
    }

    #[tokio::test]
    async fn test_super_admin_is_authorized_everywhere() {
        let client = MemoryQueryClient::new();
        let p = principal();
        make_super_admin(&client, &p).await;

        for t in [tenant("tenant-1"), tenant("tenant-2")] {
            let check = TenantAdminGuard::new(&client).check(Some(&p), &t).await.unwrap();
            assert!(check.is_authorized);
            assert_eq!(check.role, TenantRole::SuperAdmin);
            assert_eq!(check.permissions, PermissionMatrix::full());
        }
        assert!(SuperAdminGuard::new(&client).check(Some(&p)).await.unwrap().is_super_admin);
        assert!(!SuperAdminGuard::new(&client).check(None).await.unwrap().is_super_admin);
    }

    #[tokio::test]
    async fn test_staff_standing_does_not_grant_every_action() {
        let client = MemoryQueryClient::new();
        let t1 = tenant("tenant-1");
        let p = principal();
        let mut permissions = PermissionMatrix::none();
        permissions.orders = CapabilitySet {
            view: true,
            edit: true,
            ..CapabilitySet::NONE
        };
        assign(&client, &t1, &p, TenantRole::TenantStaff, permissions, true).await;

        let check = TenantAdminGuard::new(&client).check(Some(&p), &t1).await.unwrap();
        assert!(check.is_authorized);
        assert_eq!(check.role, TenantRole::TenantStaff);

        let access = AdminAccess::from_check(check, TenantScope::for_tenant(&t1).unwrap()).unwrap();
        assert!(access.require(Domain::Orders, Capability::View).is_ok());
        assert!(matches!(
            access.require(Domain::Orders, Capability::Delete),
            Err(AuthzError::PermissionDenied {
                domain: Domain::Orders,
                capability: Capability::Delete
            })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_check_yields_no_access() {
        let client = MemoryQueryClient::new();
        let t1 = tenant("tenant-1");
        let scope = TenantScope::for_tenant(&t1).unwrap();

        let anonymous = TenantAdminGuard::new(&client).check(None, &t1).await.unwrap();
        assert!(matches!(
            AdminAccess::from_check(anonymous, scope),
            Err(AuthzError::Unauthenticated)
        ));

        let p = principal();
        let customer = TenantAdminGuard::new(&client).check(Some(&p), &t1).await.unwrap();
        assert!(matches!(
            AdminAccess::from_check(customer, scope),
            Err(AuthzError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_only_session_resolved_is_transient() {
        let id = PrincipalId::generate();
        assert!(!GuardState::SessionResolved(id).is_terminal());
        assert!(GuardState::Unauthenticated.is_terminal());
        assert!(GuardState::SuperAdmin(id).is_terminal());
        assert!(GuardState::NoRole(id).is_terminal());
    }
}
