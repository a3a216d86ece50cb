//! Role assignments and the super-admin flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paintstore_core::{PermissionMatrix, PrincipalId, RoleAssignmentId, TenantId, TenantRole};

use crate::db::Collection;
use crate::scope::TenantOwned;

/// A principal's role in one tenant. At most one row per (tenant, principal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: RoleAssignmentId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    pub role: TenantRole,
    #[serde(default)]
    pub permissions: PermissionMatrix,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for RoleAssignment {
    const COLLECTION: Collection = Collection::RoleAssignments;
    type Id = RoleAssignmentId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// A role grant as requested by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: TenantRole,
    #[serde(default)]
    pub permissions: PermissionMatrix,
}

impl RoleGrant {
    /// A tenant admin holds every capability in their tenant.
    #[must_use]
    pub fn effective_permissions(&self) -> PermissionMatrix {
        match self.role {
            TenantRole::TenantAdmin => PermissionMatrix::full(),
            _ => self.permissions,
        }
    }
}

/// Tenant-independent super-admin flag (platform table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperAdmin {
    pub principal_id: PrincipalId,
    pub granted_at: DateTime<Utc>,
}
