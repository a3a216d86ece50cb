//! Roles a principal can hold relative to a tenant.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tenant role: {0}")]
pub struct ParseRoleError(pub String);

/// Role of a principal within one tenant.
///
/// `Customer` is the implicit role of every principal without an active
/// assignment row. `SuperAdmin` is never stored in an assignment row; it is
/// derived from the tenant-independent super-admin flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.tenant_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TenantRole {
    /// Shopper with no administrative standing.
    #[default]
    Customer,
    /// Staff member whose abilities are defined by the permission matrix.
    TenantStaff,
    /// Administrator of a single tenant.
    TenantAdmin,
    /// Platform operator with standing in every tenant.
    SuperAdmin,
}

impl TenantRole {
    /// Whether this role can be stored in a per-tenant assignment row.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        matches!(self, Self::TenantStaff | Self::TenantAdmin)
    }

    /// Whether this role carries any administrative standing.
    #[must_use]
    pub const fn is_administrative(self) -> bool {
        !matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for TenantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::TenantStaff => write!(f, "tenant_staff"),
            Self::TenantAdmin => write!(f, "tenant_admin"),
            Self::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl std::str::FromStr for TenantRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "tenant_staff" => Ok(Self::TenantStaff),
            "tenant_admin" => Ok(Self::TenantAdmin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}
