//! Identity and authorization.
//!
//! - [`Principal`] is the identity assertion read from the session.
//! - [`SuperAdminGuard`] checks the tenant-independent super-admin flag.
//! - [`TenantAdminGuard`] decides standing in the resolved tenant.
//! - [`AdminAccess::require`] checks one permission-matrix field.

mod extract;
mod guards;
mod principal;

pub use extract::{RequirePlatformAdmin, RequireTenantAdmin};
pub use guards::{
    AdminAccess, AuthzError, GuardState, SuperAdminCheck, SuperAdminGuard, TenantAdminCheck,
    TenantAdminGuard,
};
pub use principal::{
    OptionalPrincipal, Principal, RequirePrincipal, clear_current_principal,
    principal_middleware, session_keys, set_current_principal,
};
