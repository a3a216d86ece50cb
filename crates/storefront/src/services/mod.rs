//! Business logic built on the scoped repositories.

pub mod audit;
pub mod checkout;
pub mod pools;
pub mod roles;

pub use audit::AuditTrail;
pub use checkout::{Checkout, CheckoutError};
pub use pools::{PoolSharing, create_shared_pool};
pub use roles::{RoleError, TenantRoles, grant_super_admin, revoke_super_admin};
