//! Core types for Paintstore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod permissions;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use permissions::{Capability, CapabilitySet, Domain, PermissionMatrix};
pub use role::{ParseRoleError, TenantRole};
