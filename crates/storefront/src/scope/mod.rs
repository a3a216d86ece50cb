//! Access scoping engine.
//!
//! Every read and write of a tenant-owned table goes through a
//! [`ScopedRepository`] built from a [`TenantScope`]. The scope can only be
//! obtained from a resolved, active tenant, so a repository without a tenant
//! predicate cannot be constructed.
//!
//! # Example
//!
//! ```rust,ignore
//! let scope = ctx.tenant_scope()?;
//! let orders = ScopedRepository::<Order>::new(client, scope);
//! let mine = orders.list(&[Predicate::eq("principal_id", principal.id)], &QueryOptions::newest_first()).await?;
//! ```
//!
//! The one exception is [`ServiceScope`], a separately authorised mode for
//! platform jobs that may read across tenants. It is not reachable from any
//! request handler.

mod catalog;
mod repository;
mod service;

use std::fmt::{Debug, Display};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use paintstore_core::{ProductId, SharedPoolId, TenantId};

use crate::db::{Collection, QueryError};
use crate::tenant::{Tenant, TenantContext, TenantRegistry};

pub use catalog::{CatalogQuery, CatalogRepository};
pub use repository::{Affected, ScopedRepository};
pub use service::{PlatformRepository, ServiceCredential, ServiceScope, TenantOrderTotals};

/// Errors raised by the access scoping engine.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A tenant-owned operation was attempted without a resolved tenant.
    #[error("tenant-owned access attempted without a resolved tenant")]
    Unscoped,

    /// An explicit tenant reference points to no active tenant.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: ProductId },

    /// The product is not offered by this tenant.
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    /// The shared pool does not exist or is not shared with this tenant.
    #[error("shared stock pool {0} is not available")]
    PoolUnavailable(SharedPoolId),

    #[error("service access denied: {0}")]
    ServiceDenied(String),

    /// A row came back under a tenant other than the scope's.
    #[error("row for tenant {found} returned in scope of tenant {expected}")]
    IsolationViolation { expected: TenantId, found: TenantId },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("stored row is malformed: {0}")]
    DataCorruption(String),
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Proof that data access is bound to one active tenant.
///
/// The field is private: a scope is built only by the constructors below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: TenantId,
}

impl TenantScope {
    /// Scope for a resolved tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::TenantNotFound` if the tenant is inactive.
    pub fn for_tenant(tenant: &Tenant) -> Result<Self, ScopeError> {
        if !tenant.is_active {
            return Err(ScopeError::TenantNotFound(tenant.slug.clone()));
        }
        Ok(Self {
            tenant_id: tenant.id,
        })
    }

    /// Scope for the request's tenant context.
    ///
    /// A missing context is a programming error: it is logged at ERROR,
    /// reported to Sentry and the operation is refused.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Unscoped` if no context was resolved.
    pub fn from_context(context: Option<&TenantContext>) -> Result<Self, ScopeError> {
        let Some(context) = context else {
            tracing::error!("tenant-owned access attempted without tenant context");
            sentry::capture_message(
                "Unscoped tenant-owned access attempted",
                sentry::Level::Fatal,
            );
            return Err(ScopeError::Unscoped);
        };
        context.tenant_scope()
    }

    /// Scope for an explicit tenant id, e.g. from a role assignment.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::TenantNotFound` if the registry has no active
    /// tenant with this id.
    pub fn for_tenant_id(
        tenant_id: TenantId,
        registry: &dyn TenantRegistry,
    ) -> Result<Self, ScopeError> {
        registry
            .find_by_id(tenant_id)
            .ok_or_else(|| ScopeError::TenantNotFound(tenant_id.to_string()))
            .and_then(|tenant| Self::for_tenant(&tenant))
    }

    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// A row type stored in a tenant-owned collection.
pub trait TenantOwned: Serialize + DeserializeOwned + Send + Sync {
    /// The collection holding these rows. Must be tenant-owned.
    const COLLECTION: Collection;

    type Id: Serialize + Copy + Debug + Display + Send + Sync;

    fn tenant_id(&self) -> TenantId;
}
