//! Best-effort admin audit trail.
//!
//! Recording never fails the request it describes: a write error is logged
//! and dropped.

use tracing::instrument;

use crate::db::{QueryClient, QueryOptions};
use crate::models::{AdminAuditEntry, NewAuditEntry};
use crate::scope::{ScopeError, ScopedRepository, TenantScope};

/// Audit entries of one tenant.
pub struct AuditTrail<'a> {
    log: ScopedRepository<'a, AdminAuditEntry>,
}

impl<'a> AuditTrail<'a> {
    #[must_use]
    pub fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        Self {
            log: ScopedRepository::new(client, scope),
        }
    }

    /// Append `entry`; `None` if the write failed.
    #[instrument(skip(self, entry), fields(action = ?entry.action, resource = %entry.resource_type))]
    pub async fn record(&self, entry: &NewAuditEntry) -> Option<AdminAuditEntry> {
        match self.log.insert(entry).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!(error = %e, "failed to write admin audit entry");
                None
            }
        }
    }

    /// Entries in the order and page `options` ask for.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the read fails.
    pub async fn entries(&self, options: &QueryOptions) -> Result<Vec<AdminAuditEntry>, ScopeError> {
        self.log.list(&[], options).await
    }
}
