//! Admin audit trail rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use paintstore_core::{AuditEntryId, PrincipalId, TenantId};

use crate::db::Collection;
use crate::scope::TenantOwned;

/// What an audited admin request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Upsert,
    Update,
    Delete,
    /// The guard turned the request away (401 or 403).
    AccessDenied,
}

/// One admin mutation or refused admin request in a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAuditEntry {
    pub id: AuditEntryId,
    pub tenant_id: TenantId,
    pub principal_id: Option<PrincipalId>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub status: u16,
    pub new_values: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for AdminAuditEntry {
    const COLLECTION: Collection = Collection::AdminAuditLog;
    type Id = AuditEntryId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// An entry as recorded; id, tenant and timestamp are filled in on insert.
#[derive(Debug, Clone, Serialize)]
pub struct NewAuditEntry {
    pub principal_id: Option<PrincipalId>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub status: u16,
    pub new_values: Option<Value>,
}
