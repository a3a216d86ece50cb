//! Customer profiles and analytics events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use paintstore_core::{AnalyticsEventId, Email, PrincipalId, TenantId, UserProfileId};

use crate::db::Collection;
use crate::scope::TenantOwned;

/// A principal's profile within one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserProfileId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for UserProfile {
    const COLLECTION: Collection = Collection::UserProfiles;
    type Id = UserProfileId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserProfile {
    pub principal_id: PrincipalId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: AnalyticsEventId,
    pub tenant_id: TenantId,
    pub principal_id: Option<PrincipalId>,
    pub event_name: String,
    pub page_path: Option<String>,
    pub properties: Value,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for AnalyticsEvent {
    const COLLECTION: Collection = Collection::AnalyticsEvents;
    type Id = AnalyticsEventId;

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAnalyticsEvent {
    pub principal_id: Option<PrincipalId>,
    pub event_name: String,
    pub page_path: Option<String>,
    pub properties: Value,
}
