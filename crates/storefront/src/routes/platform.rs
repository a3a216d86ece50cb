//! Platform API for super admins on the admin host.

use axum::{Json, extract::State};
use serde::Serialize;

use paintstore_core::TenantId;

use crate::auth::RequirePlatformAdmin;
use crate::state::AppState;

/// One row of the platform tenant listing.
#[derive(Debug, Serialize)]
pub struct TenantSummary {
    pub id: TenantId,
    pub slug: String,
    pub name: String,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    pub base_url: String,
}

/// `GET /api/platform/tenants`
pub async fn list_tenants(
    State(state): State<AppState>,
    RequirePlatformAdmin(principal): RequirePlatformAdmin,
) -> Json<Vec<TenantSummary>> {
    let root = state.tenancy().platform_root.as_str();
    let directory = state.tenants().snapshot().await;
    let mut tenants: Vec<TenantSummary> = directory
        .all()
        .iter()
        .filter(|t| t.is_active)
        .map(|t| TenantSummary {
            id: t.id,
            slug: t.slug.clone(),
            name: t.name.clone(),
            subdomain: t.subdomain.clone(),
            custom_domain: t.custom_domain.clone(),
            base_url: t.base_url(root),
        })
        .collect();
    tenants.sort_by(|a, b| a.slug.cmp(&b.slug));

    tracing::debug!(principal_id = %principal.id, count = tenants.len(), "platform tenant listing");
    Json(tenants)
}
