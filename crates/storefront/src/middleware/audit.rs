//! Admin audit middleware.
//!
//! Wraps the tenant-admin router. Successful mutations and guard refusals
//! are appended to the resolved tenant's audit trail once the response is
//! known.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::auth::Principal;
use crate::models::{AuditAction, NewAuditEntry};
use crate::services::AuditTrail;
use crate::state::AppState;
use crate::tenant::TenantContext;

/// Largest admin request body the middleware will buffer.
pub const AUDIT_BODY_LIMIT: usize = 1024 * 1024;

const ADMIN_PREFIX: &str = "/api/admin";

/// Action recorded for `method` answered with `status`, if any.
#[must_use]
pub fn audited_action(method: &Method, status: StatusCode) -> Option<AuditAction> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(AuditAction::AccessDenied);
    }
    if !status.is_success() {
        return None;
    }
    match *method {
        Method::POST => Some(AuditAction::Create),
        Method::PUT => Some(AuditAction::Upsert),
        Method::PATCH => Some(AuditAction::Update),
        Method::DELETE => Some(AuditAction::Delete),
        _ => None,
    }
}

/// Resource type and id from an admin path such as `/orders/{id}`.
#[must_use]
pub fn resource_of(path: &str) -> (String, Option<String>) {
    let path = path.strip_prefix(ADMIN_PREFIX).unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let resource_type = segments.next().unwrap_or("admin").to_owned();
    (resource_type, segments.next().map(str::to_owned))
}

fn is_mutation(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Record admin mutations and refusals in the tenant's audit trail.
pub async fn admin_audit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let (resource_type, resource_id) = resource_of(request.uri().path());
    let context = request.extensions().get::<TenantContext>().cloned();
    let principal_id = request.extensions().get::<Principal>().map(|p| p.id);

    let (request, new_values) = if is_mutation(&method) {
        let (parts, body) = request.into_parts();
        let Ok(bytes) = to_bytes(body, AUDIT_BODY_LIMIT).await else {
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        };
        let new_values = serde_json::from_slice::<Value>(&bytes).ok();
        (Request::from_parts(parts, Body::from(bytes)), new_values)
    } else {
        (request, None)
    };

    let response = next.run(request).await;

    let status = response.status();
    let Some(action) = audited_action(&method, status) else {
        return response;
    };
    let Some(scope) = context.and_then(|ctx| ctx.tenant_scope().ok()) else {
        tracing::warn!(?action, %resource_type, "admin request outside an active tenant left unaudited");
        return response;
    };

    let entry = NewAuditEntry {
        principal_id,
        action,
        resource_type,
        resource_id,
        status: status.as_u16(),
        new_values: if action == AuditAction::AccessDenied {
            None
        } else {
            new_values
        },
    };
    AuditTrail::new(state.client(), scope).record(&entry).await;
    response
}
