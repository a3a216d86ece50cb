//! Guard-backed extractors for admin routes.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AdminAccess, AuthzError, Principal, SuperAdminGuard, TenantAdminGuard};
use crate::error::AppError;
use crate::scope::ScopeError;
use crate::state::AppState;
use crate::tenant::TenantContext;

fn tenant_context(parts: &Parts) -> Result<TenantContext, AppError> {
    parts
        .extensions
        .get::<TenantContext>()
        .cloned()
        .ok_or(AppError::Scope(ScopeError::Unscoped))
}

/// Extractor that requires administrative standing in the request's tenant.
///
/// Handlers then call [`AdminAccess::require`] for the specific capability.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete_order(RequireTenantAdmin(access): RequireTenantAdmin, ...) -> Result<...> {
///     access.require(Domain::Orders, Capability::Delete)?;
///     ...
/// }
/// ```
pub struct RequireTenantAdmin(pub AdminAccess);

impl FromRequestParts<AppState> for RequireTenantAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = tenant_context(parts)?;
        let principal = parts.extensions.get::<Principal>();

        let check = TenantAdminGuard::new(state.client())
            .check(principal, ctx.current_tenant())
            .await?;
        let access = AdminAccess::from_check(check, ctx.tenant_scope()?)?;
        Ok(Self(access))
    }
}

/// Extractor for cross-tenant platform routes.
///
/// Requires the super-admin flag and a request resolved on the admin host.
pub struct RequirePlatformAdmin(pub Principal);

impl FromRequestParts<AppState> for RequirePlatformAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = tenant_context(parts)?;
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthzError::Unauthenticated)?;

        if !ctx.is_platform_admin() {
            tracing::warn!(
                reason = "unauthorized",
                principal_id = %principal.id,
                host = ctx.domain(),
                "platform route requested outside the admin host"
            );
            return Err(AuthzError::Unauthorized {
                tenant: ctx.current_tenant().slug.clone(),
            }
            .into());
        }

        let check = SuperAdminGuard::new(state.client())
            .check(Some(&principal))
            .await
            .map_err(AuthzError::from)?;
        if !check.is_super_admin {
            tracing::warn!(
                reason = "unauthorized",
                principal_id = %principal.id,
                "platform route requested by non super admin"
            );
            return Err(AuthzError::Unauthorized {
                tenant: ctx.current_tenant().slug.clone(),
            }
            .into());
        }
        Ok(Self(principal))
    }
}
