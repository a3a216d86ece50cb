//! Tenant-admin API.
//!
//! Every handler first obtains [`AdminAccess`] (standing in the resolved
//! tenant) and then requires the one capability the action needs. Data is
//! read and written in the scope the access was granted for.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use paintstore_core::{
    Capability, CategoryId, CouponId, Domain, OrderId, PrincipalId, ProductId,
};

use crate::auth::{OptionalPrincipal, RequireTenantAdmin, TenantAdminCheck, TenantAdminGuard};
use crate::db::{Direction, QueryOptions};
use crate::error::{AppError, Result};
use crate::models::{
    AdminAuditEntry, AnalyticsEvent, AssociationSettings, Category, CategoryPatch, Coupon,
    NewCategory, NewCoupon, NewPromotion, Order, OrderPatch, Promotion, RoleAssignment, RoleGrant,
    SharedStockPool, TenantProduct, UserProfile,
};
use crate::scope::{CatalogRepository, ScopedRepository};
use crate::services::{AuditTrail, TenantRoles};
use crate::state::AppState;
use crate::tenant::CurrentTenant;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Pagination for admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    fn options(&self) -> QueryOptions {
        QueryOptions::newest_first().page(
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// `GET /api/admin/me`
///
/// Answers even without standing, so the client can decide what to show.
pub async fn me(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Result<Json<TenantAdminCheck>> {
    let check = TenantAdminGuard::new(state.client())
        .check(principal.as_ref(), ctx.current_tenant())
        .await?;
    Ok(Json(check))
}

// =============================================================================
// Orders
// =============================================================================

pub async fn list_orders(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Order>>> {
    access.require(Domain::Orders, Capability::View)?;
    let orders = ScopedRepository::<Order>::new(state.client(), access.scope())
        .list(&[], &page.options())
        .await?;
    Ok(Json(orders))
}

pub async fn show_order(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    access.require(Domain::Orders, Capability::View)?;
    ScopedRepository::<Order>::new(state.client(), access.scope())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("order".into()))
}

#[instrument(skip(state, access))]
pub async fn update_order(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<OrderId>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>> {
    access.require(Domain::Orders, Capability::Edit)?;
    let orders = ScopedRepository::<Order>::new(state.client(), access.scope());
    if !orders.update(id, &patch).await?.any() {
        return Err(AppError::NotFound("order".into()));
    }
    orders
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("order".into()))
}

#[instrument(skip(state, access))]
pub async fn delete_order(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    access.require(Domain::Orders, Capability::Delete)?;
    let affected = ScopedRepository::<Order>::new(state.client(), access.scope())
        .delete(id)
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("order".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Catalog
// =============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
) -> Result<Json<Vec<Category>>> {
    access.require(Domain::Products, Capability::View)?;
    let categories = ScopedRepository::<Category>::new(state.client(), access.scope())
        .list(
            &[],
            &QueryOptions {
                order_by: Some(("name", Direction::Ascending)),
                ..QueryOptions::default()
            },
        )
        .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Json(input): Json<NewCategory>,
) -> Result<impl IntoResponse> {
    access.require(Domain::Products, Capability::Create)?;
    if input.name.trim().is_empty() || input.slug.trim().is_empty() {
        return Err(AppError::BadRequest("name and slug are required".into()));
    }
    let category = ScopedRepository::<Category>::new(state.client(), access.scope())
        .insert(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<CategoryId>,
    Json(patch): Json<CategoryPatch>,
) -> Result<StatusCode> {
    access.require(Domain::Products, Capability::Edit)?;
    let affected = ScopedRepository::<Category>::new(state.client(), access.scope())
        .update(id, &patch)
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("category".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_category(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    access.require(Domain::Products, Capability::Delete)?;
    let affected = ScopedRepository::<Category>::new(state.client(), access.scope())
        .delete(id)
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("category".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/admin/products/{id}`: create or replace the tenant association.
#[instrument(skip(state, access, settings))]
pub async fn upsert_product(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(product_id): Path<ProductId>,
    Json(settings): Json<AssociationSettings>,
) -> Result<Json<TenantProduct>> {
    access.require(Domain::Products, Capability::Edit)?;
    if settings.price.is_sign_negative() || settings.stock < 0 {
        return Err(AppError::BadRequest("price and stock must not be negative".into()));
    }
    let association = CatalogRepository::new(state.client(), access.scope())
        .upsert_association(product_id, &settings)
        .await?;
    Ok(Json(association))
}

/// `GET /api/admin/pools`: shared stock pools this tenant may link to.
pub async fn list_pools(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
) -> Result<Json<Vec<SharedStockPool>>> {
    access.require(Domain::Products, Capability::View)?;
    let pools = CatalogRepository::new(state.client(), access.scope())
        .member_pools()
        .await?;
    Ok(Json(pools))
}

// =============================================================================
// Marketing
// =============================================================================

pub async fn list_coupons(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Coupon>>> {
    access.require(Domain::Marketing, Capability::View)?;
    let coupons = ScopedRepository::<Coupon>::new(state.client(), access.scope())
        .list(&[], &page.options())
        .await?;
    Ok(Json(coupons))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Json(input): Json<NewCoupon>,
) -> Result<impl IntoResponse> {
    access.require(Domain::Marketing, Capability::Create)?;
    let input = input.normalised();
    if input.code.is_empty() || input.value.is_sign_negative() {
        return Err(AppError::BadRequest("invalid coupon".into()));
    }
    let coupon = ScopedRepository::<Coupon>::new(state.client(), access.scope())
        .insert(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(id): Path<CouponId>,
) -> Result<StatusCode> {
    access.require(Domain::Marketing, Capability::Delete)?;
    let affected = ScopedRepository::<Coupon>::new(state.client(), access.scope())
        .delete(id)
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("coupon".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_promotions(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Promotion>>> {
    access.require(Domain::Marketing, Capability::View)?;
    let promotions = ScopedRepository::<Promotion>::new(state.client(), access.scope())
        .list(&[], &page.options())
        .await?;
    Ok(Json(promotions))
}

pub async fn create_promotion(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Json(input): Json<NewPromotion>,
) -> Result<impl IntoResponse> {
    access.require(Domain::Marketing, Capability::Create)?;
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if let (Some(starts), Some(ends)) = (input.starts_at, input.ends_at)
        && ends < starts
    {
        return Err(AppError::BadRequest("promotion ends before it starts".into()));
    }
    let promotion = ScopedRepository::<Promotion>::new(state.client(), access.scope())
        .insert(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

// =============================================================================
// Customers and analytics
// =============================================================================

pub async fn list_customers(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<UserProfile>>> {
    access.require(Domain::Customers, Capability::View)?;
    let profiles = ScopedRepository::<UserProfile>::new(state.client(), access.scope())
        .list(&[], &page.options())
        .await?;
    Ok(Json(profiles))
}

pub async fn list_analytics_events(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<AnalyticsEvent>>> {
    access.require(Domain::Analytics, Capability::View)?;
    let events = ScopedRepository::<AnalyticsEvent>::new(state.client(), access.scope())
        .list(&[], &page.options())
        .await?;
    Ok(Json(events))
}

// =============================================================================
// Roles
// =============================================================================

/// `PUT /api/admin/roles/{principal}`
///
/// One assignment per (tenant, principal): an existing row is replaced.
#[instrument(skip(state, access, grant))]
pub async fn grant_role(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(principal_id): Path<PrincipalId>,
    Json(grant): Json<RoleGrant>,
) -> Result<Json<RoleAssignment>> {
    access.require(Domain::Settings, Capability::Edit)?;
    let assignment = TenantRoles::new(state.client(), access.scope())
        .grant(principal_id, &grant)
        .await?;
    tracing::info!(
        %principal_id,
        role = %assignment.role,
        granted_by = ?access.check().principal_id,
        "tenant role granted"
    );
    Ok(Json(assignment))
}

/// `DELETE /api/admin/roles/{principal}`
#[instrument(skip(state, access))]
pub async fn revoke_role(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Path(principal_id): Path<PrincipalId>,
) -> Result<StatusCode> {
    access.require(Domain::Settings, Capability::Edit)?;
    let affected = TenantRoles::new(state.client(), access.scope())
        .revoke(principal_id)
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("role assignment".into()));
    }
    tracing::info!(%principal_id, revoked_by = ?access.check().principal_id, "tenant role revoked");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Audit
// =============================================================================

/// `GET /api/admin/audit`: newest first.
pub async fn list_audit_entries(
    State(state): State<AppState>,
    RequireTenantAdmin(access): RequireTenantAdmin,
    Query(page): Query<Page>,
) -> Result<Json<Vec<AdminAuditEntry>>> {
    access.require(Domain::Settings, Capability::View)?;
    let entries = AuditTrail::new(state.client(), access.scope())
        .entries(&page.options())
        .await?;
    Ok(Json(entries))
}
