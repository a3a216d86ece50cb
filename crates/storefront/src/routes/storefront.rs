//! Storefront API for the resolved tenant.
//!
//! Every handler derives its data scope from the request's tenant context;
//! tenant ids in request bodies are never read.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use paintstore_core::{CartItemId, ProductId};

use crate::auth::{OptionalPrincipal, RequirePrincipal};
use crate::db::{Predicate, QueryOptions};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{
    AnalyticsEvent, CartItem, NewAnalyticsEvent, NewCartItem, Order, StorefrontProduct,
};
use crate::scope::{CatalogQuery, CatalogRepository, ScopedRepository};
use crate::services::Checkout;
use crate::state::AppState;
use crate::tenant::{CurrentTenant, PublicTenantConfig};

/// `GET /api/tenant`
pub async fn tenant_config(CurrentTenant(ctx): CurrentTenant) -> Json<PublicTenantConfig> {
    Json(ctx.current_public_config().clone())
}

/// `GET /api/products`
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<StorefrontProduct>>> {
    let catalog = CatalogRepository::new(state.client(), ctx.tenant_scope()?);
    Ok(Json(catalog.list_visible(&query).await?))
}

/// `GET /api/products/{id}`
#[instrument(skip(state, ctx))]
pub async fn show_product(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    Path(product_id): Path<ProductId>,
) -> Result<Json<StorefrontProduct>> {
    CatalogRepository::new(state.client(), ctx.tenant_scope()?)
        .get_visible(product_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("product".into()))
}

/// `GET /api/cart`
pub async fn show_cart(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<CartItem>>> {
    let items = ScopedRepository::<CartItem>::new(state.client(), ctx.tenant_scope()?)
        .list(
            &[Predicate::eq("principal_id", principal.id)],
            &QueryOptions::default(),
        )
        .await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct CartQuantity {
    pub quantity: i64,
}

/// `POST /api/cart`
///
/// Adding a product already in the cart increases its quantity.
#[instrument(skip(state, ctx, principal))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
    Json(input): Json<AddToCart>,
) -> Result<impl IntoResponse> {
    if input.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }
    let scope = ctx.tenant_scope()?;
    if CatalogRepository::new(state.client(), scope)
        .get_visible(input.product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("product".into()));
    }

    let cart = ScopedRepository::<CartItem>::new(state.client(), scope);
    let filters = [
        Predicate::eq("principal_id", principal.id),
        Predicate::eq("product_id", input.product_id),
    ];
    let existing = cart
        .list(&filters, &QueryOptions::default())
        .await?
        .into_iter()
        .next();

    let item = match existing {
        Some(item) => {
            let quantity = item.quantity.saturating_add(input.quantity);
            cart.update(item.id, &CartQuantity { quantity }).await?;
            CartItem { quantity, ..item }
        }
        None => {
            cart.insert(&NewCartItem {
                principal_id: principal.id,
                product_id: input.product_id,
                quantity: input.quantity,
            })
            .await?
        }
    };
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PATCH /api/cart/{id}`
pub async fn update_cart_item(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<CartItemId>,
    Json(input): Json<CartQuantity>,
) -> Result<StatusCode> {
    if input.quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }
    let affected = ScopedRepository::<CartItem>::new(state.client(), ctx.tenant_scope()?)
        .update_where(
            &[
                Predicate::eq("id", id),
                Predicate::eq("principal_id", principal.id),
            ],
            &input,
        )
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("cart item".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/cart/{id}`
pub async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    let affected = ScopedRepository::<CartItem>::new(state.client(), ctx.tenant_scope()?)
        .delete_where(&[
            Predicate::eq("id", id),
            Predicate::eq("principal_id", principal.id),
        ])
        .await?;
    if !affected.any() {
        return Err(AppError::NotFound("cart item".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<Order>>> {
    let orders = ScopedRepository::<Order>::new(state.client(), ctx.tenant_scope()?)
        .list(
            &[Predicate::eq("principal_id", principal.id)],
            &QueryOptions::newest_first(),
        )
        .await?;
    Ok(Json(orders))
}

/// `POST /api/orders`
#[instrument(skip_all)]
pub async fn place_order(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<impl IntoResponse> {
    let tenant = ctx.current_tenant();
    let order = Checkout::new(state.client(), ctx.tenant_scope()?)
        .place_order(&principal, &tenant.currency)
        .await?;
    let order_id = order.id.to_string();
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", order_id.as_str()), ("tenant", tenant.slug.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct TrackEvent {
    pub event_name: String,
    #[serde(default)]
    pub page_path: Option<String>,
    #[serde(default)]
    pub properties: Option<Value>,
}

/// `POST /api/analytics/events`
pub async fn track_event(
    State(state): State<AppState>,
    CurrentTenant(ctx): CurrentTenant,
    OptionalPrincipal(principal): OptionalPrincipal,
    Json(input): Json<TrackEvent>,
) -> Result<impl IntoResponse> {
    let event_name = input.event_name.trim();
    if event_name.is_empty() || event_name.len() > 100 {
        return Err(AppError::BadRequest("invalid event name".into()));
    }
    let event = ScopedRepository::<AnalyticsEvent>::new(state.client(), ctx.tenant_scope()?)
        .insert(&NewAnalyticsEvent {
            principal_id: principal.map(|p| p.id),
            event_name: event_name.to_owned(),
            page_path: input.page_path,
            properties: input
                .properties
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}
