//! Pintureria Digital multitenant storefront library.
//!
//! One deployment serves many paint-store tenants from a shared database.
//! Each request is resolved to exactly one tenant, every read and write of
//! tenant-owned data is scoped to it, and admin actions are checked against
//! the principal's standing in that tenant.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scope;
pub mod services;
pub mod state;
pub mod tenant;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the application router with the per-request middleware stack.
///
/// The session layer and Sentry layers are added by the binary; without a
/// session the principal middleware only honours a principal already in the
/// request extensions.
pub fn build_router(state: AppState) -> Router {
    routes::routes(&state)
        .layer(axum::middleware::from_fn(auth::principal_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            tenant::tenant_context_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        tenant = tracing::field::Empty,
                        tenant_source = tracing::field::Empty,
                        principal_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
