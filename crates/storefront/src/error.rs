//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Responses never reveal whether a row exists in another tenant: a foreign
//! row and a missing row both render as `404 Not found`, and lack of standing
//! and lack of a permission both render as `403 Forbidden`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::AuthzError;
use crate::db::QueryError;
use crate::scope::ScopeError;
use crate::services::{CheckoutError, RoleError};
use crate::tenant::RegistryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Access scoping engine failure.
    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    /// Guard denial or guard lookup failure.
    #[error("Authorization error: {0}")]
    Authz(#[from] AuthzError),

    /// Order placement failure.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Role management failure.
    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    /// Tenant registry failure.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found (or owned by another tenant).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        Self::Scope(ScopeError::Query(err))
    }
}

fn scope_status(err: &ScopeError) -> (StatusCode, &'static str) {
    match err {
        ScopeError::TenantNotFound(_)
        | ScopeError::ProductUnavailable(_)
        | ScopeError::PoolUnavailable(_) => (StatusCode::NOT_FOUND, "Not found"),
        ScopeError::InsufficientStock { .. } => (StatusCode::CONFLICT, "Insufficient stock"),
        ScopeError::Query(QueryError::Conflict(_)) => (StatusCode::CONFLICT, "Conflict"),
        ScopeError::ServiceDenied(_) => (StatusCode::FORBIDDEN, "Forbidden"),
        ScopeError::Unscoped
        | ScopeError::IsolationViolation { .. }
        | ScopeError::Query(_)
        | ScopeError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

impl AppError {
    fn status(&self) -> (StatusCode, String) {
        let (status, message) = match self {
            Self::Scope(err)
            | Self::Authz(AuthzError::Scope(err))
            | Self::Checkout(CheckoutError::Scope(err))
            | Self::Role(RoleError::Scope(err)) => scope_status(err),
            Self::Role(err @ RoleError::NotAssignable(_)) => {
                return (StatusCode::BAD_REQUEST, err.to_string());
            }
            Self::Checkout(CheckoutError::EmptyCart) => (StatusCode::BAD_REQUEST, "Cart is empty"),
            Self::Authz(AuthzError::Unauthenticated) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::Authz(AuthzError::Unauthorized { .. } | AuthzError::PermissionDenied { .. }) => {
                (StatusCode::FORBIDDEN, "Forbidden")
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            Self::BadRequest(message) => return (StatusCode::BAD_REQUEST, message.clone()),
            Self::Registry(_) | Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, message.to_owned())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a principal ID.
///
/// Called once per request after the session's principal is known.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
