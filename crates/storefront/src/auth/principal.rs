//! Identity assertion carried by the session.
//!
//! This crate does not authenticate anyone. A principal reaches a request by
//! one of two entry points:
//!
//! - **Session.** The login service shares the `tower-sessions` Postgres
//!   store and, after verifying the user, calls [`set_current_principal`] on
//!   that session (and [`clear_current_principal`] on logout). The session
//!   cookie then carries the identity to every storefront host.
//! - **Trusted edge layer.** A layer mounted outside [`crate::build_router`]
//!   that has already verified the caller (for example a signed header from
//!   the identity proxy) inserts a [`Principal`] into the request extensions.
//!   An extension principal takes precedence over the session.
//!
//! ```rust,ignore
//! // in the login service, after credentials check out
//! set_current_principal(&session, &Principal { id, email }).await?;
//! ```
//!
//! [`principal_middleware`] lifts the principal into the request extensions
//! once per request, where the extractors below read it. Nothing in this
//! crate reads client-supplied identity headers.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::Span;

use paintstore_core::{Email, PrincipalId};

use super::AuthzError;
use crate::error::{AppError, set_sentry_user};

/// Session keys.
pub mod session_keys {
    pub const CURRENT_PRINCIPAL: &str = "current_principal";
}

/// An authenticated actor: opaque id plus email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: Email,
}

/// Copy the session's principal into request extensions.
///
/// A principal already present in extensions (placed by an outer layer)
/// is kept.
pub async fn principal_middleware(mut request: Request, next: Next) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        let from_session = match request.extensions().get::<Session>() {
            Some(session) => session
                .get::<Principal>(session_keys::CURRENT_PRINCIPAL)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to read principal from session");
                    None
                }),
            None => None,
        };
        if let Some(principal) = from_session {
            request.extensions_mut().insert(principal);
        }
    }

    if let Some(principal) = request.extensions().get::<Principal>() {
        Span::current().record("principal_id", tracing::field::display(&principal.id));
        set_sentry_user(&principal.id, Some(principal.email.as_str()));
    }

    next.run(request).await
}

/// Extractor for the current principal, if any.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalPrincipal(principal): OptionalPrincipal) -> impl IntoResponse {
///     principal.map_or("guest".to_owned(), |p| p.email.to_string())
/// }
/// ```
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}

/// Extractor that requires an authenticated principal (401 otherwise).
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or(AppError::Authz(AuthzError::Unauthenticated))
    }
}

/// Store the principal asserted by the authentication collaborator.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_principal(
    session: &Session,
    principal: &Principal,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_PRINCIPAL, principal)
        .await
}

/// Remove the principal from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_principal(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<Principal>(session_keys::CURRENT_PRINCIPAL)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_principal_round_trips_through_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let principal = Principal {
            id: PrincipalId::generate(),
            email: Email::parse("compras@pinteya.com").unwrap(),
        };

        set_current_principal(&session, &principal).await.unwrap();
        let stored: Option<Principal> = session
            .get(session_keys::CURRENT_PRINCIPAL)
            .await
            .unwrap();
        assert_eq!(stored, Some(principal));

        clear_current_principal(&session).await.unwrap();
        let cleared: Option<Principal> = session
            .get(session_keys::CURRENT_PRINCIPAL)
            .await
            .unwrap();
        assert!(cleared.is_none());
    }
}
