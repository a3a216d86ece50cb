//! Session layer.
//!
//! Sessions live in `PostgreSQL` (`tower_sessions.session`, created by a
//! migration). The cookie carries no `Domain` attribute, so each tenant host
//! gets its own session and a sign-in on one storefront never leaks to
//! another.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "ps_session";

/// Inactivity window before a session expires (14 days).
const SESSION_IDLE_SECONDS: i64 = 14 * 24 * 60 * 60;

#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_IDLE_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
