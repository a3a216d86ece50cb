//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (binary only)
//! 2. Session layer (binary only, tower-sessions with `PostgreSQL` store)
//! 3. `TraceLayer` (one `http_request` span per request)
//! 4. Request ID
//! 5. Tenant context ([`crate::tenant::tenant_context_middleware`])
//! 6. Principal ([`crate::auth::principal_middleware`])
//!
//! The admin and platform routers add their own layers inside this stack:
//! rate limiting ([`rate_limit`]) and, on the admin router, the audit trail
//! ([`audit`]).

pub mod audit;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use audit::admin_audit_middleware;
pub use rate_limit::{RateLimiterLayer, admin_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
