//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the platform
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PLATFORM_ROOT_DOMAIN` - Root domain tenants get subdomains under (default: pintureriadigital.com)
//! - `DEFAULT_TENANT_SLUG` - Tenant served when nothing else matches (default: pinteya)
//! - `TRUST_EDGE_HEADERS` - Honour `x-tenant-*` headers injected by the edge (default: false)
//! - `DEV_TENANT_SLUG` - Force a tenant locally; only read when `APP_ENV=development`
//! - `TENANT_CACHE_TTL_SECS` - Tenant directory cache lifetime (default: 60)
//! - `ADMIN_RATE_LIMIT_BURST` - Admin/platform requests allowed in a burst per client IP (default: 100)
//! - `ADMIN_RATE_LIMIT_REPLENISH_SECS` - Seconds to regain one admin request (default: 6)
//! - `SERVICE_TOKEN` - Enables the service access mode for backend jobs (read by `ps-cli`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

pub const DEFAULT_PLATFORM_ROOT: &str = "pintureriadigital.com";
pub const DEFAULT_TENANT_SLUG: &str = "pinteya";

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the platform
    pub base_url: Url,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Tenant resolution settings
    pub tenancy: TenancyConfig,
    /// Admin and platform API throttling
    pub rate_limits: RateLimitConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Settings the tenant resolver and directory need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    /// Root domain tenants receive subdomains under, lowercase.
    pub platform_root: String,
    /// Slug of the tenant served when no rule matches.
    pub default_slug: String,
    /// Whether `x-tenant-*` request headers come from a controlled edge.
    pub trust_edge_headers: bool,
    /// Development-only forced tenant slug.
    pub dev_tenant_slug: Option<String>,
    /// How long a loaded tenant directory stays cached.
    pub cache_ttl: Duration,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            platform_root: DEFAULT_PLATFORM_ROOT.to_owned(),
            default_slug: DEFAULT_TENANT_SLUG.to_owned(),
            trust_edge_headers: false,
            dev_tenant_slug: None,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Per-client-IP throttling of the admin and platform APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests a client may make back to back.
    pub burst: NonZeroU32,
    /// Seconds until one more request is allowed.
    pub replenish_secs: NonZeroU64,
}

impl Default for RateLimitConfig {
    /// About 100 requests per 10 minutes.
    fn default() -> Self {
        Self {
            burst: NonZeroU32::new(100).unwrap_or(NonZeroU32::MIN),
            replenish_secs: NonZeroU64::new(6).unwrap_or(NonZeroU64::MIN),
        }
    }
}

impl RateLimitConfig {
    /// Load the throttling settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a value that is not a positive
    /// integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            burst: parse_non_zero("ADMIN_RATE_LIMIT_BURST")?.unwrap_or(defaults.burst),
            replenish_secs: parse_non_zero("ADMIN_RATE_LIMIT_REPLENISH_SECS")?
                .unwrap_or(defaults.replenish_secs),
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = Url::parse(&get_required_env("STOREFRONT_BASE_URL")?).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let tenancy = TenancyConfig::from_env()?;
        let rate_limits = RateLimitConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            tenancy,
            rate_limits,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl TenancyConfig {
    /// Load the tenancy settings on their own (the CLI needs no server config).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a boolean or numeric variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let trust_edge_headers = parse_bool(
            "TRUST_EDGE_HEADERS",
            &get_env_or_default("TRUST_EDGE_HEADERS", "false"),
        )?;
        let cache_ttl = get_optional_env("TENANT_CACHE_TTL_SECS")
            .map(|raw| {
                raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar("TENANT_CACHE_TTL_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(defaults.cache_ttl);

        let is_development = get_optional_env("APP_ENV").as_deref() == Some("development");
        let dev_tenant_slug = if is_development {
            get_optional_env("DEV_TENANT_SLUG").filter(|s| !s.trim().is_empty())
        } else {
            None
        };

        Ok(Self {
            platform_root: get_env_or_default("PLATFORM_ROOT_DOMAIN", DEFAULT_PLATFORM_ROOT)
                .trim()
                .trim_end_matches('.')
                .to_ascii_lowercase(),
            default_slug: get_env_or_default("DEFAULT_TENANT_SLUG", DEFAULT_TENANT_SLUG),
            trust_edge_headers,
            dev_tenant_slug,
            cache_ttl,
        })
    }
}

/// Load the secret that enables the service access mode, if configured.
///
/// The storefront server never reads this; only backend jobs do.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the token is a placeholder or
/// has low entropy.
pub fn service_token_from_env() -> Result<Option<SecretString>, ConfigError> {
    get_optional_env("SERVICE_TOKEN")
        .map(|value| {
            validate_secret_strength(&value, "SERVICE_TOKEN")?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_non_zero<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    get_optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
