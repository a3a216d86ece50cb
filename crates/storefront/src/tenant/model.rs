//! Tenant records and their public projection.
//!
//! [`TenantRow`] is the shape stored in `storefront.tenants`; [`Tenant`] is the
//! validated domain type with secrets wrapped in [`SecretString`].
//! [`PublicTenantConfig`] is the only tenant shape that may be sent to a
//! browser or render context.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use paintstore_core::TenantId;

use crate::db::Row;

/// Branding tokens. Missing values fall back to the platform palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeTokens {
    pub primary_color: String,
    pub primary_dark: String,
    pub primary_light: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_gradient_start: String,
    pub background_gradient_end: String,
    pub header_bg_color: String,
    pub border_radius: String,
    pub font_family: String,
    pub logo_url: Option<String>,
    pub logo_dark_url: Option<String>,
    pub favicon_url: Option<String>,
}

impl Default for ThemeTokens {
    fn default() -> Self {
        Self {
            primary_color: "#f27a1d".to_owned(),
            primary_dark: "#bd4811".to_owned(),
            primary_light: "#f9be78".to_owned(),
            secondary_color: "#007638".to_owned(),
            accent_color: "#ffd549".to_owned(),
            background_gradient_start: "#000000".to_owned(),
            background_gradient_end: "#eb6313".to_owned(),
            header_bg_color: "#ea5a17".to_owned(),
            border_radius: "0.5rem".to_owned(),
            font_family: "Plus Jakarta Sans".to_owned(),
            logo_url: None,
            logo_dark_url: None,
            favicon_url: None,
        }
    }
}

/// The two third-party tracking identifiers a tenant may configure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsIds {
    pub ga4_measurement_id: Option<String>,
    pub meta_pixel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub support_email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub whatsapp_number: Option<String>,
    pub whatsapp_message_template: Option<String>,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            phone: None,
            support_email: None,
            address: None,
            city: None,
            province: None,
            postal_code: None,
            country: "Argentina".to_owned(),
            whatsapp_number: None,
            whatsapp_message_template: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoMetadata {
    pub site_title: Option<String>,
    pub site_description: Option<String>,
    pub site_keywords: Vec<String>,
    pub og_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub youtube: Option<String>,
}

/// Per-tenant credentials for external collaborators.
///
/// Implements `Debug` manually to redact every value.
#[derive(Clone, Default)]
pub struct TenantSecrets {
    pub mercadopago_access_token: Option<SecretString>,
    pub mercadopago_webhook_secret: Option<SecretString>,
    pub resend_api_key: Option<SecretString>,
    pub meta_access_token: Option<SecretString>,
    pub ga4_property_id: Option<SecretString>,
}

impl std::fmt::Debug for TenantSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<SecretString>| if s.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("TenantSecrets")
            .field("mercadopago_access_token", &redact(&self.mercadopago_access_token))
            .field("mercadopago_webhook_secret", &redact(&self.mercadopago_webhook_secret))
            .field("resend_api_key", &redact(&self.resend_api_key))
            .field("meta_access_token", &redact(&self.meta_access_token))
            .field("ga4_property_id", &redact(&self.ga4_property_id))
            .finish()
    }
}

/// Secrets as stored (plain strings inside the `secrets` jsonb column).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredSecrets {
    mercadopago_access_token: Option<String>,
    mercadopago_webhook_secret: Option<String>,
    resend_api_key: Option<String>,
    meta_access_token: Option<String>,
    ga4_property_id: Option<String>,
}

impl From<StoredSecrets> for TenantSecrets {
    fn from(raw: StoredSecrets) -> Self {
        Self {
            mercadopago_access_token: raw.mercadopago_access_token.map(SecretString::from),
            mercadopago_webhook_secret: raw.mercadopago_webhook_secret.map(SecretString::from),
            resend_api_key: raw.resend_api_key.map(SecretString::from),
            meta_access_token: raw.meta_access_token.map(SecretString::from),
            ga4_property_id: raw.ga4_property_id.map(SecretString::from),
        }
    }
}

impl From<&TenantSecrets> for StoredSecrets {
    fn from(secrets: &TenantSecrets) -> Self {
        let expose = |s: &Option<SecretString>| s.as_ref().map(|v| v.expose_secret().to_owned());
        Self {
            mercadopago_access_token: expose(&secrets.mercadopago_access_token),
            mercadopago_webhook_secret: expose(&secrets.mercadopago_webhook_secret),
            resend_api_key: expose(&secrets.resend_api_key),
            meta_access_token: expose(&secrets.meta_access_token),
            ga4_property_id: expose(&secrets.ga4_property_id),
        }
    }
}

/// Database row type for `storefront.tenants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRow {
    pub id: TenantId,
    pub slug: String,
    pub name: String,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub domain_aliases: Vec<String>,
    #[serde(default)]
    pub theme: ThemeTokens,
    #[serde(default)]
    pub analytics: AnalyticsIds,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub seo: SeoMetadata,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    secrets: StoredSecrets,
    pub currency: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub business_hours: Value,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A storefront tenant (domain type).
#[derive(Debug, Clone)]
pub struct Tenant {
    /// Immutable identity.
    pub id: TenantId,
    /// Unique human-readable key.
    pub slug: String,
    pub name: String,
    /// Unique label under the platform root, lowercase.
    pub subdomain: Option<String>,
    /// Unique primary custom domain, lowercase.
    pub custom_domain: Option<String>,
    /// Extra custom domains that serve the same tenant.
    pub domain_aliases: Vec<String>,
    pub theme: ThemeTokens,
    pub analytics: AnalyticsIds,
    pub contact: ContactInfo,
    pub seo: SeoMetadata,
    pub social_links: SocialLinks,
    pub secrets: TenantSecrets,
    pub currency: String,
    pub locale: String,
    pub timezone: String,
    pub business_hours: Value,
    pub is_active: bool,
}

fn normalise_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            subdomain: row.subdomain.as_deref().map(normalise_domain),
            custom_domain: row.custom_domain.as_deref().map(normalise_domain),
            domain_aliases: row.domain_aliases.iter().map(|d| normalise_domain(d)).collect(),
            theme: row.theme,
            analytics: row.analytics,
            contact: row.contact,
            seo: row.seo,
            social_links: row.social_links,
            secrets: row.secrets.into(),
            currency: row.currency.unwrap_or_else(|| "ARS".to_owned()),
            locale: row.locale.unwrap_or_else(|| "es_AR".to_owned()),
            timezone: row
                .timezone
                .unwrap_or_else(|| "America/Argentina/Buenos_Aires".to_owned()),
            business_hours: row.business_hours,
            is_active: row.is_active,
        }
    }
}

impl From<&Tenant> for TenantRow {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            slug: tenant.slug.clone(),
            name: tenant.name.clone(),
            subdomain: tenant.subdomain.clone(),
            custom_domain: tenant.custom_domain.clone(),
            domain_aliases: tenant.domain_aliases.clone(),
            theme: tenant.theme.clone(),
            analytics: tenant.analytics.clone(),
            contact: tenant.contact.clone(),
            seo: tenant.seo.clone(),
            social_links: tenant.social_links.clone(),
            secrets: (&tenant.secrets).into(),
            currency: Some(tenant.currency.clone()),
            locale: Some(tenant.locale.clone()),
            timezone: Some(tenant.timezone.clone()),
            business_hours: tenant.business_hours.clone(),
            is_active: tenant.is_active,
            created_at: None,
        }
    }
}

impl Tenant {
    /// A tenant with platform defaults for everything but identity.
    #[must_use]
    pub fn new(id: TenantId, slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            subdomain: None,
            custom_domain: None,
            domain_aliases: Vec::new(),
            theme: ThemeTokens::default(),
            analytics: AnalyticsIds::default(),
            contact: ContactInfo::default(),
            seo: SeoMetadata::default(),
            social_links: SocialLinks::default(),
            secrets: TenantSecrets::default(),
            currency: "ARS".to_owned(),
            locale: "es_AR".to_owned(),
            timezone: "America/Argentina/Buenos_Aires".to_owned(),
            business_hours: Value::Object(serde_json::Map::new()),
            is_active: true,
        }
    }

    /// The last-resort tenant used when the registry lacks the default slug.
    #[must_use]
    pub fn builtin_default(slug: &str) -> Self {
        let mut tenant = Self::new(TenantId::builtin_default(), slug, "Pinteya");
        tenant.subdomain = Some(slug.to_ascii_lowercase());
        tenant
    }

    #[must_use]
    pub fn with_subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = Some(normalise_domain(subdomain));
        self
    }

    #[must_use]
    pub fn with_custom_domain(mut self, domain: &str) -> Self {
        self.custom_domain = Some(normalise_domain(domain));
        self
    }

    #[must_use]
    pub fn with_alias(mut self, domain: &str) -> Self {
        self.domain_aliases.push(normalise_domain(domain));
        self
    }

    #[must_use]
    pub const fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Decode a row returned by the persistence client.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the row does not have the tenant shape.
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<TenantRow>(Value::Object(row)).map(Self::from)
    }

    /// Encode for storage. Contains secrets; never send this to a client.
    ///
    /// # Errors
    ///
    /// Returns the serde error if a field cannot be encoded.
    pub fn to_row(&self) -> Result<Row, serde_json::Error> {
        match serde_json::to_value(TenantRow::from(self))? {
            Value::Object(map) => Ok(map),
            _ => Ok(Row::new()),
        }
    }

    /// Every custom domain this tenant answers on.
    pub fn custom_domains(&self) -> impl Iterator<Item = &str> {
        self.custom_domain
            .iter()
            .chain(self.domain_aliases.iter())
            .map(String::as_str)
    }

    /// Canonical public URL of the storefront.
    #[must_use]
    pub fn base_url(&self, platform_root: &str) -> String {
        if let Some(domain) = &self.custom_domain {
            format!("https://{domain}")
        } else if let Some(subdomain) = &self.subdomain {
            format!("https://{subdomain}.{platform_root}")
        } else {
            format!("https://{platform_root}")
        }
    }

    /// The domain a request for this tenant is served on.
    #[must_use]
    pub fn primary_domain(&self, platform_root: &str) -> String {
        self.custom_domain.clone().unwrap_or_else(|| {
            self.subdomain.as_ref().map_or_else(
                || platform_root.to_owned(),
                |s| format!("{s}.{platform_root}"),
            )
        })
    }
}

/// Restricted projection of [`Tenant`] that is safe for untrusted contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicTenantConfig {
    pub id: TenantId,
    pub slug: String,
    pub name: String,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    pub base_url: String,
    pub theme: ThemeTokens,
    pub analytics: AnalyticsIds,
    pub contact: ContactInfo,
    pub seo: SeoMetadata,
    pub social_links: SocialLinks,
    pub currency: String,
    pub locale: String,
    pub business_hours: Value,
}

impl PublicTenantConfig {
    #[must_use]
    pub fn project(tenant: &Tenant, platform_root: &str) -> Self {
        Self {
            id: tenant.id,
            slug: tenant.slug.clone(),
            name: tenant.name.clone(),
            subdomain: tenant.subdomain.clone(),
            custom_domain: tenant.custom_domain.clone(),
            base_url: tenant.base_url(platform_root),
            theme: tenant.theme.clone(),
            analytics: tenant.analytics.clone(),
            contact: tenant.contact.clone(),
            seo: tenant.seo.clone(),
            social_links: tenant.social_links.clone(),
            currency: tenant.currency.clone(),
            locale: tenant.locale.clone(),
            business_hours: tenant.business_hours.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stored_row() -> Row {
        let value = json!({
            "id": "7a0c6f52-2d1e-4c55-9a63-0c1a4e1f2b3d",
            "slug": "pintemas",
            "name": "Pintemas",
            "subdomain": "Pintemas",
            "custom_domain": "www.Pintemas.com.",
            "domain_aliases": ["www.pintemas.com.ar"],
            "theme": {"primary_color": "#0055aa"},
            "analytics": {"ga4_measurement_id": "G-123", "meta_pixel_id": "999"},
            "secrets": {
                "mercadopago_access_token": "APP_USR-live-token",
                "meta_access_token": "EAAB-meta-token",
                "ga4_property_id": "properties/42"
            },
            "currency": null,
            "locale": null,
            "timezone": null,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00+00:00"
        });
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn test_from_row_applies_defaults_and_normalises() {
        let tenant = Tenant::from_row(stored_row()).unwrap();
        assert_eq!(tenant.subdomain.as_deref(), Some("pintemas"));
        assert_eq!(tenant.custom_domain.as_deref(), Some("www.pintemas.com"));
        assert_eq!(tenant.theme.primary_color, "#0055aa");
        assert_eq!(tenant.theme.secondary_color, "#007638");
        assert_eq!(tenant.currency, "ARS");
        assert_eq!(tenant.contact.country, "Argentina");
    }

    #[test]
    fn test_public_config_has_no_secrets() {
        let tenant = Tenant::from_row(stored_row()).unwrap();
        let public = PublicTenantConfig::project(&tenant, "pintureriadigital.com");
        let json = serde_json::to_string(&public).unwrap();

        assert!(json.contains("G-123"));
        assert!(json.contains("999"));
        assert!(!json.contains("APP_USR-live-token"));
        assert!(!json.contains("EAAB-meta-token"));
        assert!(!json.contains("properties/42"));
        assert!(!json.contains("secrets"));
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let tenant = Tenant::from_row(stored_row()).unwrap();
        let debug = format!("{tenant:?}");
        assert!(!debug.contains("APP_USR-live-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_base_url_precedence() {
        let root = "pintureriadigital.com";
        let bare = Tenant::new(TenantId::generate(), "bare", "Bare");
        assert_eq!(bare.base_url(root), "https://pintureriadigital.com");

        let sub = bare.clone().with_subdomain("bare");
        assert_eq!(sub.base_url(root), "https://bare.pintureriadigital.com");

        let custom = sub.with_custom_domain("www.bare.com");
        assert_eq!(custom.base_url(root), "https://www.bare.com");
    }

    #[test]
    fn test_row_round_trip_keeps_secrets_for_storage() {
        let tenant = Tenant::from_row(stored_row()).unwrap();
        let row = tenant.to_row().unwrap();
        assert_eq!(
            row["secrets"]["mercadopago_access_token"],
            json!("APP_USR-live-token")
        );
        let back = Tenant::from_row(row).unwrap();
        assert_eq!(back.id, tenant.id);
        assert_eq!(back.domain_aliases, tenant.domain_aliases);
    }
}
