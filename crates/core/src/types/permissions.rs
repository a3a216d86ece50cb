//! Fixed-shape permission matrix for tenant staff.
//!
//! Every (domain, capability) pair is a concrete boolean field. A missing
//! field in stored JSON deserializes to `false`, never to "allowed".

use serde::{Deserialize, Serialize};

/// Administrative area a capability applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Orders,
    Products,
    Customers,
    Analytics,
    Settings,
    Integrations,
    Marketing,
}

impl Domain {
    /// All domains, in matrix order.
    pub const ALL: [Self; 7] = [
        Self::Orders,
        Self::Products,
        Self::Customers,
        Self::Analytics,
        Self::Settings,
        Self::Integrations,
        Self::Marketing,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Customers => "customers",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
            Self::Integrations => "integrations",
            Self::Marketing => "marketing",
        };
        f.write_str(name)
    }
}

/// Action a principal may perform within a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Create,
    Edit,
    Delete,
    Export,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Export => "export",
        };
        f.write_str(name)
    }
}

/// Capabilities granted within a single domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct CapabilitySet {
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub export: bool,
}

impl CapabilitySet {
    /// Every capability granted.
    pub const FULL: Self = Self {
        view: true,
        create: true,
        edit: true,
        delete: true,
        export: true,
    };

    /// Nothing granted.
    pub const NONE: Self = Self {
        view: false,
        create: false,
        edit: false,
        delete: false,
        export: false,
    };

    /// Read-only access.
    pub const VIEW_ONLY: Self = Self {
        view: true,
        ..Self::NONE
    };

    /// Whether `capability` is granted.
    #[must_use]
    pub const fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.view,
            Capability::Create => self.create,
            Capability::Edit => self.edit,
            Capability::Delete => self.delete,
            Capability::Export => self.export,
        }
    }
}

/// Per-domain capability flags held by a role assignment.
///
/// `Default` is the all-false matrix of a plain customer.
///
/// ```
/// use paintstore_core::{Capability, Domain, PermissionMatrix};
///
/// let matrix: PermissionMatrix =
///     serde_json::from_str(r#"{"orders": {"view": true}}"#).unwrap();
/// assert!(matrix.allows(Domain::Orders, Capability::View));
/// assert!(!matrix.allows(Domain::Orders, Capability::Delete));
/// assert!(!matrix.allows(Domain::Settings, Capability::View));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionMatrix {
    pub orders: CapabilitySet,
    pub products: CapabilitySet,
    pub customers: CapabilitySet,
    pub analytics: CapabilitySet,
    pub settings: CapabilitySet,
    pub integrations: CapabilitySet,
    pub marketing: CapabilitySet,
}

impl PermissionMatrix {
    /// The implicit matrix of a super admin.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            orders: CapabilitySet::FULL,
            products: CapabilitySet::FULL,
            customers: CapabilitySet::FULL,
            analytics: CapabilitySet::FULL,
            settings: CapabilitySet::FULL,
            integrations: CapabilitySet::FULL,
            marketing: CapabilitySet::FULL,
        }
    }

    /// The matrix of a principal without standing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            orders: CapabilitySet::NONE,
            products: CapabilitySet::NONE,
            customers: CapabilitySet::NONE,
            analytics: CapabilitySet::NONE,
            settings: CapabilitySet::NONE,
            integrations: CapabilitySet::NONE,
            marketing: CapabilitySet::NONE,
        }
    }

    /// Capabilities for one domain.
    #[must_use]
    pub const fn domain(&self, domain: Domain) -> &CapabilitySet {
        match domain {
            Domain::Orders => &self.orders,
            Domain::Products => &self.products,
            Domain::Customers => &self.customers,
            Domain::Analytics => &self.analytics,
            Domain::Settings => &self.settings,
            Domain::Integrations => &self.integrations,
            Domain::Marketing => &self.marketing,
        }
    }

    /// Mutable capabilities for one domain.
    pub const fn domain_mut(&mut self, domain: Domain) -> &mut CapabilitySet {
        match domain {
            Domain::Orders => &mut self.orders,
            Domain::Products => &mut self.products,
            Domain::Customers => &mut self.customers,
            Domain::Analytics => &mut self.analytics,
            Domain::Settings => &mut self.settings,
            Domain::Integrations => &mut self.integrations,
            Domain::Marketing => &mut self.marketing,
        }
    }

    /// Whether `capability` is granted in `domain`.
    #[must_use]
    pub const fn allows(&self, domain: Domain, capability: Capability) -> bool {
        self.domain(domain).allows(capability)
    }

    /// Whether any capability at all is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Domain::ALL
            .iter()
            .all(|d| *self.domain(*d) == CapabilitySet::NONE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        assert_eq!(PermissionMatrix::default(), PermissionMatrix::none());
        assert!(PermissionMatrix::default().is_empty());
    }

    #[test]
    fn test_full_allows_everything() {
        let full = PermissionMatrix::full();
        for domain in Domain::ALL {
            for cap in [
                Capability::View,
                Capability::Create,
                Capability::Edit,
                Capability::Delete,
                Capability::Export,
            ] {
                assert!(full.allows(domain, cap), "{domain}.{cap}");
            }
        }
    }

    #[test]
    fn test_missing_fields_deny() {
        let matrix: PermissionMatrix =
            serde_json::from_str(r#"{"orders": {"view": true, "edit": true}}"#).unwrap();
        assert!(matrix.allows(Domain::Orders, Capability::Edit));
        assert!(!matrix.allows(Domain::Orders, Capability::Delete));
        assert!(!matrix.allows(Domain::Marketing, Capability::View));
    }

    #[test]
    fn test_unknown_domain_keys_are_ignored() {
        let matrix: PermissionMatrix =
            serde_json::from_str(r#"{"everything": {"view": true}}"#).unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_domain_mut() {
        let mut matrix = PermissionMatrix::none();
        matrix.domain_mut(Domain::Analytics).export = true;
        assert!(matrix.allows(Domain::Analytics, Capability::Export));
        assert!(!matrix.is_empty());
    }
}
