//! Privileged service mode for platform jobs.
//!
//! [`ServiceScope`] reads tenant-owned tables without a tenant predicate.
//! It is only constructible by presenting the configured service token, and
//! nothing in the HTTP surface does that: the operator CLI is its only caller.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use paintstore_core::TenantId;

use crate::db::{Predicate, QueryClient, QueryOptions};
use crate::models::Order;

use super::{ScopeError, TenantOwned};

/// The configured service token, kept only as its digest.
pub struct ServiceCredential {
    digest: [u8; 32],
}

impl ServiceCredential {
    #[must_use]
    pub fn new(token: &SecretString) -> Self {
        Self {
            digest: digest(token),
        }
    }

    fn matches(&self, presented: &SecretString) -> bool {
        let presented = digest(presented);
        self.digest
            .iter()
            .zip(presented.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential").finish_non_exhaustive()
    }
}

fn digest(token: &SecretString) -> [u8; 32] {
    Sha256::digest(token.expose_secret().as_bytes()).into()
}

/// Authorisation to read across tenants, for one named job.
#[derive(Debug)]
pub struct ServiceScope {
    job: String,
}

impl ServiceScope {
    /// Authorise `job` with a presented token.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::ServiceDenied` if service mode is not configured
    /// or the token does not match.
    pub fn authorize(
        job: &str,
        presented: &SecretString,
        expected: Option<&ServiceCredential>,
    ) -> Result<Self, ScopeError> {
        let Some(expected) = expected else {
            tracing::warn!(job, "service mode requested but no service token is configured");
            return Err(ScopeError::ServiceDenied("service mode disabled".to_owned()));
        };
        if !expected.matches(presented) {
            tracing::warn!(job, "service token rejected");
            return Err(ScopeError::ServiceDenied("invalid service token".to_owned()));
        }
        tracing::info!(job, "service scope granted");
        Ok(Self {
            job: job.to_owned(),
        })
    }

    #[must_use]
    pub fn job(&self) -> &str {
        &self.job
    }
}

/// Per-tenant order figures for the platform report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantOrderTotals {
    pub tenant_id: TenantId,
    pub orders: u64,
    pub revenue: Decimal,
}

/// Cross-tenant reads under a [`ServiceScope`].
pub struct PlatformRepository<'a> {
    client: &'a dyn QueryClient,
    scope: &'a ServiceScope,
}

impl<'a> PlatformRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a dyn QueryClient, scope: &'a ServiceScope) -> Self {
        Self { client, scope }
    }

    /// Rows of `T` across every tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the query fails.
    pub async fn list_all<T: TenantOwned>(
        &self,
        filters: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<T>, ScopeError> {
        tracing::info!(job = self.scope.job(), collection = %T::COLLECTION, "unscoped platform read");
        let rows = self.client.select(T::COLLECTION, filters, options).await?;
        rows.into_iter()
            .map(|row| -> Result<T, ScopeError> { Ok(serde_json::from_value(Value::Object(row))?) })
            .collect()
    }

    /// Order count and revenue per tenant, ordered by tenant id.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the query fails.
    pub async fn order_totals_by_tenant(&self) -> Result<Vec<TenantOrderTotals>, ScopeError> {
        let orders: Vec<Order> = self.list_all(&[], &QueryOptions::default()).await?;

        let mut totals: BTreeMap<TenantId, TenantOrderTotals> = BTreeMap::new();
        for order in orders {
            let entry = totals
                .entry(order.tenant_id)
                .or_insert_with(|| TenantOrderTotals {
                    tenant_id: order.tenant_id,
                    orders: 0,
                    revenue: Decimal::ZERO,
                });
            entry.orders += 1;
            entry.revenue += order.total;
        }
        Ok(totals.into_values().collect())
    }
}
