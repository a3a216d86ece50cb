//! Tenant-scoped repository over the generic query client.

use std::marker::PhantomData;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::db::{Predicate, QueryClient, QueryOptions, Row, Write};

use super::{ScopeError, TenantOwned, TenantScope};

const TENANT_COLUMN: &str = "tenant_id";
const ID_COLUMN: &str = "id";

/// Rows touched by an update or delete.
///
/// Zero means the id does not exist or belongs to another tenant; the two
/// are deliberately indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affected(pub u64);

impl Affected {
    /// Whether any row was touched.
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 > 0
    }
}

/// Repository for one tenant-owned collection, bound to one tenant.
///
/// Every statement it issues carries `tenant_id = <scope>`; callers cannot
/// remove or override that predicate.
pub struct ScopedRepository<'a, T> {
    client: &'a dyn QueryClient,
    scope: TenantScope,
    _rows: PhantomData<fn() -> T>,
}

impl<'a, T: TenantOwned> ScopedRepository<'a, T> {
    /// Create a repository for `T` in `scope`.
    #[must_use]
    pub fn new(client: &'a dyn QueryClient, scope: TenantScope) -> Self {
        const {
            assert!(
                T::COLLECTION.is_tenant_owned(),
                "ScopedRepository requires a tenant-owned collection"
            );
        }
        Self {
            client,
            scope,
            _rows: PhantomData,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> TenantScope {
        self.scope
    }

    /// List rows matching `filters` within this tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the query fails and
    /// `ScopeError::IsolationViolation` if a foreign row comes back.
    #[instrument(skip(self, filters, options), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn list(
        &self,
        filters: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<T>, ScopeError> {
        let predicates = self.scoped(filters);
        let rows = self
            .client
            .select(T::COLLECTION, &predicates, options)
            .await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Fetch one row by id. A row of another tenant yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the query fails.
    #[instrument(skip(self), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn get(&self, id: T::Id) -> Result<Option<T>, ScopeError> {
        let predicates = self.scoped(&[Predicate::eq(ID_COLUMN, id)]);
        let options = QueryOptions {
            limit: Some(1),
            ..QueryOptions::default()
        };
        let rows = self
            .client
            .select(T::COLLECTION, &predicates, &options)
            .await?;
        rows.into_iter().next().map(|row| self.decode(row)).transpose()
    }

    /// Insert a row. The tenant id is always taken from the scope.
    ///
    /// A missing `id` is generated and a missing `created_at` is set to now.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` (including `QueryError::Conflict`) if the
    /// write fails.
    #[instrument(skip(self, payload), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn insert<P: Serialize + Sync>(&self, payload: &P) -> Result<T, ScopeError> {
        let row = self.prepare_insert(payload)?;
        let stored = self.client.insert(T::COLLECTION, row).await?;
        self.decode(stored)
    }

    /// Build an insert for an atomic batch, with the same tenant rules as
    /// [`Self::insert`]. Decode the stored row with [`Self::decode`].
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::DataCorruption` if the payload is not an object.
    pub fn stage_insert<P: Serialize>(&self, payload: &P) -> Result<Write, ScopeError> {
        Ok(Write::Insert {
            collection: T::COLLECTION,
            row: self.prepare_insert(payload)?,
        })
    }

    fn prepare_insert<P: Serialize>(&self, payload: &P) -> Result<Row, ScopeError> {
        let mut row = to_row(payload)?;
        let tenant = serde_json::to_value(self.scope.tenant_id())?;

        if let Some(supplied) = row.get(TENANT_COLUMN)
            && *supplied != tenant
        {
            tracing::warn!(supplied = %supplied, "discarding client-supplied tenant_id on insert");
        }
        row.insert(TENANT_COLUMN.to_owned(), tenant);

        if row.get(ID_COLUMN).is_none_or(Value::is_null) {
            row.insert(
                ID_COLUMN.to_owned(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        if row.get("created_at").is_none_or(Value::is_null) {
            row.insert("created_at".to_owned(), serde_json::to_value(Utc::now())?);
        }
        Ok(row)
    }

    /// Apply `patch` to the row with `id` in this tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the write fails.
    #[instrument(skip(self, patch), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn update<P: Serialize + Sync>(
        &self,
        id: T::Id,
        patch: &P,
    ) -> Result<Affected, ScopeError> {
        self.update_where(&[Predicate::eq(ID_COLUMN, id)], patch)
            .await
    }

    /// Apply `patch` to every row matching `filters` in this tenant.
    ///
    /// `tenant_id` and `id` keys in the patch are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the write fails.
    #[instrument(skip(self, filters, patch), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn update_where<P: Serialize + Sync>(
        &self,
        filters: &[Predicate],
        patch: &P,
    ) -> Result<Affected, ScopeError> {
        let mut patch = to_row(patch)?;
        for key in [TENANT_COLUMN, ID_COLUMN] {
            if patch.remove(key).is_some() {
                tracing::warn!(column = key, "dropping immutable column from patch");
            }
        }

        let predicates = self.scoped(filters);
        if patch.is_empty() {
            let matched = self
                .client
                .select(T::COLLECTION, &predicates, &QueryOptions::default())
                .await?;
            return Ok(Affected(matched.len() as u64));
        }

        let count = self
            .client
            .update(T::COLLECTION, &predicates, patch)
            .await?;
        Ok(Affected(count))
    }

    /// Delete the row with `id` in this tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the write fails.
    #[instrument(skip(self), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn delete(&self, id: T::Id) -> Result<Affected, ScopeError> {
        self.delete_where(&[Predicate::eq(ID_COLUMN, id)]).await
    }

    /// Delete every row matching `filters` in this tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Query` if the write fails.
    #[instrument(skip(self, filters), fields(collection = %T::COLLECTION, tenant_id = %self.scope.tenant_id()))]
    pub async fn delete_where(&self, filters: &[Predicate]) -> Result<Affected, ScopeError> {
        let predicates = self.scoped(filters);
        let count = self.client.delete(T::COLLECTION, &predicates).await?;
        Ok(Affected(count))
    }

    /// Build a tenant-scoped delete for an atomic batch.
    #[must_use]
    pub fn stage_delete_where(&self, filters: &[Predicate]) -> Write {
        Write::Delete {
            collection: T::COLLECTION,
            predicates: self.scoped(filters),
        }
    }

    /// Caller filters plus the mandatory tenant predicate.
    fn scoped(&self, filters: &[Predicate]) -> Vec<Predicate> {
        let mut predicates: Vec<Predicate> = filters
            .iter()
            .filter(|p| {
                let is_tenant = p.column() == TENANT_COLUMN;
                if is_tenant {
                    tracing::warn!(
                        collection = %T::COLLECTION,
                        "ignoring caller-supplied tenant_id filter"
                    );
                }
                !is_tenant
            })
            .cloned()
            .collect();
        predicates.push(Predicate::eq(TENANT_COLUMN, self.scope.tenant_id()));
        predicates
    }

    /// Decode a stored row, refusing rows of any other tenant.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::IsolationViolation` for a foreign row and
    /// `ScopeError::DataCorruption` if the row does not decode.
    pub fn decode(&self, row: Row) -> Result<T, ScopeError> {
        let value: T = serde_json::from_value(Value::Object(row))?;
        let found = value.tenant_id();
        if found != self.scope.tenant_id() {
            tracing::error!(
                collection = %T::COLLECTION,
                expected = %self.scope.tenant_id(),
                found = %found,
                "query returned a row of another tenant"
            );
            sentry::capture_message("Cross-tenant row returned", sentry::Level::Fatal);
            return Err(ScopeError::IsolationViolation {
                expected: self.scope.tenant_id(),
                found,
            });
        }
        Ok(value)
    }
}

fn to_row<P: Serialize>(payload: &P) -> Result<Row, ScopeError> {
    match serde_json::to_value(payload)? {
        Value::Object(row) => Ok(row),
        other => Err(ScopeError::DataCorruption(format!(
            "payload must serialize to an object, got {other}"
        ))),
    }
}
