//! `PostgreSQL` implementation of [`QueryClient`].
//!
//! Rows travel as `jsonb`: selects return `to_jsonb(t)` and writes go through
//! `jsonb_populate_record`, so one client serves every table without
//! per-table SQL. Each statement (or batch) runs in its own transaction with
//! `app.tenant_id` set when it is tenant-bound, which lets the row-level
//! security policies in the migrations act as a second fence.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};

use super::query::{
    Adjustment, BatchOutcome, Collection, Direction, Predicate, QueryClient, QueryError,
    QueryOptions, Row, Write, WriteResult,
};

/// Query client backed by a shared `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgQueryClient {
    pool: PgPool,
}

impl PgQueryClient {
    /// Create a new client.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (migrations and session store share it).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a transaction and bind the tenant setting for RLS.
    async fn begin(
        &self,
        tenant: Option<String>,
    ) -> Result<Transaction<'static, Postgres>, QueryError> {
        let mut tx = self.pool.begin().await?;
        if let Some(tenant) = tenant {
            sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
                .bind(tenant)
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }
}

/// Quote a column name after checking it is a plain identifier.
fn ident(name: &str) -> Result<String, QueryError> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    if valid_start && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        Ok(format!("\"{name}\""))
    } else {
        Err(QueryError::InvalidIdentifier(name.to_owned()))
    }
}

fn table(collection: Collection) -> String {
    format!("storefront.{}", collection.table())
}

/// The tenant a statement is bound to, if any.
fn tenant_binding(predicates: &[Predicate], row: Option<&Row>) -> Option<String> {
    predicates
        .iter()
        .find_map(|p| match p {
            Predicate::Eq("tenant_id", Value::String(id)) => Some(id.clone()),
            _ => None,
        })
        .or_else(|| {
            row.and_then(|r| r.get("tenant_id"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
}

fn push_where(
    qb: &mut QueryBuilder<'_, Postgres>,
    predicates: &[Predicate],
) -> Result<(), QueryError> {
    qb.push(" WHERE TRUE");
    for predicate in predicates {
        let column = ident(predicate.column())?;
        match predicate {
            Predicate::Eq(_, Value::Null) => {
                qb.push(format!(" AND t.{column} IS NULL"));
            }
            Predicate::Eq(_, value) => {
                qb.push(format!(" AND to_jsonb(t.{column}) = "));
                qb.push_bind(value.clone());
                qb.push("::jsonb");
            }
            Predicate::In(_, values) if values.is_empty() => {
                qb.push(" AND FALSE");
            }
            Predicate::In(_, values) => {
                qb.push(" AND ");
                qb.push_bind(Value::Array(values.clone()));
                qb.push(format!("::jsonb @> to_jsonb(t.{column})"));
            }
        }
    }
    Ok(())
}

fn into_row(value: Value) -> Result<Row, QueryError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(QueryError::Serialization(format!(
            "expected a row object, got {other}"
        ))),
    }
}

fn map_write_error(e: sqlx::Error) -> QueryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return QueryError::Conflict(db_err.constraint().unwrap_or("unique key").to_owned());
    }
    QueryError::Database(e)
}

async fn insert_on(
    conn: &mut PgConnection,
    collection: Collection,
    row: Row,
) -> Result<Row, QueryError> {
    // Only the provided columns are written so column defaults still apply.
    let columns = row
        .keys()
        .map(|column| ident(column))
        .collect::<Result<Vec<_>, _>>()?;
    let table = table(collection);

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {table} AS t ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{table}, ",
        list = columns.join(", ")
    ));
    qb.push_bind(Value::Object(row));
    qb.push(") RETURNING to_jsonb(t) AS row");

    let (stored,): (Value,) = qb
        .build_query_as()
        .fetch_one(&mut *conn)
        .await
        .map_err(map_write_error)?;
    into_row(stored)
}

async fn delete_on(
    conn: &mut PgConnection,
    collection: Collection,
    predicates: &[Predicate],
) -> Result<u64, QueryError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {} AS t", table(collection)));
    push_where(&mut qb, predicates)?;
    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn adjust_on(
    conn: &mut PgConnection,
    collection: Collection,
    predicates: &[Predicate],
    column: &'static str,
    delta: i64,
) -> Result<Adjustment, QueryError> {
    let column = ident(column)?;
    let table = table(collection);

    // The guard and the write are one statement, so two concurrent
    // decrements can never both pass the `>= 0` check on stale values.
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "UPDATE {table} AS t SET {column} = t.{column} + "
    ));
    qb.push_bind(delta);
    push_where(&mut qb, predicates)?;
    qb.push(format!(" AND t.{column} + "));
    qb.push_bind(delta);
    qb.push(format!(" >= 0 RETURNING t.{column}::bigint"));

    let applied: Option<(i64,)> = qb
        .build_query_as()
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_write_error)?;
    if let Some((value,)) = applied {
        return Ok(Adjustment::Applied(value));
    }

    let mut matching = QueryBuilder::<Postgres>::new(format!("SELECT count(*) FROM {table} t"));
    push_where(&mut matching, predicates)?;
    let (matched,): (i64,) = matching.build_query_as().fetch_one(&mut *conn).await?;
    Ok(if matched == 0 {
        Adjustment::NoMatch
    } else {
        Adjustment::Insufficient
    })
}

/// The tenant a batch is bound to: the first write that names one.
fn batch_binding(writes: &[Write]) -> Option<String> {
    writes.iter().find_map(|write| match write {
        Write::Insert { row, .. } => tenant_binding(&[], Some(row)),
        Write::Delete { predicates, .. } | Write::Adjust { predicates, .. } => {
            tenant_binding(predicates, None)
        }
    })
}

#[async_trait]
impl QueryClient for PgQueryClient {
    async fn select(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<Row>, QueryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT to_jsonb(t) AS row FROM {} t",
            table(collection)
        ));
        push_where(&mut qb, predicates)?;
        if let Some((column, direction)) = options.order_by {
            let dir = match direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            qb.push(format!(" ORDER BY t.{} {dir}", ident(column)?));
        }
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        if let Some(offset) = options.offset {
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let mut tx = self.begin(tenant_binding(predicates, None)).await?;
        let rows: Vec<(Value,)> = qb.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        rows.into_iter().map(|(value,)| into_row(value)).collect()
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, QueryError> {
        let mut tx = self.begin(tenant_binding(&[], Some(&row))).await?;
        let stored = insert_on(&mut *tx, collection, row).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn update(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<u64, QueryError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let assignments = patch
            .keys()
            .map(|column| ident(column).map(|c| format!("{c} = r.{c}")))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let table = table(collection);
        let tenant = tenant_binding(predicates, None);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {table} AS t SET {assignments} FROM jsonb_populate_record(NULL::{table}, "
        ));
        qb.push_bind(Value::Object(patch));
        qb.push(") AS r");
        push_where(&mut qb, predicates)?;

        let mut tx = self.begin(tenant).await?;
        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn delete(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<u64, QueryError> {
        let mut tx = self.begin(tenant_binding(predicates, None)).await?;
        let count = delete_on(&mut *tx, collection, predicates).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn adjust(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        column: &'static str,
        delta: i64,
    ) -> Result<Adjustment, QueryError> {
        let mut tx = self.begin(tenant_binding(predicates, None)).await?;
        let outcome = adjust_on(&mut *tx, collection, predicates, column, delta).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn apply_batch(&self, writes: Vec<Write>) -> Result<BatchOutcome, QueryError> {
        // An early return or a cancelled future drops `tx` uncommitted, which
        // rolls every earlier write back.
        let mut tx = self.begin(batch_binding(&writes)).await?;
        let mut results = Vec::with_capacity(writes.len());

        for (index, write) in writes.into_iter().enumerate() {
            let result = match write {
                Write::Insert { collection, row } => {
                    WriteResult::Inserted(insert_on(&mut *tx, collection, row).await?)
                }
                Write::Delete {
                    collection,
                    predicates,
                } => WriteResult::Deleted(delete_on(&mut *tx, collection, &predicates).await?),
                Write::Adjust {
                    collection,
                    predicates,
                    column,
                    delta,
                } => match adjust_on(&mut *tx, collection, &predicates, column, delta).await? {
                    Adjustment::Applied(value) => WriteResult::Adjusted(value),
                    adjustment => {
                        tx.rollback().await?;
                        return Ok(BatchOutcome::Refused { index, adjustment });
                    }
                },
            };
            results.push(result);
        }

        tx.commit().await?;
        Ok(BatchOutcome::Committed(results))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
