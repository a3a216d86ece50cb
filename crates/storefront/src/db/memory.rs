//! In-process [`QueryClient`] used by tests and local demos.
//!
//! Mirrors the `PostgreSQL` client's observable behaviour: unique keys are
//! enforced, `adjust` is atomic and never goes below zero, statements and
//! batches are all-or-nothing, and predicates are applied verbatim with no
//! knowledge of tenants.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::query::{
    Adjustment, BatchOutcome, Collection, Direction, Predicate, QueryClient, QueryError,
    QueryOptions, Row, Write, WriteResult,
};

/// Shared-table store held in memory.
#[derive(Debug, Default)]
pub struct MemoryQueryClient {
    store: Mutex<Store>,
}

#[derive(Debug, Default, Clone)]
struct Store {
    tables: HashMap<Collection, Vec<Row>>,
    failing: HashSet<Collection>,
}

impl MemoryQueryClient {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of a collection, unfiltered.
    pub async fn snapshot(&self, collection: Collection) -> Vec<Row> {
        self.store
            .lock()
            .await
            .tables
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every later write to `collection` fail with
    /// [`QueryError::Unavailable`]. Reads keep working.
    pub async fn fail_writes_to(&self, collection: Collection) {
        self.store.lock().await.failing.insert(collection);
    }
}

fn matches_all(row: &Row, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(row))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Find a unique key that `candidate` would duplicate among `rows`.
fn conflicting_key(
    collection: Collection,
    rows: &[Row],
    candidate: &Row,
    skip: Option<usize>,
) -> Option<String> {
    let id_key: &[&str] = &["id"];
    std::iter::once(id_key)
        .chain(collection.unique_keys().iter().copied())
        .find(|key| {
            let values: Vec<&Value> = key
                .iter()
                .map(|c| candidate.get(*c).unwrap_or(&Value::Null))
                .collect();
            if values.iter().any(|v| v.is_null()) {
                return false;
            }
            rows.iter().enumerate().any(|(i, existing)| {
                Some(i) != skip
                    && key
                        .iter()
                        .zip(&values)
                        .all(|(c, v)| existing.get(*c) == Some(*v))
            })
        })
        .map(|key| format!("{}_{}_key", collection.table(), key.join("_")))
}

impl Store {
    fn writable(&self, collection: Collection) -> Result<(), QueryError> {
        if self.failing.contains(&collection) {
            return Err(QueryError::Unavailable(format!(
                "writes to {collection} are failing"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, collection: Collection, row: Row) -> Result<Row, QueryError> {
        self.writable(collection)?;
        let rows = self.tables.entry(collection).or_default();
        if let Some(key) = conflicting_key(collection, rows, &row, None) {
            return Err(QueryError::Conflict(key));
        }
        rows.push(row.clone());
        Ok(row)
    }

    /// Patch every matching row; unique keys are checked against the
    /// statement's final state before anything is kept.
    fn update(
        &mut self,
        collection: Collection,
        predicates: &[Predicate],
        patch: &Row,
    ) -> Result<u64, QueryError> {
        self.writable(collection)?;
        let Some(rows) = self.tables.get_mut(&collection) else {
            return Ok(0);
        };

        let mut next = rows.clone();
        let mut touched = Vec::with_capacity(next.len());
        for row in &mut next {
            let hit = matches_all(row, predicates);
            if hit {
                row.extend(patch.clone());
            }
            touched.push(hit);
        }
        for (i, (row, hit)) in next.iter().zip(&touched).enumerate() {
            if *hit && let Some(key) = conflicting_key(collection, &next, row, Some(i)) {
                return Err(QueryError::Conflict(key));
            }
        }

        *rows = next;
        Ok(touched.iter().filter(|hit| **hit).count() as u64)
    }

    fn delete(&mut self, collection: Collection, predicates: &[Predicate]) -> Result<u64, QueryError> {
        self.writable(collection)?;
        let Some(rows) = self.tables.get_mut(&collection) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches_all(r, predicates));
        Ok((before - rows.len()) as u64)
    }

    fn adjust(
        &mut self,
        collection: Collection,
        predicates: &[Predicate],
        column: &'static str,
        delta: i64,
    ) -> Result<Adjustment, QueryError> {
        self.writable(collection)?;
        let Some(row) = self
            .tables
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|r| matches_all(r, predicates)))
        else {
            return Ok(Adjustment::NoMatch);
        };

        let current = row.get(column).and_then(Value::as_i64).unwrap_or(0);
        let Some(next) = current.checked_add(delta) else {
            return Err(QueryError::Conflict(format!(
                "{}_{column}_overflow",
                collection.table()
            )));
        };
        if next < 0 {
            return Ok(Adjustment::Insufficient);
        }
        row.insert(column.to_owned(), Value::from(next));
        Ok(Adjustment::Applied(next))
    }
}

#[async_trait]
impl QueryClient for MemoryQueryClient {
    async fn select(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<Vec<Row>, QueryError> {
        let store = self.store.lock().await;
        let mut rows: Vec<Row> = store
            .tables
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_all(r, predicates))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(store);

        if let Some((column, direction)) = options.order_by {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(column), b.get(column));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(0);
        let limit = options
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, QueryError> {
        self.store.lock().await.insert(collection, row)
    }

    async fn update(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<u64, QueryError> {
        self.store.lock().await.update(collection, predicates, &patch)
    }

    async fn delete(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<u64, QueryError> {
        self.store.lock().await.delete(collection, predicates)
    }

    async fn adjust(
        &self,
        collection: Collection,
        predicates: &[Predicate],
        column: &'static str,
        delta: i64,
    ) -> Result<Adjustment, QueryError> {
        self.store
            .lock()
            .await
            .adjust(collection, predicates, column, delta)
    }

    async fn apply_batch(&self, writes: Vec<Write>) -> Result<BatchOutcome, QueryError> {
        let mut store = self.store.lock().await;
        // Work on a copy; the live tables are replaced only once every write
        // has applied.
        let mut staged = store.clone();
        let mut results = Vec::with_capacity(writes.len());

        for (index, write) in writes.into_iter().enumerate() {
            let result = match write {
                Write::Insert { collection, row } => {
                    WriteResult::Inserted(staged.insert(collection, row)?)
                }
                Write::Delete {
                    collection,
                    predicates,
                } => WriteResult::Deleted(staged.delete(collection, &predicates)?),
                Write::Adjust {
                    collection,
                    predicates,
                    column,
                    delta,
                } => match staged.adjust(collection, &predicates, column, delta)? {
                    Adjustment::Applied(value) => WriteResult::Adjusted(value),
                    adjustment => return Ok(BatchOutcome::Refused { index, adjustment }),
                },
            };
            results.push(result);
        }

        *store = staged;
        Ok(BatchOutcome::Committed(results))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(())
    }
}
