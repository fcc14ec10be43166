use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::live::{ChangeEvent, ChangeFeedHub, ChangeOp};
use crate::store::{SelectQuery, SortDirection, StoreError, TableStore};
use crate::tables::Table;

/// In-memory table store.
///
/// Behaves like the hosted backend for tests and local tooling: rows live in
/// per-table vectors, and every mutation publishes a change event on the
/// attached hub, so live subscriptions observe writes end-to-end without a
/// database.
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    feed: ChangeFeedHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_feed(ChangeFeedHub::default())
    }

    pub fn with_feed(feed: ChangeFeedHub) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            feed,
        }
    }

    pub fn feed(&self) -> ChangeFeedHub {
        self.feed.clone()
    }

    /// Load rows without emitting change events. Test fixture path.
    pub async fn seed(&self, table: Table, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(table).or_default().extend(rows);
    }

    fn project(row: &Value, columns: &[String]) -> Value {
        let mut out = Map::new();
        if let Value::Object(map) = row {
            for column in columns {
                if let Some(v) = map.get(column) {
                    out.insert(column.clone(), v.clone());
                }
            }
        }
        Value::Object(out)
    }

    fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
        let left = a.get(column);
        let right = b.get(column);
        match (left, right) {
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(Value::Number(x)), Some(Value::Number(y))) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
            // Missing/null sorts before any present value.
            (Some(Value::Null) | None, Some(_)) => Ordering::Less,
            (Some(_), Some(Value::Null) | None) => Ordering::Greater,
            (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn fetch(&self, table: Table, query: &SelectQuery) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows = tables.get(&table).cloned().unwrap_or_default();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = Self::compare_column(a, b, &order.column);
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(columns) = &query.columns {
            rows = rows.iter().map(|r| Self::project(r, columns)).collect();
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let Value::Object(mut map) = row else {
            return Err(StoreError::MalformedRow);
        };
        map.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let stored = Value::Object(map);

        {
            let mut tables = self.tables.write().await;
            tables.entry(table).or_default().push(stored.clone());
        }

        self.feed.publish(ChangeEvent {
            table,
            op: ChangeOp::Insert,
        });
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::MalformedRow);
        };

        let updated = {
            let mut tables = self.tables.write().await;
            let rows = tables
                .get_mut(&table)
                .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
            let row = rows
                .iter_mut()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
            if let Value::Object(map) = row {
                for (k, v) in patch {
                    map.insert(k, v);
                }
            }
            row.clone()
        };

        self.feed.publish(ChangeEvent {
            table,
            op: ChangeOp::Update,
        });
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.write().await;
            let rows = tables
                .get_mut(&table)
                .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
            let before = rows.len();
            rows.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
            if rows.len() == before {
                return Err(StoreError::NotFound(format!("{table}/{id}")));
            }
        }

        self.feed.publish(ChangeEvent {
            table,
            op: ChangeOp::Delete,
        });
        Ok(())
    }
}
