pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::TableRow;
use crate::tables::Table;

/// Errors from table stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Row is not a JSON object")]
    MalformedRow,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Projection and ordering for a table read. The default selects every
/// column with no explicit order.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub columns: Option<Vec<String>>,
    pub order_by: Option<OrderBy>,
}

impl SelectQuery {
    pub fn columns(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
            order_by: None,
        }
    }

    /// Chronological feed ordering: `column` descending.
    pub fn newest_first(column: impl Into<String>) -> Self {
        Self {
            columns: None,
            order_by: Some(OrderBy {
                column: column.into(),
                direction: SortDirection::Desc,
            }),
        }
    }

    pub fn ordered(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }
}

/// Read/write seam over the hosted backend's tables.
///
/// Rows cross this boundary as opaque JSON objects; typed shapes are applied
/// at the edges that need them (see [`fetch_rows`]). Implementations must
/// make mutations observable through the change feed, either by publishing
/// events themselves (in-memory store) or by relying on database-side NOTIFY
/// triggers (Postgres store).
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn fetch(&self, table: Table, query: &SelectQuery) -> Result<Vec<Value>, StoreError>;

    /// Insert a row, returning the stored form (with any generated fields).
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError>;

    /// Merge `patch` into the row with the given id.
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;
}

/// Fetch a table as typed rows.
///
/// A row that fails to deserialize is skipped with a warning rather than
/// failing the whole read; with the sparse-tolerant row shapes this only
/// happens when a required key such as `id` is missing.
pub async fn fetch_rows<T: TableRow>(
    store: &dyn TableStore,
    query: &SelectQuery,
) -> Result<Vec<T>, StoreError> {
    let raw = store.fetch(T::TABLE, query).await?;
    let mut rows = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(row) => rows.push(row),
            Err(err) => {
                tracing::warn!(table = %T::TABLE, error = %err, "skipping undecodable row");
            }
        }
    }
    Ok(rows)
}

/// Insert a typed row, returning the stored form.
pub async fn insert_row<T: TableRow>(store: &dyn TableStore, row: &T) -> Result<Value, StoreError> {
    let value = serde_json::to_value(row).map_err(|_| StoreError::MalformedRow)?;
    store.insert(T::TABLE, value).await
}
