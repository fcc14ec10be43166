use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::store::{SelectQuery, StoreError, TableStore};
use crate::tables::{Table, ALL_TABLES};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV produced invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export of {table} exceeds row cap: {rows} rows")]
    TooLarge { table: Table, rows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Renders table contents for download.
///
/// Exports read the store directly rather than going through a live
/// subscription: an export is a one-shot read, not a consumer that should
/// hold a cache entry open.
pub struct ExportService {
    store: Arc<dyn TableStore>,
}

impl ExportService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn export_table(
        &self,
        table: Table,
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        let rows = self.store.fetch(table, &SelectQuery::default()).await?;

        let cap = config::config().export.max_rows;
        if rows.len() > cap {
            return Err(ExportError::TooLarge {
                table,
                rows: rows.len(),
            });
        }
        debug!(table = %table, rows = rows.len(), ?format, "exporting table");

        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
            ExportFormat::Csv => to_csv(&rows),
        }
    }

    /// JSON snapshot of every known table, fetched concurrently. Keyed by
    /// table for the caller to write out one file per table.
    pub async fn snapshot_all(&self) -> Result<HashMap<Table, String>, ExportError> {
        let exports = ALL_TABLES
            .iter()
            .map(|&table| async move {
                let body = self.export_table(table, ExportFormat::Json).await?;
                Ok::<_, ExportError>((table, body))
            });
        let pairs = futures::future::try_join_all(exports).await?;
        Ok(pairs.into_iter().collect())
    }
}

fn to_csv(rows: &[Value]) -> Result<String, ExportError> {
    // Column set is the sorted union of keys; sparse rows render empty cells
    let mut headers: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        if let Value::Object(map) = row {
            headers.extend(map.keys().map(String::as_str));
        }
    }
    if headers.is_empty() {
        return Ok(String::new());
    }
    let headers: Vec<&str> = headers.into_iter().collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        let record: Vec<String> = headers.iter().map(|h| cell(row.get(*h))).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;

    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        // Numbers, bools, and nested values render as compact JSON
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn csv_uses_sorted_key_union() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                Table::InventoryItems,
                vec![
                    json!({ "id": "i1", "name": "Red carpet", "quantity": 4 }),
                    json!({ "id": "i2", "name": "Velvet rope", "condition": "worn" }),
                ],
            )
            .await;

        let service = ExportService::new(store);
        let csv = service
            .export_table(Table::InventoryItems, ExportFormat::Csv)
            .await
            .unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("condition,id,name,quantity"));
        assert_eq!(lines.next(), Some(",i1,Red carpet,4"));
        assert_eq!(lines.next(), Some("worn,i2,Velvet rope,"));
    }

    #[tokio::test]
    async fn json_export_is_an_array() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(Table::Clients, vec![json!({ "id": "c1", "full_name": "X" })])
            .await;

        let service = ExportService::new(store);
        let body = service
            .export_table(Table::Clients, ExportFormat::Json)
            .await
            .unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["id"], "c1");
    }

    #[tokio::test]
    async fn snapshot_covers_every_table() {
        let store = Arc::new(MemoryStore::new());
        let service = ExportService::new(store);
        let snapshot = service.snapshot_all().await.unwrap();
        assert_eq!(snapshot.len(), ALL_TABLES.len());
        for table in ALL_TABLES {
            assert_eq!(snapshot[table], "[]");
        }
    }

    #[tokio::test]
    async fn empty_table_yields_header_only_csv() {
        let store = Arc::new(MemoryStore::new());
        let service = ExportService::new(store);
        let csv = service
            .export_table(Table::StaffMembers, ExportFormat::Csv)
            .await
            .unwrap();
        assert_eq!(csv.trim(), "");
    }
}
