use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::config;
use crate::store::{SelectQuery, StoreError, TableStore};
use crate::tables::Table;

/// Postgres-backed table store.
///
/// Reads and writes go through `to_jsonb` so rows cross the seam in the same
/// opaque-JSON form the in-memory store produces. Mutations do not publish
/// change events themselves: per-table NOTIFY triggers on the database feed
/// [`crate::live::listen_postgres`], which keeps external writers (the public
/// booking forms, the backend mailer) visible to subscriptions as well.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the `DATABASE_URL` environment variable.
    pub async fn connect() -> Result<Self, StoreError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::ConfigMissing("DATABASE_URL"))?;
        Self::connect_to(&base).await
    }

    pub async fn connect_to(database_url: &str) -> Result<Self, StoreError> {
        // Validate early so a bad URL fails here rather than inside the pool
        let url = url::Url::parse(database_url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let cfg = config::config();
        let pool = PgPoolOptions::new()
            .max_connections(cfg.database.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.database.connect_timeout_secs))
            .connect(url.as_str())
            .await?;

        info!("Created database pool");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Validate column identifiers coming from select/order parameters.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn checked_identifier(name: &str) -> Result<String, StoreError> {
    if !is_valid_identifier(name) {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(quote_identifier(name))
}

fn select_sql(table: Table, query: &SelectQuery) -> Result<String, StoreError> {
    let projection = match &query.columns {
        Some(columns) => {
            let mut pairs = Vec::with_capacity(columns.len());
            for column in columns {
                let quoted = checked_identifier(column)?;
                pairs.push(format!("'{}', t.{}", column, quoted));
            }
            format!("jsonb_build_object({})", pairs.join(", "))
        }
        None => "to_jsonb(t)".to_string(),
    };

    let mut sql = format!(
        "SELECT {} AS row FROM {} t",
        projection,
        quote_identifier(table.as_str())
    );
    if let Some(order) = &query.order_by {
        sql.push_str(&format!(
            " ORDER BY t.{} {}",
            checked_identifier(&order.column)?,
            order.direction.to_sql()
        ));
    }
    Ok(sql)
}

fn insert_sql(table: Table, columns: &[String]) -> Result<String, StoreError> {
    let mut quoted = Vec::with_capacity(columns.len());
    for column in columns {
        quoted.push(checked_identifier(column)?);
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    Ok(format!(
        "INSERT INTO {} AS t ({}) VALUES ({}) RETURNING to_jsonb(t) AS row",
        quote_identifier(table.as_str()),
        quoted.join(", "),
        placeholders.join(", ")
    ))
}

fn update_sql(table: Table, columns: &[String]) -> Result<String, StoreError> {
    let mut assignments = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        assignments.push(format!("{} = ${}", checked_identifier(column)?, i + 1));
    }
    Ok(format!(
        "UPDATE {} AS t SET {} WHERE t.\"id\" = ${} RETURNING to_jsonb(t) AS row",
        quote_identifier(table.as_str()),
        assignments.join(", "),
        columns.len() + 1
    ))
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        // Arrays and objects land in JSONB columns
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[async_trait]
impl TableStore for PgStore {
    async fn fetch(&self, table: Table, query: &SelectQuery) -> Result<Vec<Value>, StoreError> {
        let sql = select_sql(table, query)?;
        if config::config().database.enable_query_logging {
            debug!(table = %table, %sql, "fetch");
        }

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.try_get::<Value, _>("row")?);
        }
        Ok(out)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let Value::Object(map) = row else {
            return Err(StoreError::MalformedRow);
        };
        let columns: Vec<String> = map.keys().cloned().collect();
        let sql = insert_sql(table, &columns)?;

        let mut q = sqlx::query(&sql);
        for column in &columns {
            q = bind_param(q, &map[column]);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get::<Value, _>("row")?)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(map) = patch else {
            return Err(StoreError::MalformedRow);
        };
        let columns: Vec<String> = map.keys().cloned().collect();
        let sql = update_sql(table, &columns)?;

        let mut q = sqlx::query(&sql);
        for column in &columns {
            q = bind_param(q, &map[column]);
        }
        q = q.bind(id.to_string());

        match q.fetch_optional(&self.pool).await? {
            Some(row) => Ok(row.try_get::<Value, _>("row")?),
            None => Err(StoreError::NotFound(format!("{table}/{id}"))),
        }
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE \"id\" = $1",
            quote_identifier(table.as_str())
        );
        let result = sqlx::query(&sql).bind(id.to_string()).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{table}/{id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortDirection;

    #[test]
    fn validates_identifiers() {
        assert!(is_valid_identifier("created_at"));
        assert!(is_valid_identifier("_internal"));
        assert!(!is_valid_identifier("1column"));
        assert!(!is_valid_identifier("name; DROP TABLE clients"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn builds_plain_select() {
        let sql = select_sql(Table::Clients, &SelectQuery::default()).unwrap();
        assert_eq!(sql, "SELECT to_jsonb(t) AS row FROM \"clients\" t");
    }

    #[test]
    fn builds_ordered_projection() {
        let query = SelectQuery::columns(vec!["id".into(), "full_name".into()])
            .ordered("created_at", SortDirection::Desc);
        let sql = select_sql(Table::MeetingRequests, &query).unwrap();
        assert_eq!(
            sql,
            "SELECT jsonb_build_object('id', t.\"id\", 'full_name', t.\"full_name\") AS row \
             FROM \"meeting_requests\" t ORDER BY t.\"created_at\" DESC"
        );
    }

    #[test]
    fn rejects_hostile_order_column() {
        let query = SelectQuery::default().ordered("created_at; --", SortDirection::Asc);
        assert!(matches!(
            select_sql(Table::Clients, &query),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn builds_insert_with_placeholders() {
        let sql = insert_sql(Table::Clients, &["full_name".into(), "email".into()]).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"clients\" AS t (\"full_name\", \"email\") VALUES ($1, $2) \
             RETURNING to_jsonb(t) AS row"
        );
    }

    #[test]
    fn update_binds_id_last() {
        let sql = update_sql(Table::InventoryItems, &["quantity".into()]).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"inventory_items\" AS t SET \"quantity\" = $1 WHERE t.\"id\" = $2 \
             RETURNING to_jsonb(t) AS row"
        );
    }
}
