//! DuckDB connection wrapper and the store seam the persistence stages use.

use crate::config::StoreDescriptor;
use crate::error::{Result, SyncError};
use crate::models::Value;
use crate::sql_builder::{self, SqlBuilder};
use chrono::DateTime;
use duckdb::{
    types::{TimeUnit, ValueRef},
    Connection as DuckDbConnection,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// RowStore
// ---------------------------------------------------------------------------

/// The operations the schema reconciler and upsert engine need from a store.
///
/// [`Connection`] is the production implementation; tests substitute a
/// scripted store to drive every branch of the upsert state machine.
pub trait RowStore {
    /// Whether a table with this exact name exists in the current schema.
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Execute one statement with bound parameters, returning the number of
    /// affected rows.
    fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Wraps a DuckDB connection.
///
/// Statements run in auto-commit mode: each create, update or insert is
/// durable as soon as it returns.
pub struct Connection {
    conn: DuckDbConnection,
}

impl Connection {
    /// Open the store described by `descriptor`.
    pub fn open(descriptor: &StoreDescriptor) -> Result<Self> {
        let conn = match descriptor {
            StoreDescriptor::Memory => DuckDbConnection::open_in_memory()?,
            StoreDescriptor::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                DuckDbConnection::open(path)?
            }
        };
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreDescriptor::Memory)
    }

    /// Open a second connection to the same database.
    ///
    /// For in-memory databases this is the only way to reach the same data
    /// from another connection.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            conn: self.conn.try_clone()?,
        })
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the query has run.
        let column_names: Vec<String> = rows_result
            .as_ref()
            .ok_or_else(|| SyncError::NotFound("statement metadata".to_string()))?
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::new();
            for (i, col_name) in column_names.iter().enumerate() {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter().collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            let value = convert_value_ref(row.get_ref(0)?);
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Number of rows stored in a table.
    pub fn row_count(&self, table: &str) -> Result<i64> {
        let (sql, params) = SqlBuilder::new(table).select(&["COUNT(*)"]).build();
        Ok(self
            .execute_scalar(&sql, &params)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// Stored rows of one table, oldest first, optionally filtered to one
    /// series name.
    pub fn series_rows(
        &self,
        table: &str,
        name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut builder = SqlBuilder::new(table);
        if let Some(name) = name {
            builder.where_eq("name", name);
        }
        builder.order_by(&["\"date\" ASC", "\"name\" ASC"]);
        if let Some(n) = limit {
            builder.limit(n);
        }
        let (sql, params) = builder.build();
        self.execute(&sql, &params)
    }

    /// Return the names of all tables in the current schema.
    pub fn tables(&self) -> Result<Vec<String>> {
        let rows = self.execute(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() ORDER BY table_name",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("table_name").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

impl RowStore for Connection {
    fn table_exists(&self, table: &str) -> Result<bool> {
        let count = self
            .execute_scalar(sql_builder::TABLE_EXISTS_SQL, &[table.to_string()])?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count > 0)
    }

    fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();
        self.conn
            .execute(sql, param_values.as_slice())
            .map_err(SyncError::from_store)
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        ValueRef::Date32(days) => {
            let epoch = DateTime::UNIX_EPOCH.date_naive();
            epoch
                .checked_add_signed(chrono::Duration::days(days as i64))
                .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(serde_json::Value::Null)
        }
        ValueRef::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|ts| {
                    serde_json::Value::String(
                        ts.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
                    )
                })
                .unwrap_or(serde_json::Value::Null)
        }
        _ => serde_json::Value::Null,
    }
}
