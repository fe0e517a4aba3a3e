//! Storage-type inference and idempotent table creation.
//!
//! A series' table is created once, from the shape of the first dataset
//! that reaches it. An existing table is trusted as-is: later datasets with
//! extra or retyped columns are not reconciled against it.

use serde::{Deserialize, Serialize};

use crate::connection::RowStore;
use crate::error::{Result, SyncError};
use crate::models::{Dataset, Value, DATE_COLUMN};
use crate::sql_builder;

// ---------------------------------------------------------------------------
// TypeCategory
// ---------------------------------------------------------------------------

/// Closed set of storage categories a column can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl TypeCategory {
    /// Map one sample value to a category.
    ///
    /// Booleans map to [`TypeCategory::Boolean`], never to Integer. A
    /// missing sample, or any tag outside the recognized set (including a
    /// plain date), falls back to [`TypeCategory::Text`].
    pub fn infer(sample: Option<&Value>) -> Self {
        match sample {
            Some(Value::Boolean(_)) => TypeCategory::Boolean,
            Some(Value::Integer(_)) => TypeCategory::Integer,
            Some(Value::Float(_)) => TypeCategory::Float,
            Some(Value::Text(_)) => TypeCategory::Text,
            Some(Value::Timestamp(_)) => TypeCategory::Timestamp,
            Some(Value::Date(_)) | Some(Value::Null) | None => TypeCategory::Text,
        }
    }

    /// DuckDB column type for this category.
    pub fn sql_type(&self) -> &'static str {
        match self {
            TypeCategory::Integer => "BIGINT",
            TypeCategory::Float => "DOUBLE",
            TypeCategory::Text => "VARCHAR",
            TypeCategory::Boolean => "BOOLEAN",
            TypeCategory::Timestamp => "TIMESTAMP",
        }
    }

    /// The zero a missing value is replaced with, if this category has one.
    pub fn zero(&self) -> Option<Value> {
        match self {
            TypeCategory::Integer => Some(Value::Integer(0)),
            TypeCategory::Float => Some(Value::Float(0.0)),
            TypeCategory::Text => Some(Value::Text("0".to_string())),
            TypeCategory::Boolean => Some(Value::Boolean(false)),
            TypeCategory::Timestamp => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnDef / TableSchema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub category: TypeCategory,
}

/// Column definitions for one table, in dataset order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Infer a schema from a dataset, sampling the first non-missing value
    /// of each column.
    ///
    /// The `date` column is recorded with the category its sample implies,
    /// but is always emitted as `DATE NOT NULL` by
    /// [`sql_builder::create_table`].
    pub fn infer(table: &str, dataset: &Dataset) -> Result<Self> {
        if table.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "table name must not be empty".to_string(),
            ));
        }
        if dataset.columns().is_empty() {
            return Err(SyncError::InvalidArgument(format!(
                "dataset for table '{}' has no columns",
                table
            )));
        }

        let columns = dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnDef {
                name: name.clone(),
                category: TypeCategory::infer(dataset.sample(i)),
            })
            .collect();

        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn category_of(&self, name: &str) -> Option<TypeCategory> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.category)
    }

    pub fn create_sql(&self) -> String {
        sql_builder::create_table(self)
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// What [`ensure_table`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The table was absent and has been created.
    Created,
    /// The table already existed; nothing was issued.
    Existing,
}

/// Make sure `schema.table` exists, creating it when absent.
///
/// Safe to call on every run: the existence check always precedes the
/// `CREATE TABLE`, and an existing table is never altered.
pub fn ensure_table<S: RowStore + ?Sized>(store: &S, schema: &TableSchema) -> Result<Reconciled> {
    if store.table_exists(&schema.table)? {
        tracing::debug!(table = %schema.table, "table exists; schema left unchanged");
        return Ok(Reconciled::Existing);
    }

    if !schema.has_column(DATE_COLUMN) {
        return Err(SyncError::InvalidArgument(format!(
            "cannot create table '{}' without a '{}' column",
            schema.table, DATE_COLUMN
        )));
    }

    store.execute_statement(&schema.create_sql(), &[])?;
    tracing::info!(
        table = %schema.table,
        columns = schema.columns.len(),
        "table created"
    );
    Ok(Reconciled::Created)
}
