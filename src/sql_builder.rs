//! SQL text construction for the schema, upsert and read-back paths.
//!
//! Identifiers (table and column names) are always double-quoted through
//! [`quote_ident`], so any non-empty series name is a valid table name.
//! Values never go into the SQL text: every statement uses `?` placeholders
//! and values are bound by the store.
//!
//! # Example
//!
//! ```rust
//! use marketdata_sync::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("NASDAQ")
//!     .where_eq("name", "NASDAQ")
//!     .order_by(&["date ASC"])
//!     .limit(10)
//!     .build();
//! assert!(sql.starts_with("SELECT *\nFROM \"NASDAQ\""));
//! assert_eq!(params, vec!["NASDAQ"]);
//! ```

use crate::models::{DATE_COLUMN, NAME_COLUMN};
use crate::schema::TableSchema;

/// Quote an identifier for DuckDB, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Store-portable table existence check. One parameter: the table name.
pub const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_name = ? AND table_schema = current_schema()";

/// `CREATE TABLE` for a schema. The date column is forced to
/// `DATE NOT NULL`; when both key columns are present the composite key
/// becomes the primary key.
pub fn create_table(schema: &TableSchema) -> String {
    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            if col.name == DATE_COLUMN {
                format!("{} DATE NOT NULL", quote_ident(&col.name))
            } else {
                format!("{} {}", quote_ident(&col.name), col.category.sql_type())
            }
        })
        .collect();

    if schema.has_column(DATE_COLUMN) && schema.has_column(NAME_COLUMN) {
        defs.push(format!(
            "PRIMARY KEY ({}, {})",
            quote_ident(DATE_COLUMN),
            quote_ident(NAME_COLUMN)
        ));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(&schema.table),
        defs.join(",\n    ")
    )
}

/// Columns other than the composite key, in dataset order.
pub fn value_columns(columns: &[String]) -> Vec<&str> {
    columns
        .iter()
        .map(|c| c.as_str())
        .filter(|c| *c != DATE_COLUMN && *c != NAME_COLUMN)
        .collect()
}

/// Keyed update. Parameters: every non-key column in dataset order, then
/// `date`, then `name`.
///
/// Returns `None` when the dataset has no non-key columns, since there is
/// nothing to set.
pub fn update_by_key(table: &str, columns: &[String]) -> Option<String> {
    let set_cols = value_columns(columns);
    if set_cols.is_empty() {
        return None;
    }
    let assignments: Vec<String> = set_cols
        .iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();
    Some(format!(
        "UPDATE {}\nSET {}\nWHERE {} = ? AND {} = ?",
        quote_ident(table),
        assignments.join(", "),
        quote_ident(DATE_COLUMN),
        quote_ident(NAME_COLUMN)
    ))
}

/// Full-row insert. Parameters: every column in dataset order.
pub fn insert(table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO {} ({})\nVALUES ({})",
        quote_ident(table),
        cols.join(", "),
        placeholders.join(", ")
    )
}

/// Single-statement upsert on the composite key. Parameters: every column
/// in dataset order. Requires a primary key or unique index on
/// `(date, name)`.
pub fn merge(table: &str, columns: &[String]) -> String {
    let set_cols = value_columns(columns);
    let conflict_action = if set_cols.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments: Vec<String> = set_cols
            .iter()
            .map(|c| format!("{} = EXCLUDED.{}", quote_ident(c), quote_ident(c)))
            .collect();
        format!("DO UPDATE SET {}", assignments.join(", "))
    };
    format!(
        "{}\nON CONFLICT ({}, {}) {}",
        insert(table, columns),
        quote_ident(DATE_COLUMN),
        quote_ident(NAME_COLUMN),
        conflict_action
    )
}

// ---------------------------------------------------------------------------
// SqlBuilder: parameterized SELECT for reading stored series back
// ---------------------------------------------------------------------------

/// Builds parameterized SELECT queries against a series table.
///
/// Methods return `&mut Self` for chaining.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table. The name is quoted.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            from_table: quote_ident(table),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add an equality condition on a quoted column: `"{column}" = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses
            .push(format!("{} = ?", quote_ident(column)));
        self.params.push(value.to_string());
        self
    }

    /// Add ORDER BY clauses (e.g. `"date ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Set the number of rows to skip before returning results.
    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<String>) {
        let mut parts = vec![
            format!("SELECT {}", self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }
}
