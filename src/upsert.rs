//! Row-level upsert keyed on `(date, name)`.
//!
//! The default strategy is the portable two-step sequence, driven as an
//! explicit state machine per row:
//!
//! ```text
//! AttemptUpdate ──matched──▶ Updated
//!      │
//!   no match
//!      ▼
//! AttemptInsert ──ok──▶ Inserted
//!      │
//!    error ──integrity violation──▶ Conflict  (logged, next row)
//!          └─anything else────────▶ Rejected  (logged, next row)
//! ```
//!
//! Another writer can insert the same key between the update and the
//! insert; the `Conflict` branch absorbs that. A failing update is not
//! contained and aborts the dataset.
//!
//! Where the table carries the composite primary key,
//! [`UpsertStrategy::Merge`] replaces both steps with one
//! `INSERT ... ON CONFLICT DO UPDATE`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::connection::RowStore;
use crate::error::{Result, SyncError};
use crate::models::{Dataset, Value, DATE_COLUMN, NAME_COLUMN};
use crate::sql_builder;

// ---------------------------------------------------------------------------
// Strategy and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// Keyed `UPDATE`, then `INSERT` when nothing matched.
    #[default]
    UpdateThenInsert,
    /// Single `INSERT ... ON CONFLICT ("date", "name") DO UPDATE`.
    Merge,
}

impl FromStr for UpsertStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "update_then_insert" | "update-then-insert" | "update" => {
                Ok(UpsertStrategy::UpdateThenInsert)
            }
            "merge" => Ok(UpsertStrategy::Merge),
            other => Err(SyncError::Config(format!("unknown upsert strategy '{}'", other))),
        }
    }
}

/// Terminal state of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Updated,
    Inserted,
    /// Written by the merge statement; whether it was new is not reported.
    Merged,
    /// The insert hit an integrity violation.
    Conflict(String),
    /// The insert failed for another reason, e.g. the existing table does
    /// not match the dataset's shape.
    Rejected(String),
}

/// Intermediate states of the update-then-insert machine.
#[derive(Debug)]
enum Step {
    AttemptUpdate,
    AttemptInsert,
    Done(RowOutcome),
}

/// Per-dataset tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub rows: usize,
    pub updated: usize,
    pub inserted: usize,
    pub merged: usize,
    pub conflicts: usize,
    pub rejected: usize,
}

impl UpsertReport {
    fn record(&mut self, outcome: &RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Inserted => self.inserted += 1,
            RowOutcome::Merged => self.merged += 1,
            RowOutcome::Conflict(_) => self.conflicts += 1,
            RowOutcome::Rejected(_) => self.rejected += 1,
        }
    }

    /// Rows that reached the store.
    pub fn written(&self) -> usize {
        self.updated + self.inserted + self.merged
    }

    /// Rows that were logged and skipped.
    pub fn skipped(&self) -> usize {
        self.conflicts + self.rejected
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// SQL and parameter layout for one dataset against one table.
#[derive(Debug, Clone)]
pub struct UpsertStatements {
    update: Option<String>,
    insert: String,
    merge: String,
    date_idx: usize,
    name_idx: usize,
    value_idx: Vec<usize>,
}

impl UpsertStatements {
    pub fn new(table: &str, dataset: &Dataset) -> Result<Self> {
        let (date_idx, name_idx) = dataset.require_key_columns()?;
        let columns = dataset.columns();
        let value_idx = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() != DATE_COLUMN && c.as_str() != NAME_COLUMN)
            .map(|(i, _)| i)
            .collect();

        Ok(Self {
            update: sql_builder::update_by_key(table, columns),
            insert: sql_builder::insert(table, columns),
            merge: sql_builder::merge(table, columns),
            date_idx,
            name_idx,
            value_idx,
        })
    }

    /// Non-key values followed by `date`, `name`.
    fn update_params(&self, row: &[Value]) -> Vec<Value> {
        let mut params: Vec<Value> = self.value_idx.iter().map(|&i| row[i].clone()).collect();
        params.push(row[self.date_idx].clone());
        params.push(row[self.name_idx].clone());
        params
    }

    pub fn update_sql(&self) -> Option<&str> {
        self.update.as_deref()
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    pub fn merge_sql(&self) -> &str {
        &self.merge
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

fn classify_insert_error(err: SyncError) -> RowOutcome {
    if err.is_constraint_violation() {
        RowOutcome::Conflict(err.to_string())
    } else {
        RowOutcome::Rejected(err.to_string())
    }
}

/// Run the update-then-insert machine for one row.
pub fn upsert_row<S: RowStore + ?Sized>(
    store: &S,
    statements: &UpsertStatements,
    row: &[Value],
) -> Result<RowOutcome> {
    let mut step = Step::AttemptUpdate;
    loop {
        step = match step {
            Step::AttemptUpdate => match statements.update_sql() {
                Some(sql) => {
                    let matched = store.execute_statement(sql, &statements.update_params(row))?;
                    if matched > 0 {
                        Step::Done(RowOutcome::Updated)
                    } else {
                        Step::AttemptInsert
                    }
                }
                // Only key columns: nothing to update, the insert decides.
                None => Step::AttemptInsert,
            },
            Step::AttemptInsert => match store.execute_statement(statements.insert_sql(), row) {
                Ok(_) => Step::Done(RowOutcome::Inserted),
                Err(e) => Step::Done(classify_insert_error(e)),
            },
            Step::Done(outcome) => return Ok(outcome),
        };
    }
}

/// Write one row with the single-statement merge.
pub fn merge_row<S: RowStore + ?Sized>(
    store: &S,
    statements: &UpsertStatements,
    row: &[Value],
) -> RowOutcome {
    match store.execute_statement(statements.merge_sql(), row) {
        Ok(_) => RowOutcome::Merged,
        Err(e) => classify_insert_error(e),
    }
}

/// Persist every row of `dataset` into `table`, in dataset order.
///
/// Conflicting or rejected rows are logged with their contents and skipped;
/// the rest of the dataset is still written.
pub fn upsert_dataset<S: RowStore + ?Sized>(
    store: &S,
    table: &str,
    dataset: &Dataset,
    strategy: UpsertStrategy,
) -> Result<UpsertReport> {
    let statements = UpsertStatements::new(table, dataset)?;
    let mut report = UpsertReport::default();

    for (i, row) in dataset.rows().iter().enumerate() {
        let outcome = match strategy {
            UpsertStrategy::UpdateThenInsert => upsert_row(store, &statements, row)?,
            UpsertStrategy::Merge => merge_row(store, &statements, row),
        };

        match &outcome {
            RowOutcome::Conflict(reason) => tracing::warn!(
                table = table,
                row = %dataset.describe_row(i),
                error = %reason,
                "duplicate key on insert; row skipped"
            ),
            RowOutcome::Rejected(reason) => tracing::warn!(
                table = table,
                row = %dataset.describe_row(i),
                error = %reason,
                "insert rejected; row skipped"
            ),
            _ => {}
        }

        report.record(&outcome);
    }

    tracing::info!(
        table = table,
        rows = report.rows,
        updated = report.updated,
        inserted = report.inserted,
        merged = report.merged,
        skipped = report.skipped(),
        "data saved"
    );
    Ok(report)
}
