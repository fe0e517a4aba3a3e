//! Per-series and per-run bookkeeping.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::SeriesKind;
use crate::schema::Reconciled;
use crate::upsert::UpsertReport;

/// What happened to one successfully processed series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesReport {
    pub table: String,
    pub kind: SeriesKind,
    pub rows: usize,
    pub reconciled: Reconciled,
    pub infinities_replaced: usize,
    pub missing_filled: usize,
    pub export_path: Option<PathBuf>,
    pub upsert: UpsertReport,
}

/// A series that was skipped because fetching or processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub series: String,
    pub kind: SeriesKind,
    pub error: String,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SeriesReport>,
    pub failures: Vec<SeriesFailure>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn rows_written(&self) -> usize {
        self.reports.iter().map(|r| r.upsert.written()).sum()
    }

    pub fn rows_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.upsert.skipped()).sum()
    }

    pub fn tables_created(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.reconciled == Reconciled::Created)
            .count()
    }

    pub fn report_for(&self, table: &str) -> Option<&SeriesReport> {
        self.reports.iter().find(|r| r.table == table)
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            tables_created = self.tables_created(),
            rows_written = self.rows_written(),
            rows_skipped = self.rows_skipped(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "run complete"
        );
        for failure in &self.failures {
            tracing::warn!(
                series = %failure.series,
                kind = %failure.kind,
                error = %failure.error,
                "series skipped"
            );
        }
    }
}
