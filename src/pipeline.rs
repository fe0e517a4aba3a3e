//! Sequential driver: indices, then currencies, then scraped indicators.
//!
//! Each series runs through the same stages:
//!
//! 1. sort by date (optional) and derive change columns;
//! 2. replace infinities with zero;
//! 3. export to CSV;
//! 4. ensure the destination table exists;
//! 5. fill missing values and upsert row by row.
//!
//! A failure anywhere in fetching or stages 1–4 aborts that series only: it
//! is logged, recorded in the [`RunSummary`], and the next series starts.
//! Nothing is retried.

use chrono::NaiveDate;
use std::time::Instant;

use crate::config::{DateWindow, PipelineConfig, SymbolEntry};
use crate::connection::Connection;
use crate::error::{Result, SyncError};
use crate::export;
use crate::indicators;
use crate::models::{OhlcBar, OhlcvBar, Series, SeriesData, SeriesKind};
use crate::sanitize;
use crate::schema::{self, TableSchema};
use crate::sources::{IndicatorSource, MarketSource};
use crate::stats::{RunSummary, SeriesFailure, SeriesReport};
use crate::upsert;

/// One group of series, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Indices,
    Currencies,
    Indicators,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Indices, Stage::Currencies, Stage::Indicators];
}

/// Owns the configuration and a root handle to the store.
///
/// Every series gets its own connection cloned from the root, used for
/// that series only.
pub struct Pipeline {
    config: PipelineConfig,
    root: Connection,
}

impl Pipeline {
    /// Open the configured store.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let root = Connection::open(&config.store)?;
        tracing::info!(store = %config.store, "store opened");
        Ok(Self { config, root })
    }

    /// Use an already-open store.
    pub fn with_connection(config: PipelineConfig, root: Connection) -> Self {
        Self { config, root }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.root
    }

    /// Run every stage in order.
    pub fn run(
        &self,
        market: &dyn MarketSource,
        indicators: Option<&dyn IndicatorSource>,
        today: NaiveDate,
    ) -> RunSummary {
        self.run_stages(&Stage::ALL, market, indicators, today)
    }

    /// Run the given stages, always in the fixed order indices, currencies,
    /// indicators regardless of how `stages` is ordered.
    pub fn run_stages(
        &self,
        stages: &[Stage],
        market: &dyn MarketSource,
        indicators: Option<&dyn IndicatorSource>,
        today: NaiveDate,
    ) -> RunSummary {
        let started = Instant::now();
        let window = self.config.window(today);
        let mut summary = RunSummary::new();

        tracing::info!(start = %window.start, end = %window.end, "run started");

        for stage in Stage::ALL {
            if !stages.contains(&stage) {
                continue;
            }
            match stage {
                Stage::Indices => {
                    for entry in &self.config.indices {
                        self.run_market_series(market, entry, SeriesKind::Index, window, &mut summary);
                    }
                }
                Stage::Currencies => {
                    for entry in &self.config.currencies {
                        self.run_market_series(market, entry, SeriesKind::Currency, window, &mut summary);
                    }
                }
                Stage::Indicators => match indicators {
                    Some(source) => self.run_indicator_series(source, &mut summary),
                    None => tracing::warn!("no indicator source configured; stage skipped"),
                },
            }
        }

        summary.elapsed = started.elapsed();
        summary
    }

    fn run_market_series(
        &self,
        market: &dyn MarketSource,
        entry: &SymbolEntry,
        kind: SeriesKind,
        window: DateWindow,
        summary: &mut RunSummary,
    ) {
        tracing::info!(series = %entry.name, symbol = %entry.symbol, "fetching series");
        let outcome = fetch_market_series(market, entry, kind, window)
            .and_then(|series| self.process_series(series));
        record(summary, &entry.name, kind, outcome);
    }

    fn run_indicator_series(&self, source: &dyn IndicatorSource, summary: &mut RunSummary) {
        let table = self.config.indicator_table.clone();
        let outcome = source
            .readings()
            .and_then(|readings| self.process_series(Series::new(table.clone(), SeriesData::Indicator(readings))));
        record(summary, &table, SeriesKind::Indicator, outcome);
    }

    /// Derive, sanitize, export and persist one series.
    pub fn process_series(&self, mut series: Series) -> Result<SeriesReport> {
        if series.data.is_empty() {
            return Err(SyncError::NotFound(format!(
                "no rows for series '{}'",
                series.table
            )));
        }

        if self.config.sort_by_date {
            series.data.sort_by_date();
        }
        indicators::enrich(&mut series.data);

        let mut dataset = series.data.to_dataset()?;
        let infinities_replaced = sanitize::replace_infinite(&mut dataset);
        if infinities_replaced > 0 {
            tracing::debug!(table = %series.table, cells = infinities_replaced, "infinite values replaced");
        }

        let export_path = export::export_series(&self.config.output_dir, &series.table, &dataset)?;

        let conn = self.root.try_clone()?;
        let table_schema = TableSchema::infer(&series.table, &dataset)?;
        let reconciled = schema::ensure_table(&conn, &table_schema)?;

        let missing_filled = sanitize::fill_missing(&mut dataset, &table_schema);
        let upsert = upsert::upsert_dataset(
            &conn,
            &series.table,
            &dataset,
            self.config.upsert_strategy,
        )?;

        Ok(SeriesReport {
            table: series.table,
            kind: series.data.kind(),
            rows: dataset.len(),
            reconciled,
            infinities_replaced,
            missing_filled,
            export_path: Some(export_path),
            upsert,
        })
    }
}

/// Fetch one market series and attach its name to every bar.
fn fetch_market_series(
    market: &dyn MarketSource,
    entry: &SymbolEntry,
    kind: SeriesKind,
    window: DateWindow,
) -> Result<Series> {
    let raw = market.daily_bars(&entry.symbol, window)?;
    let data = match kind {
        SeriesKind::Index => {
            SeriesData::Index(raw.iter().map(|b| OhlcvBar::from_raw(&entry.name, b)).collect())
        }
        SeriesKind::Currency => {
            SeriesData::Currency(raw.iter().map(|b| OhlcBar::from_raw(&entry.name, b)).collect())
        }
        SeriesKind::Indicator => {
            return Err(SyncError::InvalidArgument(
                "indicator series are not fetched from a market source".to_string(),
            ))
        }
    };
    Ok(Series::new(entry.name.clone(), data))
}

fn record(summary: &mut RunSummary, series: &str, kind: SeriesKind, outcome: Result<SeriesReport>) {
    match outcome {
        Ok(report) => {
            tracing::info!(
                series = series,
                rows = report.rows,
                written = report.upsert.written(),
                skipped = report.upsert.skipped(),
                "series saved"
            );
            summary.reports.push(report);
        }
        Err(e) => {
            tracing::error!(series = series, kind = %kind, error = %e, "series failed");
            summary.failures.push(SeriesFailure {
                series: series.to_string(),
                kind,
                error: e.to_string(),
            });
        }
    }
}
