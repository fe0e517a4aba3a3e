//! Daily market-data ingestion into schema-adaptive DuckDB tables.
//!
//! Fetches index, currency and economic-indicator series, derives
//! period-over-period changes, writes one CSV per series and upserts every
//! row into a table named after the series. Tables are created on first
//! sight from the data's shape and keyed on `(date, name)`.
//!
//! # Quick start
//!
//! ```no_run
//! use marketdata_sync::{Pipeline, PipelineConfig, YahooChartSource};
//!
//! let config = PipelineConfig::builder().lookback_days(30).build().unwrap();
//! let market = YahooChartSource::new(config.http_timeout).unwrap();
//! let pipeline = Pipeline::new(config).unwrap();
//!
//! let today = chrono::Local::now().date_naive();
//! let summary = pipeline.run(&market, None, today);
//! summary.log_summary("daily sync");
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod indicators;
pub mod models;
pub mod pipeline;
pub mod sanitize;
pub mod schema;
pub mod sources;
pub mod sql_builder;
pub mod stats;
pub mod upsert;

pub use config::{DateWindow, PipelineConfig, StoreDescriptor, SymbolEntry};
pub use connection::{Connection, RowStore};
pub use error::{Result, SyncError};
pub use models::{Dataset, Series, SeriesData, SeriesKind, Value};
pub use pipeline::{Pipeline, Stage};
pub use schema::{ColumnDef, Reconciled, TableSchema, TypeCategory};
pub use sources::{IndicatorSource, MarketSource, TradingEconomicsSource, YahooChartSource};
pub use sql_builder::SqlBuilder;
pub use stats::{RunSummary, SeriesReport};
pub use upsert::{RowOutcome, UpsertReport, UpsertStrategy};
