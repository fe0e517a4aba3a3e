//! Run configuration: symbol tables, date window, output locations.

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::upsert::UpsertStrategy;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 180;
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_DATABASE: &str = "marketdata.duckdb";
pub const DEFAULT_INDICATOR_URL: &str = "https://tradingeconomics.com/taiwan/indicators";
pub const DEFAULT_INDICATOR_TABLE: &str = "Taiwan_Economic_Data";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// A series name paired with the provider symbol it is fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub symbol: String,
}

impl SymbolEntry {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Equity indices and commodity futures fetched with volume.
pub fn default_indices() -> Vec<SymbolEntry> {
    [
        ("台灣加權指數", "^TWII"),
        ("NASDAQ", "^IXIC"),
        ("日經指數", "^N225"),
        ("恆生指數", "^HSI"),
        ("上證指數", "000001.SS"),
        ("布蘭特原油", "BZ=F"),
        ("天然氣", "NG=F"),
        ("黃金", "GC=F"),
        ("小麥", "ZW=F"),
        ("黃豆", "ZS=F"),
        ("玉米", "ZC=F"),
    ]
    .iter()
    .map(|(name, symbol)| SymbolEntry::new(name, symbol))
    .collect()
}

/// Currency pairs, fetched without volume.
pub fn default_currencies() -> Vec<SymbolEntry> {
    [
        ("USD_TWD", "TWD=X"),
        ("USD_JPY", "JPY=X"),
        ("USD_CNY", "CNY=X"),
        ("EUR_USD", "EURUSD=X"),
        ("GBP_USD", "GBPUSD=X"),
    ]
    .iter()
    .map(|(name, symbol)| SymbolEntry::new(name, symbol))
    .collect()
}

// ---------------------------------------------------------------------------
// StoreDescriptor
// ---------------------------------------------------------------------------

/// Where the relational store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreDescriptor {
    Memory,
    File(PathBuf),
}

impl StoreDescriptor {
    /// Parse `:memory:` or a file path.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | ":memory:" => StoreDescriptor::Memory,
            path => StoreDescriptor::File(PathBuf::from(path)),
        }
    }
}

impl std::fmt::Display for StoreDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreDescriptor::Memory => write!(f, ":memory:"),
            StoreDescriptor::File(p) => write!(f, "{}", p.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// DateWindow
// ---------------------------------------------------------------------------

/// Inclusive range of calendar dates to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SyncError::InvalidArgument(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at `today`.
    pub fn trailing(days: i64, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_signed(ChronoDuration::days(days.max(0)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Everything a run needs, passed explicitly into the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub indices: Vec<SymbolEntry>,
    pub currencies: Vec<SymbolEntry>,
    pub lookback_days: i64,
    pub output_dir: PathBuf,
    pub store: StoreDescriptor,
    pub indicator_url: String,
    pub indicator_table: String,
    /// 1-based table rows read from the indicator page.
    pub indicator_rows: RangeInclusive<usize>,
    pub upsert_strategy: UpsertStrategy,
    pub sort_by_date: bool,
    pub http_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indices: default_indices(),
            currencies: default_currencies(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            store: StoreDescriptor::File(PathBuf::from(DEFAULT_DATABASE)),
            indicator_url: DEFAULT_INDICATOR_URL.to_string(),
            indicator_table: DEFAULT_INDICATOR_TABLE.to_string(),
            indicator_rows: 4..=7,
            upsert_strategy: UpsertStrategy::UpdateThenInsert,
            sort_by_date: true,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Defaults overridden by `MARKETDATA_*` environment variables (a
    /// `.env` file is loaded first when present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut builder = Self::builder();

        if let Ok(v) = std::env::var("MARKETDATA_LOOKBACK_DAYS") {
            let days = v.parse::<i64>().map_err(|_| {
                SyncError::Config(format!("MARKETDATA_LOOKBACK_DAYS is not a number: {}", v))
            })?;
            builder = builder.lookback_days(days);
        }
        if let Ok(v) = std::env::var("MARKETDATA_OUTPUT_DIR") {
            builder = builder.output_dir(v);
        }
        if let Ok(v) = std::env::var("MARKETDATA_DATABASE") {
            builder = builder.store(StoreDescriptor::parse(&v));
        }
        if let Ok(v) = std::env::var("MARKETDATA_INDICATOR_URL") {
            builder = builder.indicator_url(&v);
        }
        if let Ok(v) = std::env::var("MARKETDATA_UPSERT") {
            builder = builder.upsert_strategy(v.parse()?);
        }
        if let Ok(v) = std::env::var("MARKETDATA_HTTP_TIMEOUT_SECS") {
            let secs = v.parse::<u64>().map_err(|_| {
                SyncError::Config(format!("MARKETDATA_HTTP_TIMEOUT_SECS is not a number: {}", v))
            })?;
            builder = builder.http_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Fetch window ending at `today`.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::trailing(self.lookback_days, today)
    }
}

// ---------------------------------------------------------------------------
// PipelineConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for [`PipelineConfig`]. Unset options keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn indices(mut self, indices: Vec<SymbolEntry>) -> Self {
        self.config.indices = indices;
        self
    }

    pub fn currencies(mut self, currencies: Vec<SymbolEntry>) -> Self {
        self.config.currencies = currencies;
        self
    }

    pub fn lookback_days(mut self, days: i64) -> Self {
        self.config.lookback_days = days;
        self
    }

    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn store(mut self, store: StoreDescriptor) -> Self {
        self.config.store = store;
        self
    }

    pub fn indicator_url(mut self, url: &str) -> Self {
        self.config.indicator_url = url.to_string();
        self
    }

    pub fn indicator_table(mut self, table: &str) -> Self {
        self.config.indicator_table = table.to_string();
        self
    }

    pub fn indicator_rows(mut self, rows: RangeInclusive<usize>) -> Self {
        self.config.indicator_rows = rows;
        self
    }

    pub fn upsert_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.config.upsert_strategy = strategy;
        self
    }

    /// Sort each series by date before deriving changes. Defaults to `true`.
    pub fn sort_by_date(mut self, sort: bool) -> Self {
        self.config.sort_by_date = sort;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<PipelineConfig> {
        let config = self.config;
        if config.lookback_days < 0 {
            return Err(SyncError::Config(format!(
                "lookback window must not be negative, got {}",
                config.lookback_days
            )));
        }
        if *config.indicator_rows.start() == 0 {
            return Err(SyncError::Config(
                "indicator rows are 1-based".to_string(),
            ));
        }
        for entry in config.indices.iter().chain(&config.currencies) {
            if entry.name.trim().is_empty() || entry.symbol.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "symbol entry has an empty name or symbol: {:?}",
                    entry
                )));
            }
        }
        Ok(config)
    }
}
