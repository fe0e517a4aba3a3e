//! Shared test fixtures for the marketdata-sync integration tests.
//!
//! Provides an in-memory DuckDB store, small series builders, in-memory
//! fetch sources and a scripted [`RowStore`] for driving the upsert state
//! machine without a database.

#![allow(dead_code)]

use chrono::NaiveDate;
use marketdata_sync::config::{DateWindow, PipelineConfig, StoreDescriptor, SymbolEntry};
use marketdata_sync::models::{IndicatorReading, OhlcBar, OhlcvBar, RawBar};
use marketdata_sync::{
    Connection, IndicatorSource, MarketSource, Result, RowStore, Series, SeriesData, SyncError,
    Value,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A fresh private in-memory store.
pub fn memory_store() -> Connection {
    Connection::open_in_memory().unwrap()
}

/// An in-memory store holding one small series table, `quotes`, with three
/// rows across two series names.
pub fn seeded_store() -> Connection {
    let conn = memory_store();
    conn.raw()
        .execute_batch(
            "CREATE TABLE quotes (
                date DATE NOT NULL,
                name VARCHAR,
                close DOUBLE,
                volume BIGINT,
                halted BOOLEAN,
                note VARCHAR,
                PRIMARY KEY (date, name)
            );
            INSERT INTO quotes VALUES
                ('2024-01-02', 'NASDAQ', 14765.94, 5200000000, false, NULL),
                ('2024-01-03', 'NASDAQ', 14592.21, 4800000000, false, 'ex-div'),
                ('2024-01-02', 'HSI', 16788.55, NULL, true, NULL);",
        )
        .unwrap();
    conn
}

/// Configuration for pipeline tests: in-memory store, exports under `dir`.
pub fn test_config(dir: &Path, indices: &[(&str, &str)], currencies: &[(&str, &str)]) -> PipelineConfig {
    PipelineConfig::builder()
        .indices(indices.iter().map(|(n, s)| SymbolEntry::new(n, s)).collect())
        .currencies(currencies.iter().map(|(n, s)| SymbolEntry::new(n, s)).collect())
        .store(StoreDescriptor::Memory)
        .output_dir(dir.join("exports"))
        .lookback_days(30)
        .build()
        .unwrap()
}

/// Consecutive daily bars starting 2024-01-02, one per close.
pub fn raw_bars(closes: &[f64], volumes: Option<&[f64]>) -> Vec<RawBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| RawBar {
            date: date(2024, 1, 2) + chrono::Duration::days(i as i64),
            open: Some(close - 1.0),
            high: Some(close + 2.0),
            low: Some(close - 2.0),
            close: Some(close),
            volume: volumes.map(|v| v[i]),
        })
        .collect()
}

pub fn index_series(name: &str, closes: &[f64], volumes: &[f64]) -> Series {
    let bars = raw_bars(closes, Some(volumes))
        .iter()
        .map(|b| OhlcvBar::from_raw(name, b))
        .collect();
    Series::new(name, SeriesData::Index(bars))
}

pub fn currency_series(name: &str, closes: &[f64]) -> Series {
    let bars = raw_bars(closes, None)
        .iter()
        .map(|b| OhlcBar::from_raw(name, b))
        .collect();
    Series::new(name, SeriesData::Currency(bars))
}

pub fn reading(d: NaiveDate, name: &str, current: f64, previous: f64) -> IndicatorReading {
    IndicatorReading {
        date: d,
        name: name.to_string(),
        current: Some(current),
        previous: Some(previous),
        high: Some(current.max(previous) + 10.0),
        low: Some(current.min(previous) - 10.0),
    }
}

// ---------------------------------------------------------------------------
// Fake sources
// ---------------------------------------------------------------------------

/// Serves fixed bars per symbol; listed symbols fail.
#[derive(Default)]
pub struct FakeMarket {
    pub bars: HashMap<String, Vec<RawBar>>,
    pub failing: HashSet<String>,
    pub requests: RefCell<Vec<String>>,
}

impl FakeMarket {
    pub fn with(mut self, symbol: &str, bars: Vec<RawBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

impl MarketSource for FakeMarket {
    fn daily_bars(&self, symbol: &str, _window: DateWindow) -> Result<Vec<RawBar>> {
        self.requests.borrow_mut().push(symbol.to_string());
        if self.failing.contains(symbol) {
            return Err(SyncError::Fetch {
                symbol: symbol.to_string(),
                reason: "HTTP 503 Service Unavailable".to_string(),
            });
        }
        Ok(self.bars.get(symbol).cloned().unwrap_or_default())
    }
}

pub struct FakeIndicators(pub Vec<IndicatorReading>);

impl IndicatorSource for FakeIndicators {
    fn readings(&self) -> Result<Vec<IndicatorReading>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedStore
// ---------------------------------------------------------------------------

/// Scripted response for one `execute_statement` call.
pub enum Reply {
    Affected(usize),
    Fail(SyncError),
}

/// Records every statement and answers from a script.
///
/// When the script runs dry every statement reports one affected row.
#[derive(Default)]
pub struct ScriptedStore {
    pub exists: RefCell<bool>,
    pub script: RefCell<VecDeque<Reply>>,
    pub statements: RefCell<Vec<(String, Vec<Value>)>>,
}

impl ScriptedStore {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            exists: RefCell::new(false),
            script: RefCell::new(replies.into()),
            statements: RefCell::new(Vec::new()),
        }
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.statements
            .borrow()
            .iter()
            .filter(|(sql, _)| sql.starts_with(prefix))
            .count()
    }
}

impl RowStore for ScriptedStore {
    fn table_exists(&self, _table: &str) -> Result<bool> {
        Ok(*self.exists.borrow())
    }

    fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.statements
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        if sql.starts_with("CREATE TABLE") {
            *self.exists.borrow_mut() = true;
            return Ok(0);
        }
        match self.script.borrow_mut().pop_front() {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Fail(e)) => Err(e),
            None => Ok(1),
        }
    }
}

/// A store that forwards to a real connection but pretends every UPDATE
/// matched nothing, as if another writer inserted the key in between.
pub struct RacingStore<'a> {
    pub inner: &'a Connection,
}

impl RowStore for RacingStore<'_> {
    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }

    fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<usize> {
        if sql.starts_with("UPDATE") {
            return Ok(0);
        }
        self.inner.execute_statement(sql, params)
    }
}
