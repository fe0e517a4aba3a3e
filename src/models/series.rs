use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dataset::Dataset;
use super::value::Value;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Record: a fixed row shape that lowers into a Dataset
// ---------------------------------------------------------------------------

/// A typed row shape with a fixed column list.
///
/// Implementors lower into a [`Dataset`] through [`Dataset::from_records`],
/// which is the only shape the schema, upsert and export stages understand.
pub trait Record {
    /// Column names, in table order. Always starts with `date`, `name`.
    fn columns() -> &'static [&'static str];

    /// This record's values, aligned with [`Record::columns`].
    fn values(&self) -> Vec<Value>;

    fn date(&self) -> NaiveDate;
}

impl Dataset {
    /// Build a dataset from a slice of typed records.
    pub fn from_records<R: Record>(records: &[R]) -> Result<Self> {
        let mut dataset = Dataset::new(R::columns());
        for record in records {
            dataset.push_row(record.values())?;
        }
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// RawBar: daily bar as handed over by a market source
// ---------------------------------------------------------------------------

/// One daily bar from a market data provider, before it is attached to a
/// series name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

// ---------------------------------------------------------------------------
// Change: one period-over-period derivation
// ---------------------------------------------------------------------------

/// Derived change of a measurement against the preceding row.
///
/// All fields are `None` on the first row of a series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Change {
    pub previous: Option<f64>,
    pub change: Option<f64>,
    pub percentage: Option<f64>,
}

// ---------------------------------------------------------------------------
// OhlcvBar / OhlcBar: market-shaped series (indices, currencies)
// ---------------------------------------------------------------------------

/// Index or commodity bar: full OHLCV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub name: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    #[serde(default)]
    pub close_change: Change,
    #[serde(default)]
    pub volume_change: Change,
}

impl OhlcvBar {
    pub fn from_raw(name: &str, raw: &RawBar) -> Self {
        Self {
            date: raw.date,
            name: name.to_string(),
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            close_change: Change::default(),
            volume_change: Change::default(),
        }
    }
}

impl Record for OhlcvBar {
    fn columns() -> &'static [&'static str] {
        &[
            "date",
            "name",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "previous_close",
            "price_change",
            "percentage_change",
            "previous_volume",
            "volume_change",
            "volume_percentage_change",
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.name.clone()),
            self.open.into(),
            self.high.into(),
            self.low.into(),
            self.close.into(),
            self.volume.into(),
            self.close_change.previous.into(),
            self.close_change.change.into(),
            self.close_change.percentage.into(),
            self.volume_change.previous.into(),
            self.volume_change.change.into(),
            self.volume_change.percentage.into(),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Currency-pair bar: no volume, so no volume-derived columns either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub date: NaiveDate,
    pub name: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    #[serde(default)]
    pub close_change: Change,
}

impl OhlcBar {
    pub fn from_raw(name: &str, raw: &RawBar) -> Self {
        Self {
            date: raw.date,
            name: name.to_string(),
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            close_change: Change::default(),
        }
    }
}

impl Record for OhlcBar {
    fn columns() -> &'static [&'static str] {
        &[
            "date",
            "name",
            "open",
            "high",
            "low",
            "close",
            "previous_close",
            "price_change",
            "percentage_change",
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.name.clone()),
            self.open.into(),
            self.high.into(),
            self.low.into(),
            self.close.into(),
            self.close_change.previous.into(),
            self.close_change.change.into(),
            self.close_change.percentage.into(),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

// ---------------------------------------------------------------------------
// IndicatorReading: scraped economic indicator
// ---------------------------------------------------------------------------

/// One row of an economic-indicator table: the latest print, the prior
/// print, and the historical range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub date: NaiveDate,
    pub name: String,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl Record for IndicatorReading {
    fn columns() -> &'static [&'static str] {
        &["date", "name", "current", "previous", "high", "low"]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.name.clone()),
            self.current.into(),
            self.previous.into(),
            self.high.into(),
            self.low.into(),
        ]
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

// ---------------------------------------------------------------------------
// SeriesData / Series
// ---------------------------------------------------------------------------

/// Which family a series belongs to. Determines both its record shape and
/// its position in the run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Index,
    Currency,
    Indicator,
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SeriesKind::Index => "index",
            SeriesKind::Currency => "currency",
            SeriesKind::Indicator => "indicator",
        };
        write!(f, "{}", s)
    }
}

/// Records of one series, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Index(Vec<OhlcvBar>),
    Currency(Vec<OhlcBar>),
    Indicator(Vec<IndicatorReading>),
}

impl SeriesData {
    pub fn kind(&self) -> SeriesKind {
        match self {
            SeriesData::Index(_) => SeriesKind::Index,
            SeriesData::Currency(_) => SeriesKind::Currency,
            SeriesData::Indicator(_) => SeriesKind::Indicator,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesData::Index(v) => v.len(),
            SeriesData::Currency(v) => v.len(),
            SeriesData::Indicator(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable sort by date; rows sharing a date keep their relative order.
    pub fn sort_by_date(&mut self) {
        match self {
            SeriesData::Index(v) => v.sort_by_key(|r| r.date()),
            SeriesData::Currency(v) => v.sort_by_key(|r| r.date()),
            SeriesData::Indicator(v) => v.sort_by_key(|r| r.date()),
        }
    }

    /// Lower into the generic dataset shape.
    pub fn to_dataset(&self) -> Result<Dataset> {
        match self {
            SeriesData::Index(v) => Dataset::from_records(v),
            SeriesData::Currency(v) => Dataset::from_records(v),
            SeriesData::Indicator(v) => Dataset::from_records(v),
        }
    }
}

/// A named series bound to its destination table.
///
/// For market series the table name equals the series name. Indicator
/// readings from one page share a single table; each row's `name` carries
/// the indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub table: String,
    pub data: SeriesData,
}

impl Series {
    pub fn new(table: impl Into<String>, data: SeriesData) -> Self {
        Self {
            table: table.into(),
            data,
        }
    }
}
