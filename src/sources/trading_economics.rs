//! Economic-indicator table scraped from a Trading Economics country page.
//!
//! The page lists one indicator per row of the first `.table-responsive`
//! table: name, last value, previous value, highest, lowest, unit, and the
//! reference month (`Jan/23`).

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::ops::RangeInclusive;
use std::time::Duration;

use super::IndicatorSource;
use crate::error::{Result, SyncError};
use crate::models::IndicatorReading;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// 1-based cell positions within a row.
const CELL_NAME: usize = 1;
const CELL_CURRENT: usize = 2;
const CELL_PREVIOUS: usize = 3;
const CELL_HIGH: usize = 4;
const CELL_LOW: usize = 5;
const CELL_REFERENCE: usize = 7;

/// Parse a reference month such as `Jan/23` into the first day of that
/// month.
pub fn parse_reference_month(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01/{}", s.trim()), "%d/%b/%y").ok()
}

/// Parse a numeric cell. Thousands separators are ignored; anything that
/// still does not parse is treated as missing.
fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SyncError::Parse(format!("bad selector '{}': {}", css, e)))
}

fn cell_text(cells: &[ElementRef<'_>], position: usize) -> Option<String> {
    cells
        .get(position - 1)
        .map(|c| c.text().collect::<String>().trim().to_string())
}

/// Extract readings from the selected 1-based rows of the page's indicator
/// table.
///
/// A row without a name or with an unparseable reference month is skipped
/// with a warning; the other rows are still returned.
pub fn parse_indicator_table(
    html: &str,
    rows: RangeInclusive<usize>,
) -> Result<Vec<IndicatorReading>> {
    let document = Html::parse_document(html);
    let body_sel = selector("div.table-responsive tbody")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let tbody = document
        .select(&body_sel)
        .next()
        .ok_or_else(|| SyncError::Parse("indicator table not found".to_string()))?;
    let table_rows: Vec<ElementRef<'_>> = tbody.select(&row_sel).collect();

    let mut readings = Vec::new();
    for index in rows {
        let Some(row) = index.checked_sub(1).and_then(|i| table_rows.get(i)) else {
            tracing::warn!(row = index, "indicator row not present on page");
            continue;
        };
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();

        let name = match cell_text(&cells, CELL_NAME) {
            Some(n) if !n.is_empty() => n,
            _ => {
                tracing::warn!(row = index, "indicator row has no name; skipped");
                continue;
            }
        };

        let reference = cell_text(&cells, CELL_REFERENCE).unwrap_or_default();
        let Some(date) = parse_reference_month(&reference) else {
            tracing::warn!(row = index, indicator = %name, reference = %reference, "unreadable reference month; skipped");
            continue;
        };

        let number = |pos: usize| cell_text(&cells, pos).as_deref().and_then(parse_number);
        readings.push(IndicatorReading {
            date,
            name,
            current: number(CELL_CURRENT),
            previous: number(CELL_PREVIOUS),
            high: number(CELL_HIGH),
            low: number(CELL_LOW),
        });
    }

    Ok(readings)
}

/// Fetches the indicator page over HTTP and parses the selected rows.
pub struct TradingEconomicsSource {
    client: reqwest::blocking::Client,
    url: String,
    rows: RangeInclusive<usize>,
}

impl TradingEconomicsSource {
    pub fn new(url: &str, rows: RangeInclusive<usize>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            rows,
        })
    }
}

impl IndicatorSource for TradingEconomicsSource {
    fn readings(&self) -> Result<Vec<IndicatorReading>> {
        tracing::info!(url = %self.url, "fetching economic indicators");
        let resp = self.client.get(&self.url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Fetch {
                symbol: self.url.clone(),
                reason: format!("HTTP {}", status),
            });
        }
        let html = resp.text()?;
        parse_indicator_table(&html, self.rows.clone())
    }
}
