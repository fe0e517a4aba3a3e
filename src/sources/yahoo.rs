//! Yahoo Finance v8 chart API.
//!
//! No official API exists; the response shape below is what the chart
//! endpoint returns today. Any deviation surfaces as a fetch error for that
//! symbol only.

use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use super::MarketSource;
use crate::config::DateWindow;
use crate::error::{Result, SyncError};
use crate::models::RawBar;

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Blocking client for the chart endpoint. One request per symbol, no
/// retries.
pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(CHART_BASE, timeout)
    }

    /// Point the source at a different host (a mirror or a local stub).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, window: DateWindow) -> String {
        let start_ts = window.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = window
            .end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            self.base_url, symbol, start_ts, end_ts
        )
    }
}

/// Turn a chart payload into bars.
///
/// Bars with no open, high, low, close or volume at all (exchange holidays)
/// are dropped. Individually missing fields stay `None`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<RawBar>> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| SyncError::Fetch {
        symbol: symbol.to_string(),
        reason: format!("unexpected chart payload: {}", e),
    })?;

    let fetch_err = |reason: String| SyncError::Fetch {
        symbol: symbol.to_string(),
        reason,
    };

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) => return Err(fetch_err(format!("{}: {}", err.code, err.description))),
        (None, None) => return Err(fetch_err("empty result with no error".to_string())),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| fetch_err("result array is empty".to_string()))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| fetch_err("no quote data".to_string()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date: NaiveDate = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| fetch_err(format!("invalid timestamp: {}", ts)))?;

        let bar = RawBar {
            date,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            volume: quote.volume.get(i).copied().flatten(),
        };

        if bar.open.is_none()
            && bar.high.is_none()
            && bar.low.is_none()
            && bar.close.is_none()
            && bar.volume.is_none()
        {
            continue;
        }
        bars.push(bar);
    }

    Ok(bars)
}

impl MarketSource for YahooChartSource {
    fn daily_bars(&self, symbol: &str, window: DateWindow) -> Result<Vec<RawBar>> {
        let url = self.chart_url(symbol, window);
        tracing::debug!(symbol = symbol, url = %url, "requesting chart");

        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Fetch {
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", status),
            });
        }
        let body = resp.text()?;

        let bars: Vec<RawBar> = parse_chart(symbol, &body)?
            .into_iter()
            .filter(|b| window.contains(b.date))
            .collect();

        if bars.is_empty() {
            return Err(SyncError::Fetch {
                symbol: symbol.to_string(),
                reason: "no bars in window".to_string(),
            });
        }
        Ok(bars)
    }
}
