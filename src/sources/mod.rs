//! Fetch adapters.
//!
//! Each adapter hands the pipeline row-shaped data and nothing else: market
//! sources return [`RawBar`]s for a symbol and window, indicator sources
//! return ready-made [`IndicatorReading`]s. Both are traits so the pipeline
//! can be driven by in-memory fakes.

pub mod trading_economics;
pub mod yahoo;

pub use trading_economics::{parse_reference_month, TradingEconomicsSource};
pub use yahoo::YahooChartSource;

use crate::config::DateWindow;
use crate::error::Result;
use crate::models::{IndicatorReading, RawBar};

/// Daily bars for a provider symbol.
pub trait MarketSource {
    /// Bars inside `window`, in the order the provider returns them.
    fn daily_bars(&self, symbol: &str, window: DateWindow) -> Result<Vec<RawBar>>;
}

/// Readings scraped from an economic-indicator page.
pub trait IndicatorSource {
    fn readings(&self) -> Result<Vec<IndicatorReading>>;
}
