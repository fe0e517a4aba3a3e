//! Period-over-period change derivation.
//!
//! "Previous" always means the preceding element of the slice, not the
//! preceding calendar day. Callers that cannot guarantee ascending,
//! duplicate-free dates should sort first (see
//! [`SeriesData::sort_by_date`](crate::models::SeriesData::sort_by_date)).
//!
//! Division by a previous value of zero yields an infinite (or NaN)
//! percentage. That is left in place here; [`crate::sanitize`] normalizes it
//! before anything is persisted.

use crate::models::{Change, OhlcBar, OhlcvBar, SeriesData};

/// Round to two decimal places, leaving non-finite values as they are.
pub fn round2(x: f64) -> f64 {
    if x.is_finite() {
        (x * 100.0).round() / 100.0
    } else {
        x
    }
}

/// Derive the change of every element against its predecessor.
///
/// The first element gets an empty [`Change`]. A missing value on either
/// side leaves `change` and `percentage` empty but still records
/// `previous` when it is known.
pub fn period_changes(values: &[Option<f64>]) -> Vec<Change> {
    let mut out = Vec::with_capacity(values.len());
    for (i, current) in values.iter().enumerate() {
        if i == 0 {
            out.push(Change::default());
            continue;
        }
        let previous = values[i - 1];
        let change = match (current, previous) {
            (Some(cur), Some(prev)) => Some(cur - prev),
            _ => None,
        };
        let percentage = match (change, previous) {
            (Some(delta), Some(prev)) => Some(round2(delta / prev * 100.0)),
            _ => None,
        };
        out.push(Change {
            previous,
            change,
            percentage,
        });
    }
    out
}

/// Fill close- and volume-derived columns of an index series.
pub fn enrich_ohlcv(bars: &mut [OhlcvBar]) {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| b.volume).collect();
    let close_changes = period_changes(&closes);
    let volume_changes = period_changes(&volumes);

    for ((bar, close), volume) in bars.iter_mut().zip(close_changes).zip(volume_changes) {
        bar.close_change = close;
        bar.volume_change = volume;
    }
}

/// Fill close-derived columns of a currency series.
pub fn enrich_ohlc(bars: &mut [OhlcBar]) {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
    for (bar, close) in bars.iter_mut().zip(period_changes(&closes)) {
        bar.close_change = close;
    }
}

/// Apply the calculator appropriate to the series shape.
///
/// Indicator readings already carry their own previous value and get no
/// derived columns.
pub fn enrich(data: &mut SeriesData) {
    match data {
        SeriesData::Index(bars) => enrich_ohlcv(bars),
        SeriesData::Currency(bars) => enrich_ohlc(bars),
        SeriesData::Indicator(_) => {}
    }
}
