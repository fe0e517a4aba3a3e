//! Indicator calculator tests.

mod common;

use marketdata_sync::indicators::{enrich, period_changes, round2};
use marketdata_sync::models::Record;
use marketdata_sync::models::{OhlcBar, OhlcvBar};
use marketdata_sync::SeriesData;

fn some(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

#[test]
fn percentage_change_of_three_closes() {
    let changes = period_changes(&some(&[100.0, 110.0, 99.0]));
    let pct: Vec<Option<f64>> = changes.iter().map(|c| c.percentage).collect();
    assert_eq!(pct, vec![None, Some(10.0), Some(-10.0)]);

    assert_eq!(changes[1].previous, Some(100.0));
    assert_eq!(changes[1].change, Some(10.0));
    assert_eq!(changes[2].change, Some(-11.0));
}

#[test]
fn first_row_has_no_derived_values() {
    let changes = period_changes(&some(&[42.0]));
    assert_eq!(changes.len(), 1);
    assert!(changes[0].previous.is_none());
    assert!(changes[0].change.is_none());
    assert!(changes[0].percentage.is_none());
}

#[test]
fn division_by_previous_zero_is_not_finite() {
    let changes = period_changes(&some(&[0.0, 50.0]));
    let pct = changes[1].percentage.unwrap();
    assert!(pct.is_infinite());
    assert_eq!(changes[1].change, Some(50.0));
}

#[test]
fn percentages_are_rounded_to_two_decimals() {
    let changes = period_changes(&some(&[3.0, 4.0]));
    assert_eq!(changes[1].percentage, Some(33.33));
    assert_eq!(round2(-12.3456), -12.35);
    assert!(round2(f64::INFINITY).is_infinite());
}

#[test]
fn missing_value_leaves_change_empty_but_keeps_previous() {
    let changes = period_changes(&[Some(10.0), None, Some(12.0)]);
    assert_eq!(changes[1].previous, Some(10.0));
    assert!(changes[1].change.is_none());
    assert!(changes[2].previous.is_none());
    assert!(changes[2].percentage.is_none());
}

#[test]
fn previous_is_positional_not_calendar() {
    // Out-of-order input: the "previous" of the second element is the first
    // element, even though it is a later date.
    let mut series = common::currency_series("USD_JPY", &[150.0, 140.0]);
    if let SeriesData::Currency(bars) = &mut series.data {
        bars.swap(0, 1);
    }
    enrich(&mut series.data);

    let SeriesData::Currency(bars) = &series.data else {
        panic!("currency series expected");
    };
    assert!(bars[0].date > bars[1].date);
    assert_eq!(bars[1].close_change.previous, Some(140.0));
    assert_eq!(bars[1].close_change.change, Some(10.0));
}

#[test]
fn sort_by_date_restores_calendar_pairing() {
    let mut series = common::currency_series("USD_JPY", &[150.0, 140.0]);
    if let SeriesData::Currency(bars) = &mut series.data {
        bars.swap(0, 1);
    }
    series.data.sort_by_date();
    enrich(&mut series.data);

    let SeriesData::Currency(bars) = &series.data else {
        panic!("currency series expected");
    };
    assert_eq!(bars[1].close_change.previous, Some(150.0));
    assert_eq!(bars[1].close_change.change, Some(-10.0));
}

#[test]
fn index_series_gets_volume_columns() {
    let mut series = common::index_series("NASDAQ", &[100.0, 110.0], &[1000.0, 1500.0]);
    enrich(&mut series.data);

    let SeriesData::Index(bars) = &series.data else {
        panic!("index series expected");
    };
    assert_eq!(bars[1].volume_change.previous, Some(1000.0));
    assert_eq!(bars[1].volume_change.change, Some(500.0));
    assert_eq!(bars[1].volume_change.percentage, Some(50.0));
    assert!(OhlcvBar::columns().contains(&"volume_percentage_change"));
}

#[test]
fn currency_series_has_no_volume_columns() {
    let columns = OhlcBar::columns();
    assert!(!columns.iter().any(|c| c.contains("volume")));
    assert_eq!(&columns[..2], &["date", "name"]);
}

#[test]
fn indicator_readings_are_left_untouched() {
    let readings = vec![common::reading(common::date(2024, 1, 1), "GDP", 2.1, 1.9)];
    let mut data = SeriesData::Indicator(readings.clone());
    enrich(&mut data);
    assert_eq!(data, SeriesData::Indicator(readings));
}
