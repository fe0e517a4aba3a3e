//! End-to-end runs of the pipeline against in-memory sources and an
//! in-memory DuckDB store.

mod common;

use common::{FakeIndicators, FakeMarket};
use marketdata_sync::config::StoreDescriptor;
use marketdata_sync::schema::Reconciled;
use marketdata_sync::{Connection, Pipeline, PipelineConfig, SeriesKind, Stage};

fn today() -> chrono::NaiveDate {
    common::date(2024, 1, 31)
}

fn pipeline(config: PipelineConfig) -> Pipeline {
    Pipeline::with_connection(config, common::memory_store())
}

#[test]
fn first_run_creates_exports_and_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[("NASDAQ", "^IXIC")], &[]);
    let market = FakeMarket::default().with(
        "^IXIC",
        common::raw_bars(&[100.0, 110.0, 99.0], Some(&[1000.0, 1200.0, 900.0])),
    );

    let p = pipeline(config);
    let summary = p.run(&market, None, today());

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 0);
    let report = summary.report_for("NASDAQ").unwrap();
    assert_eq!(report.kind, SeriesKind::Index);
    assert_eq!(report.reconciled, Reconciled::Created);
    assert_eq!(report.upsert.inserted, 3);
    assert_eq!(p.connection().row_count("NASDAQ").unwrap(), 3);

    let export = report.export_path.as_ref().unwrap();
    assert!(export.ends_with("exports/NASDAQ.csv"));
    assert!(export.exists());

    let rows = p.connection().series_rows("NASDAQ", None, None).unwrap();
    assert_eq!(rows[1]["percentage_change"].as_f64(), Some(10.0));
    assert_eq!(rows[2]["percentage_change"].as_f64(), Some(-10.0));
    assert_eq!(rows[1]["volume_change"].as_f64(), Some(200.0));
}

#[test]
fn rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[("NASDAQ", "^IXIC")], &[]);
    let market = FakeMarket::default().with(
        "^IXIC",
        common::raw_bars(&[100.0, 110.0, 99.0], Some(&[1000.0, 1200.0, 900.0])),
    );
    let p = pipeline(config);

    p.run(&market, None, today());
    let second = p.run(&market, None, today());

    let report = second.report_for("NASDAQ").unwrap();
    assert_eq!(report.reconciled, Reconciled::Existing);
    assert_eq!(report.upsert.updated, 3);
    assert_eq!(report.upsert.inserted, 0);
    assert_eq!(p.connection().row_count("NASDAQ").unwrap(), 3);
    assert_eq!(second.tables_created(), 0);
}

#[test]
fn division_by_zero_is_stored_as_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[], &[("USD_XXX", "XXX=X")]);
    let market = FakeMarket::default().with("XXX=X", common::raw_bars(&[0.0, 50.0], None));
    let p = pipeline(config);

    let summary = p.run(&market, None, today());
    let report = summary.report_for("USD_XXX").unwrap();
    assert_eq!(report.infinities_replaced, 1);

    let rows = p.connection().series_rows("USD_XXX", None, None).unwrap();
    assert_eq!(rows[1]["percentage_change"].as_f64(), Some(0.0));
    assert_eq!(rows[1]["price_change"].as_f64(), Some(50.0));
    // first row had no predecessor and is zero-filled
    assert_eq!(rows[0]["previous_close"].as_f64(), Some(0.0));
}

#[test]
fn single_row_series_creates_text_derived_columns() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[], &[("USD_JPY", "JPY=X")]);
    let market = FakeMarket::default().with("JPY=X", common::raw_bars(&[150.0], None));
    let p = pipeline(config);

    let summary = p.run(&market, None, today());
    assert_eq!(summary.report_for("USD_JPY").unwrap().upsert.inserted, 1);

    let rows = p.connection().series_rows("USD_JPY", None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["percentage_change"], "0");
    assert_eq!(rows[0]["close"].as_f64(), Some(150.0));
}

#[test]
fn currency_tables_have_no_volume_columns() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[], &[("EUR_USD", "EURUSD=X")]);
    let market =
        FakeMarket::default().with("EURUSD=X", common::raw_bars(&[1.08, 1.09], None));
    let p = pipeline(config);
    p.run(&market, None, today());

    let cols = p
        .connection()
        .execute(
            "SELECT column_name FROM information_schema.columns WHERE table_name = ?",
            &["EUR_USD".to_string()],
        )
        .unwrap();
    assert_eq!(cols.len(), 9);
    assert!(cols
        .iter()
        .all(|c| !c["column_name"].as_str().unwrap().contains("volume")));
}

#[test]
fn failing_symbol_is_skipped_and_run_continues_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(
        dir.path(),
        &[("A", "AAA"), ("B", "BBB")],
        &[("C", "CCC")],
    );
    let market = FakeMarket::default()
        .with("AAA", common::raw_bars(&[1.0, 2.0], Some(&[10.0, 20.0])))
        .with("CCC", common::raw_bars(&[3.0, 4.0], None))
        .failing("BBB");
    let p = pipeline(config);

    let summary = p.run(&market, None, today());

    assert_eq!(*market.requests.borrow(), vec!["AAA", "BBB", "CCC"]);
    assert_eq!(summary.total(), 3);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].series, "B");
    assert!(summary.failures[0].error.contains("503"));
    assert_eq!(p.connection().tables().unwrap(), vec!["A", "C"]);
}

#[test]
fn empty_series_is_recorded_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[("EMPTY", "NONE")], &[]);
    let p = pipeline(config);

    let summary = p.run(&FakeMarket::default(), None, today());
    assert_eq!(summary.failed(), 1);
    assert!(p.connection().tables().unwrap().is_empty());
}

#[test]
fn indicators_share_one_table_keyed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[], &[]);
    let d = common::date(2024, 1, 1);
    let source = FakeIndicators(vec![
        common::reading(d, "GDP Growth Rate", 2.3, 1.4),
        common::reading(d, "Inflation Rate", 2.4, 2.9),
    ]);
    let p = pipeline(config);

    let summary = p.run(&FakeMarket::default(), Some(&source), today());
    let report = summary.report_for("Taiwan_Economic_Data").unwrap();
    assert_eq!(report.kind, SeriesKind::Indicator);
    assert_eq!(report.upsert.inserted, 2);

    let rows = p
        .connection()
        .series_rows("Taiwan_Economic_Data", Some("Inflation Rate"), None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["current"].as_f64(), Some(2.4));
    assert_eq!(rows[0]["date"], "2024-01-01");
}

#[test]
fn existing_table_missing_a_column_fails_only_that_series() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(
        dir.path(),
        &[("NASDAQ", "^IXIC"), ("HSI", "^HSI")],
        &[],
    );
    let market = FakeMarket::default()
        .with("^IXIC", common::raw_bars(&[1.0, 2.0], Some(&[1.0, 1.0])))
        .with("^HSI", common::raw_bars(&[3.0, 4.0], Some(&[1.0, 1.0])));
    let p = pipeline(config);
    p.connection()
        .raw()
        .execute_batch(
            "CREATE TABLE \"NASDAQ\" (\"date\" DATE NOT NULL, \"name\" VARCHAR, \"close\" DOUBLE)",
        )
        .unwrap();

    let summary = p.run(&market, None, today());
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].series, "NASDAQ");
    assert_eq!(p.connection().row_count("HSI").unwrap(), 2);
    assert_eq!(p.connection().row_count("NASDAQ").unwrap(), 0);
}

#[test]
fn selected_stages_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path(), &[("A", "AAA")], &[("C", "CCC")]);
    let market = FakeMarket::default()
        .with("AAA", common::raw_bars(&[1.0], Some(&[1.0])))
        .with("CCC", common::raw_bars(&[1.0], None));
    let p = pipeline(config);

    let summary = p.run_stages(&[Stage::Currencies], &market, None, today());
    assert_eq!(*market.requests.borrow(), vec!["CCC"]);
    assert_eq!(summary.total(), 1);
}

#[test]
fn file_store_persists_across_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db").join("market.duckdb");
    let config = PipelineConfig {
        store: StoreDescriptor::File(db.clone()),
        ..common::test_config(dir.path(), &[], &[("USD_TWD", "TWD=X")])
    };
    let market = FakeMarket::default().with("TWD=X", common::raw_bars(&[31.0, 31.5], None));

    {
        let p = Pipeline::new(config).unwrap();
        assert_eq!(p.run(&market, None, today()).succeeded(), 1);
    }

    let conn = Connection::open(&StoreDescriptor::File(db)).unwrap();
    assert_eq!(conn.row_count("USD_TWD").unwrap(), 2);
}
