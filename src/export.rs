//! CSV export of a series, one file per series, rewritten on every run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Dataset, Value};

/// UTF-8 byte-order mark, so spreadsheet tools pick the right encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Dates in exported files.
pub const EXPORT_DATE_FORMAT: &str = "%Y/%m/%d";

/// Render one cell. Nulls and NaN become empty fields.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float(f) if f.is_nan() => String::new(),
        Value::Date(d) => d.format(EXPORT_DATE_FORMAT).to_string(),
        other => other.to_string(),
    }
}

/// Write a dataset as CSV to any writer: BOM, header, one line per row.
pub fn write_csv<W: Write>(mut writer: W, dataset: &Dataset) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.columns())?;
    for row in dataset.rows() {
        wtr.write_record(row.iter().map(render))?;
    }
    wtr.flush()?;
    Ok(())
}

/// File name used for a series.
///
/// Path separators are replaced so a series name can never escape the
/// output directory.
pub fn file_name(series: &str) -> String {
    let safe: String = series
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    format!("{}.csv", safe)
}

/// Write `dataset` to `<dir>/<series>.csv`, replacing any previous file.
pub fn export_series(dir: &Path, series: &str, dataset: &Dataset) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(series));
    let file = File::create(&path)?;
    write_csv(BufWriter::new(file), dataset)?;
    tracing::info!(series = series, path = %path.display(), rows = dataset.len(), "series exported");
    Ok(path)
}
