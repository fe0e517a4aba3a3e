use super::value::Value;
use crate::error::{Result, SyncError};
use std::fmt;

/// Name of the calendar-date key column.
pub const DATE_COLUMN: &str = "date";
/// Name of the series-identifier key column.
pub const NAME_COLUMN: &str = "name";

// ---------------------------------------------------------------------------
// Dataset: ordered columns plus rows of tagged values
// ---------------------------------------------------------------------------

/// A table-shaped batch of observations for one series.
///
/// Column order is significant: it becomes the table's column order at
/// creation time and the header order of the CSV export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given column names.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SyncError::InvalidArgument(format!(
                "row has {} values but dataset has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over one column's values, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// First non-missing value of a column, if any.
    ///
    /// NaN counts as missing, so a float column whose leading rows are NaN
    /// still yields its first real observation.
    pub fn sample(&self, index: usize) -> Option<&Value> {
        self.column_values(index).find(|v| !v.is_missing())
    }

    /// Check that both key columns are present.
    pub fn require_key_columns(&self) -> Result<(usize, usize)> {
        let date = self.column_index(DATE_COLUMN).ok_or_else(|| {
            SyncError::InvalidArgument(format!("dataset has no '{}' column", DATE_COLUMN))
        })?;
        let name = self.column_index(NAME_COLUMN).ok_or_else(|| {
            SyncError::InvalidArgument(format!("dataset has no '{}' column", NAME_COLUMN))
        })?;
        Ok((date, name))
    }

    /// Render a row as `col=value, ...` for log lines.
    pub fn describe_row(&self, index: usize) -> String {
        match self.rows.get(index) {
            Some(row) => self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| format!("{}={}", c, v))
                .collect::<Vec<_>>()
                .join(", "),
            None => String::new(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dataset(columns=[{}], rows={})",
            self.columns.join(", "),
            self.rows.len()
        )
    }
}
