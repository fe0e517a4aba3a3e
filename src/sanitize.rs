//! Numeric clean-up applied before anything reaches a file or the store.
//!
//! Two independent stages:
//! - [`replace_infinite`] turns `+inf`/`-inf` into `0.0`;
//! - [`fill_missing`] turns null and NaN into the zero of the column's
//!   storage category.

use crate::models::{Dataset, Value, DATE_COLUMN, NAME_COLUMN};
use crate::schema::TableSchema;

/// Replace every infinite float with `0.0`. Finite values and non-numeric
/// cells are untouched.
///
/// Returns the number of cells replaced.
pub fn replace_infinite(dataset: &mut Dataset) -> usize {
    let mut replaced = 0;
    for row in dataset.rows_mut() {
        for cell in row.iter_mut() {
            if let Value::Float(f) = cell {
                if f.is_infinite() {
                    *f = 0.0;
                    replaced += 1;
                }
            }
        }
    }
    replaced
}

/// Replace missing cells (null, NaN) with the zero of their column's
/// category in `schema`.
///
/// The key columns and columns whose category has no zero (timestamps) keep
/// their nulls. Columns absent from `schema` are treated as floats.
///
/// Returns the number of cells replaced.
pub fn fill_missing(dataset: &mut Dataset, schema: &TableSchema) -> usize {
    let zeros: Vec<Option<Value>> = dataset
        .columns()
        .iter()
        .map(|name| {
            if name == DATE_COLUMN || name == NAME_COLUMN {
                return None;
            }
            schema
                .category_of(name)
                .map(|c| c.zero())
                .unwrap_or(Some(Value::Float(0.0)))
        })
        .collect();

    let mut replaced = 0;
    for row in dataset.rows_mut() {
        for (cell, zero) in row.iter_mut().zip(&zeros) {
            if let Some(zero) = zero {
                if cell.is_missing() {
                    *cell = zero.clone();
                    replaced += 1;
                }
            }
        }
    }
    replaced
}

/// Whether any float cell is NaN or infinite.
pub fn has_non_finite(dataset: &Dataset) -> bool {
    dataset
        .rows()
        .iter()
        .flatten()
        .any(|v| matches!(v, Value::Float(f) if !f.is_finite()))
}
