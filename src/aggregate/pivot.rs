//! Two-dimensional aggregation (year × month heatmap)

use std::collections::BTreeMap;

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use super::group::{Reduction, group_by};
use super::key::KeyValue;
use crate::error::Result;

/// One populated cell of a pivot, flattened for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotCell {
    /// Row label as displayed
    pub row: String,
    /// Column label as displayed
    pub column: String,
    pub value: f64,
}

/// Sparse matrix of one reduction over two grouping columns
///
/// Only combinations present in the input hold a cell. Absent combinations
/// are reported as `None` and only become numbers through [`Pivot::dense`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    /// Column whose values label the rows
    pub row_key: String,
    /// Column whose values label the columns
    pub col_key: String,
    /// Column reduced into each cell
    pub value_column: String,
    pub reduction: Reduction,
    rows: Vec<KeyValue>,
    columns: Vec<KeyValue>,
    cells: BTreeMap<(KeyValue, KeyValue), f64>,
}

impl Pivot {
    /// Distinct row labels, ascending
    #[must_use]
    pub fn rows(&self) -> &[KeyValue] {
        &self.rows
    }

    /// Distinct column labels, ascending
    #[must_use]
    pub fn columns(&self) -> &[KeyValue] {
        &self.columns
    }

    /// Number of populated cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at `(row, column)`, `None` when no record has that combination
    #[must_use]
    pub fn get(&self, row: &KeyValue, column: &KeyValue) -> Option<f64> {
        self.cells.get(&(row.clone(), column.clone())).copied()
    }

    /// Populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&KeyValue, &KeyValue, f64)> {
        self.cells.iter().map(|((r, c), v)| (r, c, *v))
    }

    /// Full matrix over [`Pivot::rows`] × [`Pivot::columns`], absent cells
    /// replaced by `fill`
    #[must_use]
    pub fn dense(&self, fill: f64) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| self.get(r, c).unwrap_or(fill))
                    .collect()
            })
            .collect()
    }

    #[must_use]
    pub fn to_cells(&self) -> Vec<PivotCell> {
        self.cells()
            .map(|(r, c, value)| PivotCell {
                row: r.to_string(),
                column: c.to_string(),
                value,
            })
            .collect()
    }

    /// Populated cells as a `row`, `column`, `value` table
    ///
    /// # Errors
    /// Returns an error if the cells cannot be serialized to Arrow
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields = Vec::<FieldRef>::from_type::<PivotCell>(TracingOptions::default())?;
        let cells = self.to_cells();
        Ok(serde_arrow::to_record_batch(&fields, &cells)?)
    }
}

/// Reduce `value_column` over every `(row_key, col_key)` combination
///
/// Cells whose reduction is undefined (a mean over only nulls) stay absent.
///
/// # Errors
/// Returns an error if a column is missing or the value column is not numeric
pub fn pivot(
    batch: &RecordBatch,
    row_key: &str,
    col_key: &str,
    value_column: &str,
    reduction: Reduction,
) -> Result<Pivot> {
    let table = group_by(batch, &[row_key, col_key], value_column)?;

    let cells: BTreeMap<(KeyValue, KeyValue), f64> = table
        .rows
        .iter()
        .filter_map(|row| {
            row.reduce(reduction)
                .map(|v| ((row.key[0].clone(), row.key[1].clone()), v))
        })
        .collect();
    let rows = cells.keys().map(|(r, _)| r.clone()).dedup().collect();
    let columns = cells.keys().map(|(_, c)| c.clone()).sorted().dedup().collect();

    log::debug!(
        "Pivoted {value_column} ({reduction}) by {row_key} x {col_key} into {} cells",
        cells.len()
    );

    Ok(Pivot {
        row_key: row_key.to_string(),
        col_key: col_key.to_string(),
        value_column: value_column.to_string(),
        reduction,
        rows,
        columns,
        cells,
    })
}
