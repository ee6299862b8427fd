//! Core filtering functionality
//!
//! Predicates are evaluated into boolean masks and applied to every column
//! with Arrow's `filter` kernel.

use arrow::array::{Array, ArrayRef, BooleanArray};
use arrow::compute::{filter as arrow_filter, prep_null_mask_filter};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::error::{DashboardError, Result};

/// Filter a record batch based on a boolean mask
///
/// Null mask slots drop the row.
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep
///
/// # Errors
/// Returns an error if the mask length differs from the row count
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(DashboardError::filter(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    let mask = if mask.null_count() > 0 {
        prep_null_mask_filter(mask)
    } else {
        mask.clone()
    };

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, &mask))
        .collect::<std::result::Result<_, _>>()?;

    let kept = mask.true_count();
    let options = RecordBatchOptions::new().with_row_count(Some(kept));
    Ok(RecordBatch::try_new_with_options(
        batch.schema(),
        filtered_columns,
        &options,
    )?)
}

/// AND a set of masks together; no masks keeps every row
///
/// # Errors
/// Returns an error if the masks have different lengths
pub fn and_masks(rows: usize, masks: &[BooleanArray]) -> Result<BooleanArray> {
    let mut combined = BooleanArray::from(vec![true; rows]);
    for mask in masks {
        if mask.len() != rows {
            return Err(DashboardError::filter(format!(
                "Mask length ({}) doesn't match batch row count ({rows})",
                mask.len()
            )));
        }
        combined = arrow::compute::and(&combined, mask)?;
    }
    Ok(combined)
}
