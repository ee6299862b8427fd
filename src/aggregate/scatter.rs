//! Point series for relation plots (amount against contract count)

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use super::key::{column_keys, numeric_values};
use crate::error::Result;

/// One record projected onto two numeric axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    /// Horizontal coordinate (contract count on the dashboard)
    pub x: f64,
    /// Vertical coordinate (amount on the dashboard)
    pub y: f64,
    /// Series the point is coloured by
    pub group: Option<String>,
    /// Hover labels, joined with `" | "`
    pub label: Option<String>,
}

/// Project every record with both coordinates onto `(x, y)`
///
/// Records with a null coordinate are skipped. Label columns that are
/// missing from the table are ignored.
///
/// # Errors
/// Returns an error if an axis column is missing or not numeric, or the
/// group column is missing
pub fn scatter(
    batch: &RecordBatch,
    x: &str,
    y: &str,
    group: &str,
    labels: &[&str],
) -> Result<Vec<ScatterPoint>> {
    let xs = numeric_values(batch, x)?;
    let ys = numeric_values(batch, y)?;
    let groups = column_keys(batch, group)?;

    let label_columns: Vec<ArrayRef> = labels
        .iter()
        .filter_map(|name| batch.column_by_name(name).cloned())
        .collect();
    let options = FormatOptions::default();
    let formatters = label_columns
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut points = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let (Some(px), Some(py)) = (xs[row], ys[row]) else {
            continue;
        };
        let parts: Vec<String> = label_columns
            .iter()
            .zip(&formatters)
            .filter(|(col, _)| col.is_valid(row))
            .map(|(_, fmt)| fmt.value(row).to_string())
            .collect();
        points.push(ScatterPoint {
            x: px,
            y: py,
            group: (!groups[row].is_null()).then(|| groups[row].to_string()),
            label: (!parts.is_empty()).then(|| parts.join(" | ")),
        });
    }
    Ok(points)
}

/// Points as an `x`, `y`, `group`, `label` table
///
/// # Errors
/// Returns an error if the points cannot be serialized to Arrow
pub fn scatter_to_record_batch(points: &[ScatterPoint]) -> Result<RecordBatch> {
    let fields = Vec::<FieldRef>::from_type::<ScatterPoint>(TracingOptions::default())?;
    Ok(serde_arrow::to_record_batch(&fields, &points)?)
}
