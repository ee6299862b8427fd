//! Aggregation of the filtered table
//!
//! Everything here is a pure function of its input table. Empty input is
//! never an error: it yields empty tables, empty pivots and `None`
//! statistics, leaving the empty-state handling to the caller.

mod describe;
mod group;
mod key;
mod pivot;
mod scatter;

pub use describe::{Describe, Kpis, describe};
pub use group::{AggregateRow, AggregateTable, Reduction, group_by, value_counts};
pub use key::{GroupKey, KeyValue, column_keys, numeric_values};
pub use pivot::{Pivot, PivotCell, pivot};
pub use scatter::{ScatterPoint, scatter, scatter_to_record_batch};
