//! Group-by reductions over the filtered table

use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::key::{GroupKey, KeyValue, column_keys, numeric_values};
use crate::error::{DashboardError, Result};

/// Reduction applied to the numeric column of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Number of records in the group
    Count,
    /// Sum of the non-null values
    Sum,
    /// Mean of the non-null values
    Mean,
    /// Smallest value
    Min,
    /// Largest value
    Max,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        };
        write!(f, "{name}")
    }
}

/// Reductions of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// One value per grouping column
    pub key: GroupKey,
    /// Records in the group, including those with a null value
    pub count: usize,
    /// Records in the group with a non-null value
    pub value_count: usize,
    /// Sum of the non-null values (0 when there are none)
    pub sum: f64,
    /// Mean of the non-null values
    pub mean: Option<f64>,
    /// Smallest non-null value
    pub min: Option<f64>,
    /// Largest non-null value
    pub max: Option<f64>,
}

impl AggregateRow {
    /// Value of `reduction` for this group; `None` when it is undefined
    #[must_use]
    pub fn reduce(&self, reduction: Reduction) -> Option<f64> {
        match reduction {
            Reduction::Count => Some(self.count as f64),
            Reduction::Sum => Some(self.sum),
            Reduction::Mean => self.mean,
            Reduction::Min => self.min,
            Reduction::Max => self.max,
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    value_count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        self.count += 1;
        if let Some(v) = value {
            self.value_count += 1;
            self.sum += v;
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn finish(self, key: GroupKey) -> AggregateRow {
        let mean = (self.value_count > 0).then(|| self.sum / self.value_count as f64);
        AggregateRow {
            key,
            count: self.count,
            value_count: self.value_count,
            sum: self.sum,
            mean,
            min: self.min,
            max: self.max,
        }
    }
}

/// Result of grouping a table by one or more columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Grouping column names
    pub keys: Vec<String>,
    /// Reduced numeric column
    pub value_column: String,
    /// One row per distinct key combination, ordered by key
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    fn empty(keys: &[&str], value_column: &str) -> Self {
        Self {
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
            value_column: value_column.to_string(),
            rows: Vec::new(),
        }
    }

    /// Whether there are no groups
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of groups
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Records across all groups
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Sum across all groups
    #[must_use]
    pub fn total_sum(&self) -> f64 {
        self.rows.iter().map(|r| r.sum).sum()
    }

    /// Row for an exact key
    #[must_use]
    pub fn get(&self, key: &[KeyValue]) -> Option<&AggregateRow> {
        self.rows
            .binary_search_by(|row| row.key.as_slice().cmp(key))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// `(key, value)` pairs for one reduction, skipping undefined values
    #[must_use]
    pub fn series(&self, reduction: Reduction) -> Vec<(GroupKey, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.reduce(reduction).map(|v| (r.key.clone(), v)))
            .collect()
    }

    /// Rows ordered by `reduction` descending, ties by key
    #[must_use]
    pub fn ranked_by(&self, reduction: Reduction) -> Vec<&AggregateRow> {
        self.rows
            .iter()
            .sorted_by(|a, b| {
                let av = a.reduce(reduction).unwrap_or(f64::NEG_INFINITY);
                let bv = b.reduce(reduction).unwrap_or(f64::NEG_INFINITY);
                bv.total_cmp(&av).then_with(|| a.key.cmp(&b.key))
            })
            .collect()
    }

    /// Columns: the keys, then `count`, `sum`, `mean`, `min`, `max`
    ///
    /// Key columns holding only integers (and nulls) stay `Int64`, other
    /// key columns are rendered as text.
    ///
    /// # Errors
    /// Returns an error if the batch cannot be assembled
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.keys.len() + 5);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.keys.len() + 5);

        for (idx, name) in self.keys.iter().enumerate() {
            let values = self.rows.iter().map(|r| &r.key[idx]);
            let all_int = values.clone().all(|k| k.is_null() || k.as_i64().is_some());
            if all_int {
                fields.push(Field::new(name, DataType::Int64, true));
                columns.push(Arc::new(values.map(KeyValue::as_i64).collect::<Int64Array>()));
            } else {
                fields.push(Field::new(name, DataType::Utf8, true));
                columns.push(Arc::new(
                    values
                        .map(|k| (!k.is_null()).then(|| k.to_string()))
                        .collect::<StringArray>(),
                ));
            }
        }

        fields.push(Field::new("count", DataType::UInt64, false));
        columns.push(Arc::new(UInt64Array::from_iter_values(
            self.rows.iter().map(|r| r.count as u64),
        )));
        fields.push(Field::new("sum", DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from_iter_values(
            self.rows.iter().map(|r| r.sum),
        )));
        for (name, reduction) in [
            ("mean", Reduction::Mean),
            ("min", Reduction::Min),
            ("max", Reduction::Max),
        ] {
            fields.push(Field::new(name, DataType::Float64, true));
            columns.push(Arc::new(
                self.rows
                    .iter()
                    .map(|r| r.reduce(reduction))
                    .collect::<Float64Array>(),
            ));
        }

        let options = RecordBatchOptions::new().with_row_count(Some(self.rows.len()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            columns,
            &options,
        )?)
    }
}

/// Group `batch` by `keys` and reduce `value_column` within each group
///
/// Every key combination present in the input gets a row, including null
/// keys and single-member groups. An empty table yields an empty result.
///
/// # Errors
/// Returns an error if no key is given, a column is missing, or the value
/// column is not numeric
pub fn group_by(batch: &RecordBatch, keys: &[&str], value_column: &str) -> Result<AggregateTable> {
    if keys.is_empty() {
        return Err(DashboardError::aggregate("at least one grouping key is required"));
    }
    if batch.num_rows() == 0 {
        return Ok(AggregateTable::empty(keys, value_column));
    }

    let key_columns = keys
        .iter()
        .map(|k| column_keys(batch, k))
        .collect::<Result<Vec<_>>>()?;
    let values = numeric_values(batch, value_column)?;

    let mut groups: FxHashMap<GroupKey, Accumulator> = FxHashMap::default();
    for (row, value) in values.into_iter().enumerate() {
        let key: GroupKey = key_columns.iter().map(|col| col[row].clone()).collect();
        groups.entry(key).or_default().push(value);
    }

    let rows = groups
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|(key, acc)| acc.finish(key))
        .collect_vec();

    log::debug!(
        "Grouped {} records by {:?} into {} groups",
        batch.num_rows(),
        keys,
        rows.len()
    );

    Ok(AggregateTable {
        keys: keys.iter().map(|k| (*k).to_string()).collect(),
        value_column: value_column.to_string(),
        rows,
    })
}

/// Records per distinct value of `column`, most frequent first, ties by key
///
/// # Errors
/// Returns an error if the column is missing or cannot be used as a key
pub fn value_counts(batch: &RecordBatch, column: &str) -> Result<Vec<(KeyValue, usize)>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let mut counts: FxHashMap<KeyValue, usize> = FxHashMap::default();
    for key in column_keys(batch, column)? {
        *counts.entry(key).or_insert(0) += 1;
    }

    Ok(counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect())
}
