//! Summary statistics for one numeric column

use std::fmt;

use arrow::record_batch::RecordBatch;
use serde::Serialize;

use super::key::numeric_values;
use crate::error::Result;

/// Descriptive statistics of the non-null values of a column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    /// Number of non-null values
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value
    pub std: Option<f64>,
    pub min: f64,
    /// First quartile, linearly interpolated
    pub q25: f64,
    pub median: f64,
    /// Third quartile, linearly interpolated
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    /// Statistics of `values`, `None` when there are none
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count  {}", self.count)?;
        writeln!(f, "mean   {:.2}", self.mean)?;
        match self.std {
            Some(std) => writeln!(f, "std    {std:.2}")?,
            None => writeln!(f, "std    -")?,
        }
        writeln!(f, "min    {:.2}", self.min)?;
        writeln!(f, "25%    {:.2}", self.q25)?;
        writeln!(f, "50%    {:.2}", self.median)?;
        writeln!(f, "75%    {:.2}", self.q75)?;
        write!(f, "max    {:.2}", self.max)
    }
}

/// Linear interpolation between the closest ranks of a sorted slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Describe the non-null values of `column`
///
/// # Errors
/// Returns an error if the column is missing or not numeric
pub fn describe(batch: &RecordBatch, column: &str) -> Result<Option<Describe>> {
    let values: Vec<f64> = numeric_values(batch, column)?.into_iter().flatten().collect();
    Ok(Describe::from_values(&values))
}

/// Headline figures of a view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// Rows in the table, nulls included
    pub total_records: usize,
    /// Sum of the non-null values; zero for an empty table
    pub total: f64,
    /// `None` when there are no values
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl Kpis {
    /// KPIs over `value_column`; an empty table gives zero totals and no
    /// extremes
    ///
    /// # Errors
    /// Returns an error if the column is missing or not numeric
    pub fn from_batch(batch: &RecordBatch, value_column: &str) -> Result<Self> {
        let values: Vec<f64> = numeric_values(batch, value_column)?
            .into_iter()
            .flatten()
            .collect();

        let total: f64 = values.iter().sum();
        let mean = (!values.is_empty()).then(|| total / values.len() as f64);
        Ok(Self {
            total_records: batch.num_rows(),
            total,
            mean,
            max: values.iter().copied().reduce(f64::max),
            min: values.iter().copied().reduce(f64::min),
        })
    }
}
