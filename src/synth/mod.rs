//! Simulated metric columns
//!
//! The source dataset carries no monetary or temporal information, so the
//! dashboard attaches randomly drawn values to every record. Each value is an
//! independent draw from its configured range; the random source is passed
//! in by the caller so runs can be reproduced from a seed.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DashboardError, Result};

/// Simulated amount per record
pub const MONTO_COLUMN: &str = "monto";
/// Simulated month (1-12)
pub const MONTH_COLUMN: &str = "month";
/// Simulated year
pub const YEAR_COLUMN: &str = "year";
/// Simulated contract count
pub const CONTRACTS_COLUMN: &str = "contracts";

/// Names of every synthesized column, in the order they are appended
pub const SYNTHESIZED_COLUMNS: [&str; 4] =
    [MONTO_COLUMN, MONTH_COLUMN, YEAR_COLUMN, CONTRACTS_COLUMN];

/// Value ranges for the synthesized columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthRanges {
    /// Inclusive range for `monto`
    pub monto: RangeInclusive<i64>,
    /// Inclusive range for `month`
    pub month: RangeInclusive<i64>,
    /// Discrete set `year` is drawn from
    pub years: Vec<i64>,
    /// Inclusive range for `contracts`
    pub contracts: RangeInclusive<i64>,
}

impl Default for SynthRanges {
    fn default() -> Self {
        Self {
            monto: 1000..=10000,
            month: 1..=12,
            years: vec![2022, 2023, 2024],
            contracts: 1..=20,
        }
    }
}

impl fmt::Display for SynthRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Synthetic Ranges: monto {}..={}, month {}..={}, years {:?}, contracts {}..={}",
            self.monto.start(),
            self.monto.end(),
            self.month.start(),
            self.month.end(),
            self.years,
            self.contracts.start(),
            self.contracts.end()
        )
    }
}

impl SynthRanges {
    fn validate(&self) -> Result<()> {
        let ranges = [
            (MONTO_COLUMN, &self.monto),
            (MONTH_COLUMN, &self.month),
            (CONTRACTS_COLUMN, &self.contracts),
        ];
        if let Some((name, range)) = ranges.iter().find(|(_, r)| r.is_empty()) {
            return Err(DashboardError::schema(format!(
                "empty range {}..={} for synthesized column '{name}'",
                range.start(),
                range.end()
            )));
        }
        if self.years.is_empty() {
            return Err(DashboardError::schema(
                "no candidate years for synthesized column 'year'",
            ));
        }
        Ok(())
    }
}

/// Attaches the simulated metric columns to a normalized table
#[derive(Debug, Clone, Default)]
pub struct MetricSynthesizer {
    ranges: SynthRanges,
}

impl MetricSynthesizer {
    /// Create a synthesizer drawing from `ranges`
    #[must_use]
    pub fn new(ranges: SynthRanges) -> Self {
        Self { ranges }
    }

    /// Ranges used by this synthesizer
    #[must_use]
    pub fn ranges(&self) -> &SynthRanges {
        &self.ranges
    }

    /// Append `monto`, `month`, `year` and `contracts` to `batch`
    ///
    /// Existing columns are carried over untouched.
    ///
    /// # Errors
    /// Returns an error if one of the synthesized names is already a column
    /// or a configured range is empty
    pub fn synthesize<R: Rng + ?Sized>(&self, batch: &RecordBatch, rng: &mut R) -> Result<RecordBatch> {
        self.ranges.validate()?;

        let schema = batch.schema();
        if let Some(name) = SYNTHESIZED_COLUMNS
            .iter()
            .find(|name| schema.column_with_name(name).is_some())
        {
            return Err(DashboardError::schema(format!(
                "column '{name}' already exists, refusing to overwrite it"
            )));
        }

        let rows = batch.num_rows();
        let mut monto = Vec::with_capacity(rows);
        let mut month = Vec::with_capacity(rows);
        let mut year = Vec::with_capacity(rows);
        let mut contracts = Vec::with_capacity(rows);
        for _ in 0..rows {
            monto.push(rng.random_range(self.ranges.monto.clone()));
            month.push(rng.random_range(self.ranges.month.clone()));
            year.push(self.ranges.years[rng.random_range(0..self.ranges.years.len())]);
            contracts.push(rng.random_range(self.ranges.contracts.clone()));
        }

        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
        for (name, values) in SYNTHESIZED_COLUMNS
            .iter()
            .zip([monto, month, year, contracts])
        {
            fields.push(Field::new(*name, DataType::Int64, false));
            columns.push(Arc::new(Int64Array::from(values)));
        }

        let options = RecordBatchOptions::new().with_row_count(Some(rows));
        let augmented =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;

        log::debug!("Synthesized {} metric columns for {rows} records", SYNTHESIZED_COLUMNS.len());
        Ok(augmented)
    }
}

/// Random source for a run: seeded when `seed` is set, OS entropy otherwise
#[must_use]
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
