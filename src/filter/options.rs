//! Choices offered for the equality filters
//!
//! Mirrors the dashboard sidebar: the wildcard first, then the sorted distinct
//! values present in the table.

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use itertools::Itertools;
use serde::Serialize;

use super::predicate::{CITY_COLUMN, COMPANY_COLUMN};
use crate::error::Result;

/// Sorted distinct non-null values of `column`; empty when the column is absent
///
/// # Errors
/// Returns an error if the column values cannot be rendered as text
pub fn distinct_values(batch: &RecordBatch, column: &str) -> Result<Vec<String>> {
    let Some(array) = batch.column_by_name(column) else {
        return Ok(Vec::new());
    };

    if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        return Ok(strings
            .iter()
            .flatten()
            .map(str::to_string)
            .sorted()
            .dedup()
            .collect());
    }

    let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
    Ok((0..array.len())
        .filter(|&i| array.is_valid(i))
        .map(|i| formatter.value(i).to_string())
        .sorted()
        .dedup()
        .collect())
}

/// Choices for the city and company selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Sentinel listed first in every selector
    pub wildcard: String,
    /// Distinct cities
    pub cities: Vec<String>,
    /// Distinct company names
    pub companies: Vec<String>,
}

impl FilterOptions {
    /// Collect the selector choices from the unfiltered table
    pub fn from_batch(batch: &RecordBatch, wildcard: &str) -> Result<Self> {
        Ok(Self {
            wildcard: wildcard.to_string(),
            cities: distinct_values(batch, CITY_COLUMN)?,
            companies: distinct_values(batch, COMPANY_COLUMN)?,
        })
    }

    /// Wildcard followed by the cities
    #[must_use]
    pub fn city_choices(&self) -> Vec<String> {
        std::iter::once(self.wildcard.clone())
            .chain(self.cities.iter().cloned())
            .collect()
    }

    /// Wildcard followed by the companies
    #[must_use]
    pub fn company_choices(&self) -> Vec<String> {
        std::iter::once(self.wildcard.clone())
            .chain(self.companies.iter().cloned())
            .collect()
    }
}
