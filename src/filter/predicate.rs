//! Filter predicates and selections
//!
//! A [`FilterSet`] is the value object carrying the caller's selections into
//! the filter stage. Every predicate it holds must pass for a row to be kept.

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::compute::cast;
use arrow::compute::kernels::cmp::eq;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use super::core::{and_masks, filter_record_batch};
use super::error::column_type_error;
use crate::error::Result;
use crate::utils::logging::log_warning;

/// Flattened column holding the city
pub const CITY_COLUMN: &str = "address_city";
/// Flattened column holding the company name
pub const COMPANY_COLUMN: &str = "company_name";
/// Column searched by the name query
pub const NAME_COLUMN: &str = "name";

/// Trait for objects that can filter record batches
pub trait BatchFilter: fmt::Debug {
    /// Boolean mask of the rows this filter keeps
    ///
    /// # Errors
    /// Returns an error if the filter cannot be evaluated against `batch`
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Returns the set of column names required by this filter
    fn required_columns(&self) -> BTreeSet<String>;

    /// Filter a record batch
    ///
    /// # Errors
    /// Returns an error if filtering fails
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = self.mask(batch)?;
        filter_record_batch(batch, &mask)
    }
}

/// A caller's choice for an equality filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Wildcard: the predicate is not applied
    #[default]
    All,
    /// Keep rows whose value equals this exactly
    Only(String),
}

impl Selection {
    /// Map a UI choice to a selection; `wildcard` means no filtering
    #[must_use]
    pub fn parse(choice: &str, wildcard: &str) -> Self {
        if choice == wildcard {
            Self::All
        } else {
            Self::Only(choice.to_string())
        }
    }

    /// The selected value, `None` for the wildcard
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(v) => Some(v.as_str()),
        }
    }
}

/// A single row predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column value equals `value` exactly
    Equals {
        /// Column to compare
        column: String,
        /// Expected value, parsed to the column type for non-string columns
        value: String,
    },

    /// Column value contains `query`, ignoring case
    ContainsIgnoreCase {
        /// Column to search
        column: String,
        /// Substring to look for
        query: String,
    },
}

impl Predicate {
    /// Column this predicate reads
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Equals { column, .. } | Self::ContainsIgnoreCase { column, .. } => column,
        }
    }

    /// Whether a single string value passes; absent values never do
    #[must_use]
    pub fn matches_str(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Self::Equals { value: expected, .. }, Some(v)) => v == expected,
            (Self::ContainsIgnoreCase { query, .. }, Some(v)) => {
                v.to_lowercase().contains(&query.to_lowercase())
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { column, value } => write!(f, "{column} == {value:?}"),
            Self::ContainsIgnoreCase { column, query } => {
                write!(f, "{column} contains {query:?} (case-insensitive)")
            }
        }
    }
}

impl BatchFilter for Predicate {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let Some(column) = batch.column_by_name(self.column()) else {
            log_warning("Filter column not present, no rows match", Some(self.column()));
            return Ok(BooleanArray::from(vec![false; batch.num_rows()]));
        };

        match self {
            Self::Equals { value, .. } => equals_mask(column, self.column(), value),
            Self::ContainsIgnoreCase { .. } => {
                // Non-text columns are searched through their text rendering
                let text = cast(column, &DataType::Utf8)?;
                Ok(text
                    .as_string::<i32>()
                    .iter()
                    .map(|v| Some(self.matches_str(v)))
                    .collect())
            }
        }
    }

    fn required_columns(&self) -> BTreeSet<String> {
        BTreeSet::from([self.column().to_string()])
    }
}

/// Equality mask using Arrow's comparison kernel
///
/// Values that cannot be parsed to the column type match nothing.
fn equals_mask(column: &ArrayRef, col_name: &str, value: &str) -> Result<BooleanArray> {
    let none = || BooleanArray::from(vec![false; column.len()]);

    let mask = match column.data_type() {
        DataType::Utf8 => eq(column, &StringArray::new_scalar(value))?,
        DataType::Int64 => match value.trim().parse::<i64>() {
            Ok(n) => eq(column, &Int64Array::new_scalar(n))?,
            Err(_) => none(),
        },
        DataType::Float64 => match value.trim().parse::<f64>() {
            Ok(n) => eq(column, &Float64Array::new_scalar(n))?,
            Err(_) => none(),
        },
        DataType::Boolean => match value.trim().parse::<bool>() {
            Ok(b) => eq(column, &BooleanArray::new_scalar(b))?,
            Err(_) => none(),
        },
        DataType::Null => none(),
        other => return column_type_error(col_name, &format!("comparable ({other} found)")),
    };
    Ok(mask)
}

/// Selections applied together with logical AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    /// An empty set, keeping every row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the dashboard filters from raw UI choices
    ///
    /// # Arguments
    /// * `city` - City choice or the wildcard
    /// * `company` - Company choice or the wildcard
    /// * `name` - Name search text, empty for no search
    /// * `wildcard` - Sentinel meaning "no filter"
    #[must_use]
    pub fn from_choices(city: &str, company: &str, name: &str, wildcard: &str) -> Self {
        Self::new()
            .city(Selection::parse(city, wildcard))
            .company(Selection::parse(company, wildcard))
            .name_contains(name)
    }

    /// Add an arbitrary predicate
    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Equality on `column` unless the selection is the wildcard
    #[must_use]
    pub fn equals(self, column: &str, selection: Selection) -> Self {
        match selection {
            Selection::All => self,
            Selection::Only(value) => self.with_predicate(Predicate::Equals {
                column: column.to_string(),
                value,
            }),
        }
    }

    /// Case-insensitive substring search on `column`; an empty query is skipped
    #[must_use]
    pub fn contains(self, column: &str, query: &str) -> Self {
        if query.is_empty() {
            return self;
        }
        self.with_predicate(Predicate::ContainsIgnoreCase {
            column: column.to_string(),
            query: query.to_string(),
        })
    }

    /// Filter on the flattened city column
    #[must_use]
    pub fn city(self, selection: Selection) -> Self {
        self.equals(CITY_COLUMN, selection)
    }

    /// Filter on the flattened company name column
    #[must_use]
    pub fn company(self, selection: Selection) -> Self {
        self.equals(COMPANY_COLUMN, selection)
    }

    /// Search the name column
    #[must_use]
    pub fn name_contains(self, query: &str) -> Self {
        self.contains(NAME_COLUMN, query)
    }

    /// Predicates in the order they were added
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether no predicate is applied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Filter the batch; an empty set returns it unchanged
    ///
    /// # Errors
    /// Returns an error if a predicate cannot be evaluated
    pub fn apply(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        if self.is_empty() {
            return Ok(batch.clone());
        }
        let filtered = self.filter(batch)?;
        log::info!(
            "Filter kept {} of {} records ({})",
            filtered.num_rows(),
            batch.num_rows(),
            self
        );
        Ok(filtered)
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "no filters");
        }
        let parts: Vec<String> = self.predicates.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}

impl BatchFilter for FilterSet {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let masks = self
            .predicates
            .iter()
            .map(|p| {
                let mask = p.mask(batch)?;
                log::debug!("Predicate {p} matched {} rows", mask.true_count());
                Ok(mask)
            })
            .collect::<Result<Vec<_>>>()?;
        and_masks(batch.num_rows(), &masks)
    }

    fn required_columns(&self) -> BTreeSet<String> {
        self.predicates
            .iter()
            .flat_map(BatchFilter::required_columns)
            .collect()
    }
}
