//! Error helpers for the filter module

use crate::error::{DashboardError, Result};

/// Create a filter error
pub fn filter_err<T>(message: impl AsRef<str>) -> Result<T> {
    Err(DashboardError::filter(message.as_ref()))
}

/// Create a column type error
///
/// # Arguments
/// * `column_name` - The name of the column
/// * `expected_type` - The expected type
pub fn column_type_error<T>(column_name: &str, expected_type: &str) -> Result<T> {
    filter_err(format!(
        "Column '{column_name}' is not a {expected_type} array"
    ))
}
