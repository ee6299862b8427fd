//! Grouping keys and column readers

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::{DashboardError, Result};

/// One categorical value of a grouping column
///
/// Ordered with `Null` first, then booleans, integers, floats and text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Absent value; kept as its own group
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Text(String),
}

/// Key of one group: one value per grouping column
pub type GroupKey = SmallVec<[KeyValue; 2]>;

impl KeyValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
        }
    }

    /// Integer payload, if any
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is the absent value
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "(null)"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

fn lookup_column<'a>(batch: &'a RecordBatch, column: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(column).ok_or_else(|| {
        DashboardError::aggregate(format!("Column '{column}' not found in table"))
    })
}

/// Read a categorical column as one key value per row
///
/// # Errors
/// Returns an error if the column is missing or has no key representation
pub fn column_keys(batch: &RecordBatch, column: &str) -> Result<Vec<KeyValue>> {
    let array = lookup_column(batch, column)?;

    let keys = match array.data_type() {
        DataType::Utf8 => downcast::<StringArray>(array, column)?
            .iter()
            .map(|v| v.map_or(KeyValue::Null, KeyValue::from))
            .collect(),
        DataType::Boolean => downcast::<BooleanArray>(array, column)?
            .iter()
            .map(|v| v.map_or(KeyValue::Null, KeyValue::Bool))
            .collect(),
        DataType::Float32 | DataType::Float64 => {
            let floats = cast(array, &DataType::Float64)?;
            downcast::<Float64Array>(&floats, column)?
                .iter()
                .map(|v| v.map_or(KeyValue::Null, KeyValue::Float))
                .collect()
        }
        DataType::Null => vec![KeyValue::Null; array.len()],
        dt if dt.is_integer() => {
            let ints = cast(array, &DataType::Int64)?;
            downcast::<Int64Array>(&ints, column)?
                .iter()
                .map(|v| v.map_or(KeyValue::Null, KeyValue::Int))
                .collect()
        }
        other => {
            return Err(DashboardError::aggregate(format!(
                "Column '{column}' of type {other} cannot be used as a grouping key"
            )));
        }
    };
    Ok(keys)
}

/// Read a numeric column as `f64` values, `None` for nulls
///
/// # Errors
/// Returns an error if the column is missing or not numeric
pub fn numeric_values(batch: &RecordBatch, column: &str) -> Result<Vec<Option<f64>>> {
    let array = lookup_column(batch, column)?;
    if !array.data_type().is_numeric() {
        return Err(DashboardError::aggregate(format!(
            "Column '{column}' of type {} is not numeric",
            array.data_type()
        )));
    }

    let floats = cast(array, &DataType::Float64)?;
    Ok(downcast::<Float64Array>(&floats, column)?.iter().collect())
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        DashboardError::aggregate(format!("Failed to downcast column '{column}'"))
    })
}
