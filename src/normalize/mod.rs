//! Flattening of nested JSON records into a single Arrow table
//!
//! Every object-valued attribute is expanded into prefixed scalar columns
//! (`address.geo.lat` becomes `address_geo_lat`). All output rows share one
//! column set: a record missing a nested object, or holding `null` in its
//! place, gets nulls in the corresponding columns.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

use crate::error::{DashboardError, Result};
use crate::fetch::json_kind;
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Joins a parent attribute name and a child field name
pub const SEPARATOR: &str = "_";

/// Shape of the payload discovered across all records
#[derive(Debug, Default)]
struct Layout {
    entries: Vec<(String, Node)>,
}

#[derive(Debug)]
enum Node {
    Leaf { scalar_seen: bool },
    Nested(Layout),
}

impl Layout {
    fn observe(&mut self, object: &Map<String, Value>, prefix: &str, conflicts: &mut Vec<String>) {
        for (key, value) in object {
            let idx = match self.entries.iter().position(|(k, _)| k == key) {
                Some(idx) => idx,
                None => {
                    self.entries
                        .push((key.clone(), Node::Leaf { scalar_seen: false }));
                    self.entries.len() - 1
                }
            };
            let node = &mut self.entries[idx].1;

            match value {
                Value::Object(child) => {
                    if let Node::Leaf { scalar_seen } = *node {
                        if scalar_seen {
                            conflicts.push(join(prefix, key));
                        }
                        *node = Node::Nested(Layout::default());
                    }
                    if let Node::Nested(layout) = node {
                        layout.observe(child, &join(prefix, key), conflicts);
                    }
                }
                Value::Null => {}
                _ => match node {
                    Node::Leaf { scalar_seen } => *scalar_seen = true,
                    Node::Nested(_) => conflicts.push(join(prefix, key)),
                },
            }
        }
    }

    fn columns(&self, prefix: &str, path: &[String], out: &mut Vec<ColumnPath>) {
        for (key, node) in &self.entries {
            let name = join(prefix, key);
            let mut child_path = path.to_vec();
            child_path.push(key.clone());
            match node {
                Node::Leaf { .. } => out.push(ColumnPath {
                    name,
                    path: child_path,
                }),
                Node::Nested(layout) => layout.columns(&name, &child_path, out),
            }
        }
    }
}

#[derive(Debug)]
struct ColumnPath {
    name: String,
    path: Vec<String>,
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

fn lookup<'a>(record: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = record;
    for key in path {
        current = current.as_object()?.get(key)?;
    }
    if current.is_object() {
        return None;
    }
    Some(current)
}

/// Flatten raw records into a table with one row per record
///
/// # Errors
/// Returns an error if a record is not a JSON object or two flattened
/// attributes collide on the same column name
pub fn flatten_records(records: &[Value]) -> Result<RecordBatch> {
    let start = Instant::now();
    log_operation_start("Normalizing", &format!("{} raw records", records.len()));

    let mut layout = Layout::default();
    let mut conflicts = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or_else(|| {
            DashboardError::payload(format!(
                "record {idx} is {} instead of an object",
                json_kind(record)
            ))
        })?;
        layout.observe(object, "", &mut conflicts);
    }

    for name in conflicts.iter().unique() {
        log_warning(
            "Scalar value found where other records hold an object, treating as null",
            Some(name.as_str()),
        );
    }

    let mut columns = Vec::new();
    layout.columns("", &[], &mut columns);

    let mut seen = FxHashSet::default();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
        return Err(DashboardError::schema(format!(
            "flattened column name '{}' is produced by more than one attribute",
            dup.name
        )));
    }

    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());
    for column in &columns {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|r| lookup(r, &column.path).filter(|v| !v.is_null()))
            .collect();
        let array = build_array(&values);
        fields.push(Field::new(&column.name, array.data_type().clone(), true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    let batch =
        RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;

    log::debug!(
        "Flattened layout into {} columns: {:?}",
        batch.num_columns(),
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );
    log_operation_complete("normalized", "payload", batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Infer the narrowest column type covering every non-null value
fn infer_type(values: &[Option<&Value>]) -> DataType {
    let mut present = values.iter().flatten().peekable();
    if present.peek().is_none() {
        return DataType::Utf8;
    }

    let mut all_int = true;
    let mut all_number = true;
    let mut all_bool = true;
    for value in present {
        all_int &= value.as_i64().is_some();
        all_number &= value.is_number();
        all_bool &= value.is_boolean();
    }

    if all_int {
        DataType::Int64
    } else if all_number {
        DataType::Float64
    } else if all_bool {
        DataType::Boolean
    } else {
        DataType::Utf8
    }
}

fn build_array(values: &[Option<&Value>]) -> ArrayRef {
    match infer_type(values) {
        DataType::Int64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_i64))
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect::<Float64Array>(),
        ),
        DataType::Boolean => Arc::new(
            values
                .iter()
                .map(|v| v.and_then(Value::as_bool))
                .collect::<BooleanArray>(),
        ),
        _ => Arc::new(
            values
                .iter()
                .map(|v| {
                    v.map(|value| match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect::<StringArray>(),
        ),
    }
}
