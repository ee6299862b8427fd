//! Export of the filtered table and of the summary tables
//!
//! CSV is the primary format: header row, comma delimiter, UTF-8, one record
//! per line. Parquet is offered for typed round trips.

use std::fmt;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use regex::Regex;

use crate::aggregate::scatter_to_record_batch;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{DashboardError, Result};
use crate::pipeline::DashboardView;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// File encoding of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    /// Format implied by the file extension, if recognised
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Explicit choice first, then the extension, then CSV
    #[must_use]
    pub fn resolve(explicit: Option<Self>, path: &Path) -> Self {
        explicit
            .or_else(|| Self::from_path(path))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(DashboardError::schema(format!(
                "unknown export format '{other}', expected csv or parquet"
            ))),
        }
    }
}

/// Field written for a null value, so an empty field always means `""`
pub const CSV_NULL: &str = "\\N";

/// Write `batch` as CSV with a header row
///
/// Nulls are written as [`CSV_NULL`].
///
/// # Errors
/// Returns an error if a column type has no CSV representation or the
/// writer fails
pub fn write_csv<W: Write>(writer: W, batch: &RecordBatch) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .with_header(true)
        .with_null(CSV_NULL.to_string())
        .build(writer);
    csv.write(batch)?;
    Ok(())
}

/// CSV bytes of `batch`
///
/// # Errors
/// Returns an error if a column type has no CSV representation
pub fn to_csv_bytes(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, batch)?;
    Ok(buf)
}

/// Parse CSV produced by [`write_csv`] back into one batch of `schema`
///
/// Only [`CSV_NULL`] fields read back as null; empty fields are empty strings.
///
/// # Errors
/// Returns an error if the text does not match the schema
pub fn read_csv(bytes: &[u8], schema: SchemaRef) -> Result<RecordBatch> {
    let null_regex = Regex::new(&format!("^{}$", regex::escape(CSV_NULL)))
        .map_err(|e| DashboardError::schema(format!("Invalid CSV null marker: {e}")))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_null_regex(null_regex)
        .build(Cursor::new(bytes))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(format!("user-dashboard {}", env!("CARGO_PKG_VERSION"))),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Write `batch` to a Parquet file
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = safe_create_file(path, "parquet export")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read a Parquet file back into one batch
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = safe_open_file(path, "parquet import")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Write `batch` to `path` in the resolved format
///
/// # Errors
/// Returns an error if the file cannot be written
pub fn export_table(
    path: &Path,
    batch: &RecordBatch,
    format: Option<ExportFormat>,
) -> Result<ExportFormat> {
    let start = Instant::now();
    let format = ExportFormat::resolve(format, path);
    log_operation_start(&format!("Exporting {format} to"), &path.display().to_string());

    match format {
        ExportFormat::Csv => write_csv(safe_create_file(path, "csv export")?, batch)?,
        ExportFormat::Parquet => write_parquet(path, batch)?,
    }

    log_operation_complete(
        "exported",
        &path.display().to_string(),
        batch.num_rows(),
        Some(start.elapsed()),
    );
    Ok(format)
}

/// Write every summary table of `view` as CSV under `dir`
///
/// One file per dimension (`by_<dimension>.csv`), plus `heatmap.csv` and
/// `scatter.csv` when present. An empty view writes nothing.
///
/// # Errors
/// Returns an error if a file cannot be written
pub fn export_summaries(dir: &Path, view: &DashboardView) -> Result<Vec<PathBuf>> {
    let mut tables: Vec<(String, RecordBatch)> = Vec::new();
    for summary in &view.summaries {
        let name = format!("by_{}", summary.dimension.to_string().replace(" x ", "_"));
        tables.push((name, summary.table.to_record_batch()?));
    }
    if let Some(heatmap) = &view.heatmap {
        tables.push(("heatmap".to_string(), heatmap.to_record_batch()?));
    }
    if !view.scatter.is_empty() {
        tables.push(("scatter".to_string(), scatter_to_record_batch(&view.scatter)?));
    }

    let mut written = Vec::with_capacity(tables.len());
    for (name, batch) in tables {
        let path = dir.join(format!("{name}.csv"));
        write_csv(safe_create_file(&path, "summary export")?, &batch)?;
        log::debug!("Wrote {} rows to {}", batch.num_rows(), path.display());
        written.push(path);
    }
    log::info!("Wrote {} summary files to {}", written.len(), dir.display());
    Ok(written)
}
