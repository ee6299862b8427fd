//! A Rust library for turning a nested JSON user feed into a filtered,
//! metric-augmented Arrow table and the summaries a dashboard charts.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod synth;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use pipeline::{DashboardView, Dataset, Dimension, ViewSpec, ViewState};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;

// Stages
pub use aggregate::{
    AggregateTable, Describe, KeyValue, Kpis, Pivot, Reduction, ScatterPoint, group_by, pivot,
    value_counts,
};
pub use fetch::{FileSource, HttpSource, RecordSource, StaticSource};
pub use filter::{FilterOptions, FilterSet, Predicate, Selection};
pub use normalize::flatten_records;
pub use synth::{MetricSynthesizer, SynthRanges, rng_from_seed};

// Export
pub use export::{ExportFormat, export_summaries, export_table, read_csv, write_csv};
