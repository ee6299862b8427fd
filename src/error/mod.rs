//! Error handling for the dashboard pipeline.

pub mod util;

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the dashboard pipeline
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The remote endpoint answered with a non-success status
    #[error("Fetch failed: HTTP {status} from {url}")]
    FetchStatus {
        /// Endpoint that was requested
        url: String,
        /// Status code returned by the endpoint
        status: u16,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error decoding JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload does not have the expected shape
    #[error("Payload error: {0}")]
    Payload(String),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error writing or reading Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error converting typed rows to record batches
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_arrow::Error),

    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error with the table layout
    #[error("Schema error: {0}")]
    Schema(String),

    /// Error evaluating a filter predicate
    #[error("Filter error: {0}")]
    Filter(String),

    /// Error grouping or reducing a column
    #[error("Aggregation error: {0}")]
    Aggregate(String),
}

impl DashboardError {
    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a filter error
    pub fn filter(message: impl Into<String>) -> Self {
        Self::Filter(message.into())
    }

    /// Create an aggregation error
    pub fn aggregate(message: impl Into<String>) -> Self {
        Self::Aggregate(message.into())
    }

    /// Create a payload error
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }

    /// Whether the error came from the fetch stage.
    ///
    /// Fetch failures are terminal for a run: nothing downstream is produced.
    #[must_use]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchStatus { .. } | Self::Transport(_))
    }
}

/// Result type for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;
