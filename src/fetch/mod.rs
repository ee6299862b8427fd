//! Sources of raw user records
//!
//! The pipeline consumes a JSON array of objects. `HttpSource` performs the
//! single blocking GET against the configured endpoint; `StaticSource` and
//! `FileSource` feed the same shape from memory or disk.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Value;

use crate::config::DashboardConfig;
use crate::error::util::safe_read_to_string;
use crate::error::{DashboardError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Anything that can produce the raw record payload
pub trait RecordSource {
    /// Fetch the raw records
    ///
    /// # Errors
    /// Returns an error if the payload cannot be obtained or is not an array of objects
    fn fetch(&self) -> Result<Vec<Value>>;

    /// Short description used in log lines
    fn describe(&self) -> String;
}

/// Blocking HTTP source
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    /// Create a source for the endpoint named in the configuration
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Self::with_url(&config.api_url, config)
    }

    /// Create a source for an explicit endpoint, keeping the other settings
    pub fn with_url(url: &str, config: &DashboardConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl RecordSource for HttpSource {
    fn fetch(&self) -> Result<Vec<Value>> {
        let start = Instant::now();
        log_operation_start("Fetching records from", &self.url);

        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::FetchStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json()?;
        let records = into_records(body)?;

        log_operation_complete("fetched", &self.url, records.len(), Some(start.elapsed()));
        Ok(records)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Payload held in memory
#[derive(Debug, Clone)]
pub struct StaticSource {
    payload: Value,
}

impl StaticSource {
    /// Wrap already-decoded records
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            payload: Value::Array(records),
        }
    }

    /// Decode a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self {
            payload: serde_json::from_str(text)?,
        })
    }
}

impl RecordSource for StaticSource {
    fn fetch(&self) -> Result<Vec<Value>> {
        into_records(self.payload.clone())
    }

    fn describe(&self) -> String {
        "in-memory payload".to_string()
    }
}

/// Payload stored in a JSON file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Read records from `path`
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for FileSource {
    fn fetch(&self) -> Result<Vec<Value>> {
        let target = self.path.display().to_string();
        log_operation_start("Reading records from", &target);
        let text = safe_read_to_string(&self.path, "offline payload")?;
        let records = into_records(serde_json::from_str(&text)?)?;
        log_operation_complete("read", &target, records.len(), None);
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Check the payload is an array of objects and unwrap it
fn into_records(payload: Value) -> Result<Vec<Value>> {
    let Value::Array(records) = payload else {
        return Err(DashboardError::payload(format!(
            "expected a JSON array of records, got {}",
            json_kind(&payload)
        )));
    };

    if let Some((idx, other)) = records.iter().enumerate().find(|(_, r)| !r.is_object()) {
        return Err(DashboardError::payload(format!(
            "record {idx} is {} instead of an object",
            json_kind(other)
        )));
    }

    Ok(records)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
