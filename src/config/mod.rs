//! Configuration for the dashboard pipeline.

use std::fmt;
use std::time::Duration;

use crate::synth::SynthRanges;

/// Default endpoint serving the user dataset
pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com/users";

/// Selection value meaning "do not filter on this column"
pub const DEFAULT_WILDCARD: &str = "Todas";

/// Configuration for a dashboard run
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Endpoint returning a JSON array of user records
    pub api_url: String,
    /// Upper bound for the single fetch request
    pub timeout: Duration,
    /// User agent sent with the fetch request
    pub user_agent: String,
    /// Selection sentinel that disables an equality filter
    pub wildcard: String,
    /// Value ranges for the synthesized metric columns
    pub synth: SynthRanges,
    /// Seed for the synthesized columns; `None` draws from OS entropy
    pub random_seed: Option<u64>,
    /// Number of rows shown in table previews
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("user-dashboard/{}", env!("CARGO_PKG_VERSION")),
            wildcard: DEFAULT_WILDCARD.to_string(),
            synth: SynthRanges::default(),
            random_seed: None,
            preview_rows: 10,
        }
    }
}

impl DashboardConfig {
    /// Defaults overlaid with `DASHBOARD_API_URL`, `DASHBOARD_TIMEOUT_SECS`
    /// and `DASHBOARD_SEED` when set and parseable
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DASHBOARD_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }

        match lookup("DASHBOARD_TIMEOUT_SECS").map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) => self.timeout = Duration::from_secs(secs),
            Some(Err(e)) => log::warn!("Ignoring DASHBOARD_TIMEOUT_SECS: {e}"),
            None => {}
        }

        match lookup("DASHBOARD_SEED").map(|s| s.parse::<u64>()) {
            Some(Ok(seed)) => self.random_seed = Some(seed),
            Some(Err(e)) => log::warn!("Ignoring DASHBOARD_SEED: {e}"),
            None => {}
        }

        self
    }
}

impl fmt::Display for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dashboard Configuration:")?;
        writeln!(f, "  API URL: {}", self.api_url)?;
        writeln!(f, "  Timeout: {:?}", self.timeout)?;
        writeln!(f, "  Wildcard: {}", self.wildcard)?;
        writeln!(f, "  {}", self.synth)?;
        if let Some(seed) = self.random_seed {
            writeln!(f, "  Random Seed: {seed}")?;
        }
        writeln!(f, "  Preview Rows: {}", self.preview_rows)?;
        Ok(())
    }
}
