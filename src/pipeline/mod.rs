//! End-to-end dashboard pipeline
//!
//! A [`Dataset`] is built once per run (fetch, normalize, synthesize). Every
//! filter change then produces a fresh [`DashboardView`] from it: the
//! filtered table plus the aggregations requested by a [`ViewSpec`].

use std::fmt;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::aggregate::{
    AggregateTable, Describe, KeyValue, Kpis, Pivot, PivotCell, Reduction, ScatterPoint, describe,
    group_by, pivot, scatter, value_counts,
};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::fetch::RecordSource;
use crate::filter::{CITY_COLUMN, COMPANY_COLUMN, FilterOptions, FilterSet, NAME_COLUMN};
use crate::normalize::flatten_records;
use crate::synth::{
    CONTRACTS_COLUMN, MONTH_COLUMN, MONTO_COLUMN, MetricSynthesizer, YEAR_COLUMN, rng_from_seed,
};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Advisory attached to a view whose filters matched nothing
pub const EMPTY_ADVISORY: &str = "No records match the selected filters.";

const EMAIL_COLUMN: &str = "email";

/// Grouping dimension of a summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    City,
    Company,
    Month,
    Year,
    /// Stacked bars: month, then company
    MonthCompany,
    /// Heatmap rows: year, then month
    YearMonth,
}

impl Dimension {
    /// Every dimension, in display order
    pub const ALL: [Self; 6] = [
        Self::City,
        Self::Company,
        Self::Month,
        Self::Year,
        Self::MonthCompany,
        Self::YearMonth,
    ];

    /// Columns grouped by this dimension
    #[must_use]
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Self::City => &[CITY_COLUMN],
            Self::Company => &[COMPANY_COLUMN],
            Self::Month => &[MONTH_COLUMN],
            Self::Year => &[YEAR_COLUMN],
            Self::MonthCompany => &[MONTH_COLUMN, COMPANY_COLUMN],
            Self::YearMonth => &[YEAR_COLUMN, MONTH_COLUMN],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::City => "city",
            Self::Company => "company",
            Self::Month => "month",
            Self::Year => "year",
            Self::MonthCompany => "month x company",
            Self::YearMonth => "year x month",
        };
        write!(f, "{label}")
    }
}

/// Which aggregations a view computes
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    /// Summary tables to build
    pub dimensions: Vec<Dimension>,
    /// Numeric column reduced by every summary
    pub value_column: String,
    /// Build the year x month sum matrix
    pub heatmap: bool,
    /// Build the amount vs. contracts point series
    pub scatter: bool,
}

impl Default for ViewSpec {
    fn default() -> Self {
        Self {
            dimensions: Dimension::ALL.to_vec(),
            value_column: MONTO_COLUMN.to_string(),
            heatmap: true,
            scatter: true,
        }
    }
}

impl ViewSpec {
    /// Only the filtered table, KPIs and statistics
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            dimensions: Vec::new(),
            heatmap: false,
            scatter: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: &[Dimension]) -> Self {
        self.dimensions = dimensions.to_vec();
        self
    }
}

/// Whether a view has anything to chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    Populated,
    Empty { advisory: String },
}

impl ViewState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Message to show instead of charts
    #[must_use]
    pub fn advisory(&self) -> Option<&str> {
        match self {
            Self::Populated => None,
            Self::Empty { advisory } => Some(advisory.as_str()),
        }
    }
}

/// Records per distinct value of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    /// Column the values come from
    pub column: String,
    /// Records per value, most frequent first
    pub counts: Vec<(KeyValue, usize)>,
}

/// Summary table for one dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub table: AggregateTable,
}

/// Everything the dashboard renders for one set of filters
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Selections the view was built from
    pub filters: FilterSet,
    /// Filtered records, in input order
    pub table: RecordBatch,
    pub state: ViewState,
    pub kpis: Kpis,
    /// Statistics of the value column; `None` for an empty view
    pub describe: Option<Describe>,
    /// Records per city and per company
    pub distributions: Vec<Distribution>,
    /// One table per requested dimension whose columns are present
    pub summaries: Vec<DimensionSummary>,
    /// Year x month sums of the value column
    pub heatmap: Option<Pivot>,
    /// Amount against contract count, coloured by company
    pub scatter: Vec<ScatterPoint>,
    /// When the view was computed
    pub generated_at: DateTime<Utc>,
}

impl DashboardView {
    /// Summary table for `dimension`, if it was built
    #[must_use]
    pub fn summary(&self, dimension: Dimension) -> Option<&AggregateTable> {
        self.summaries
            .iter()
            .find(|s| s.dimension == dimension)
            .map(|s| &s.table)
    }

    /// Serializable digest of the view (everything except the table itself)
    #[must_use]
    pub fn report(&self) -> ViewReport {
        ViewReport {
            filters: self.filters.to_string(),
            state: self.state.clone(),
            records: self.table.num_rows(),
            kpis: self.kpis.clone(),
            describe: self.describe.clone(),
            distributions: self.distributions.clone(),
            summaries: self.summaries.clone(),
            heatmap: self.heatmap.as_ref().map(Pivot::to_cells).unwrap_or_default(),
            scatter: self.scatter.clone(),
            generated_at: self.generated_at,
        }
    }
}

/// JSON form of a [`DashboardView`]
#[derive(Debug, Clone, Serialize)]
pub struct ViewReport {
    pub filters: String,
    #[serde(flatten)]
    pub state: ViewState,
    pub records: usize,
    pub kpis: Kpis,
    pub describe: Option<Describe>,
    pub distributions: Vec<Distribution>,
    pub summaries: Vec<DimensionSummary>,
    pub heatmap: Vec<PivotCell>,
    pub scatter: Vec<ScatterPoint>,
    pub generated_at: DateTime<Utc>,
}

/// The normalized, metric-augmented table of one run
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Fetch, normalize and synthesize, seeding from the configuration
    ///
    /// # Errors
    /// Returns an error if the fetch fails or the payload cannot be tabulated
    pub fn load(source: &dyn RecordSource, config: &DashboardConfig) -> Result<Self> {
        let mut rng = rng_from_seed(config.random_seed);
        Self::load_with_rng(source, config, &mut rng)
    }

    /// [`Dataset::load`] with a caller-supplied random source
    ///
    /// # Errors
    /// Returns an error if the fetch fails or the payload cannot be tabulated
    pub fn load_with_rng<R: Rng + ?Sized>(
        source: &dyn RecordSource,
        config: &DashboardConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let start = Instant::now();
        let records = source.fetch()?;
        let normalized = flatten_records(&records)?;
        let batch = MetricSynthesizer::new(config.synth.clone()).synthesize(&normalized, rng)?;
        log_operation_complete("loaded", &source.describe(), batch.num_rows(), Some(start.elapsed()));
        Ok(Self { batch })
    }

    /// Wrap an already prepared table
    #[must_use]
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Selector choices over the unfiltered table
    ///
    /// # Errors
    /// Returns an error if a column cannot be rendered as text
    pub fn filter_options(&self, wildcard: &str) -> Result<FilterOptions> {
        FilterOptions::from_batch(&self.batch, wildcard)
    }

    /// Filter the table and compute the requested aggregations
    ///
    /// An empty selection is not an error: the view carries the empty table,
    /// zero KPIs and [`ViewState::Empty`], with no summaries.
    ///
    /// # Errors
    /// Returns an error if a predicate or aggregation cannot be evaluated
    pub fn view(&self, filters: &FilterSet, view_spec: &ViewSpec) -> Result<DashboardView> {
        let start = Instant::now();
        log_operation_start("Building view for", &filters.to_string());

        let table = filters.apply(&self.batch)?;
        let kpis = Kpis::from_batch(&table, &view_spec.value_column)?;
        let generated_at = Utc::now();

        if table.num_rows() == 0 {
            log::info!("{EMPTY_ADVISORY}");
            return Ok(DashboardView {
                filters: filters.clone(),
                table,
                state: ViewState::Empty {
                    advisory: EMPTY_ADVISORY.to_string(),
                },
                kpis,
                describe: None,
                distributions: Vec::new(),
                summaries: Vec::new(),
                heatmap: None,
                scatter: Vec::new(),
                generated_at,
            });
        }

        let describe = describe(&table, &view_spec.value_column)?;

        let mut distributions = Vec::new();
        for column in [CITY_COLUMN, COMPANY_COLUMN] {
            if has_columns(&table, &[column]) {
                distributions.push(Distribution {
                    column: column.to_string(),
                    counts: value_counts(&table, column)?,
                });
            }
        }

        let mut summaries = Vec::with_capacity(view_spec.dimensions.len());
        for &dimension in &view_spec.dimensions {
            if !has_columns(&table, dimension.keys()) {
                continue;
            }
            summaries.push(DimensionSummary {
                dimension,
                table: group_by(&table, dimension.keys(), &view_spec.value_column)?,
            });
        }

        let heatmap = if view_spec.heatmap && has_columns(&table, &[YEAR_COLUMN, MONTH_COLUMN]) {
            Some(pivot(
                &table,
                YEAR_COLUMN,
                MONTH_COLUMN,
                &view_spec.value_column,
                Reduction::Sum,
            )?)
        } else {
            None
        };

        let scatter = if view_spec.scatter && has_columns(&table, &[CONTRACTS_COLUMN, COMPANY_COLUMN]) {
            scatter(
                &table,
                CONTRACTS_COLUMN,
                &view_spec.value_column,
                COMPANY_COLUMN,
                &[NAME_COLUMN, EMAIL_COLUMN],
            )?
        } else {
            Vec::new()
        };

        log_operation_complete("aggregated", "filtered table", table.num_rows(), Some(start.elapsed()));
        Ok(DashboardView {
            filters: filters.clone(),
            table,
            state: ViewState::Populated,
            kpis,
            describe,
            distributions,
            summaries,
            heatmap,
            scatter,
            generated_at,
        })
    }
}

fn has_columns(batch: &RecordBatch, columns: &[&str]) -> bool {
    let schema = batch.schema();
    match columns.iter().find(|c| schema.column_with_name(c).is_none()) {
        Some(missing) => {
            log_warning("Skipping aggregation, column not in table", Some(*missing));
            false
        }
        None => true,
    }
}

/// English month name for 1-12, the number itself otherwise
#[must_use]
pub fn month_label(month: i64) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map_or_else(|| month.to_string(), |m| m.name().to_string())
}
