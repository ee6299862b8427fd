use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use user_dashboard::config::DEFAULT_WILDCARD;
use user_dashboard::export::{ExportFormat, export_summaries, export_table};
use user_dashboard::fetch::{FileSource, HttpSource, RecordSource};
use user_dashboard::filter::FilterSet;
use user_dashboard::pipeline::{Dataset, ViewSpec};
use user_dashboard::utils::logging::console::{
    print_filter_options, print_schema_info, print_view,
};
use user_dashboard::utils::logging::{create_spinner, finish_and_clear};
use user_dashboard::DashboardConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "User dashboard: fetch, filter and summarize the user feed")]
struct Cli {
    /// Endpoint returning the JSON user array
    #[arg(long)]
    url: Option<String>,
    /// Read the payload from a JSON file instead of fetching it
    #[arg(long, conflicts_with = "url")]
    input: Option<PathBuf>,
    /// City to keep
    #[arg(long, default_value = DEFAULT_WILDCARD)]
    city: String,
    /// Company to keep
    #[arg(long, default_value = DEFAULT_WILDCARD)]
    company: String,
    /// Case-insensitive name search
    #[arg(long, default_value = "")]
    name: String,
    /// Seed for the simulated metric columns
    #[arg(long)]
    seed: Option<u64>,
    /// Fetch timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Write the filtered table to this file
    #[arg(long)]
    export: Option<PathBuf>,
    /// Export encoding (csv or parquet); inferred from the extension when omitted
    #[arg(long, value_parser = parse_format)]
    format: Option<ExportFormat>,
    /// Write the summary tables as CSV files into this directory
    #[arg(long)]
    summary_dir: Option<PathBuf>,
    /// Print the selector choices and exit
    #[arg(long)]
    list_options: bool,
    /// Print the view as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Rows shown in the table preview
    #[arg(long)]
    rows: Option<usize>,
    /// Print the table schema before the view
    #[arg(long)]
    schema: bool,
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: user_dashboard::DashboardError| e.to_string())
}

impl Cli {
    fn config(&self) -> DashboardConfig {
        let mut config = DashboardConfig::from_env();
        if let Some(url) = &self.url {
            config.api_url.clone_from(url);
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(rows) = self.rows {
            config.preview_rows = rows;
        }
        config
    }
}

fn load(cli: &Cli, config: &DashboardConfig) -> anyhow::Result<Dataset> {
    let source: Box<dyn RecordSource> = match &cli.input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(config).context("Failed to build HTTP client")?),
    };

    let spinner = create_spinner(Some(&format!("Fetching {}", source.describe())));
    let dataset = Dataset::load(source.as_ref(), config);
    finish_and_clear(&spinner);

    dataset.with_context(|| format!("Failed to load user records from {}", source.describe()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config();
    info!("{config}");

    let dataset = load(&cli, &config)?;

    if cli.list_options {
        let options = dataset.filter_options(&config.wildcard)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&options)?);
        } else {
            print_filter_options(&options);
        }
        return Ok(());
    }

    if cli.schema {
        print_schema_info(dataset.batch());
    }

    let filters = FilterSet::from_choices(&cli.city, &cli.company, &cli.name, &config.wildcard);
    let view = dataset
        .view(&filters, &ViewSpec::default())
        .context("Failed to build dashboard view")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view.report())?);
    } else {
        print_view(&view, config.preview_rows);
    }

    if let Some(path) = &cli.export {
        let format = export_table(path, &view.table, cli.format)
            .with_context(|| format!("Failed to export table to {}", path.display()))?;
        info!("Exported {} records as {format} to {}", view.table.num_rows(), path.display());
    }

    if let Some(dir) = &cli.summary_dir {
        let written = export_summaries(dir, &view)
            .with_context(|| format!("Failed to export summaries to {}", dir.display()))?;
        info!("Exported {} summary tables", written.len());
    }

    Ok(())
}
