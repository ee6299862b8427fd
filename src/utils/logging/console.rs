//! Console output utilities
//!
//! Plain-text rendering of a dashboard view for the terminal.

use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::aggregate::{AggregateTable, KeyValue, Pivot};
use crate::filter::FilterOptions;
use crate::pipeline::{DashboardView, Dimension, month_label};
use crate::synth::MONTH_COLUMN;

/// Print the choices offered for each selector
pub fn print_filter_options(options: &FilterOptions) {
    println!("City options:    {}", options.city_choices().join(", "));
    println!("Company options: {}", options.company_choices().join(", "));
}

/// Print column names and types
pub fn print_schema_info(batch: &RecordBatch) {
    println!("Schema:");
    for field in batch.schema().fields() {
        println!("  - {} ({})", field.name(), field.data_type());
    }
}

/// Print the first `num_rows` rows of a batch
pub fn print_sample_rows(batch: &RecordBatch, num_rows: usize) {
    let shown = num_rows.min(batch.num_rows());
    println!("First {shown} of {} rows:", batch.num_rows());

    let options = FormatOptions::default().with_null("NULL");
    let formatters: Vec<_> = batch
        .columns()
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
        .collect();
    let schema = batch.schema();

    for row_idx in 0..shown {
        let cells: Vec<String> = schema
            .fields()
            .iter()
            .zip(&formatters)
            .map(|(field, fmt)| match fmt {
                Ok(fmt) => format!("{}: {}", field.name(), fmt.value(row_idx)),
                Err(_) => format!("{}: ?", field.name()),
            })
            .collect();
        println!("Row {row_idx}: [{}]", cells.join(", "));
    }
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("${v:.2}"))
}

fn key_label(column: &str, key: &KeyValue) -> String {
    match (column, key.as_i64()) {
        (MONTH_COLUMN, Some(month)) => month_label(month),
        _ => key.to_string(),
    }
}

fn print_summary(dimension: Dimension, table: &AggregateTable) {
    println!("By {dimension}:");
    for row in &table.rows {
        let label = table
            .keys
            .iter()
            .zip(&row.key)
            .map(|(column, key)| key_label(column, key))
            .collect::<Vec<_>>()
            .join(" / ");
        println!(
            "  {label:<30} count {:>4}  sum {:>12.2}  mean {:>10}",
            row.count,
            row.sum,
            row.mean.map_or_else(|| "-".to_string(), |m| format!("{m:.2}"))
        );
    }
}

fn print_heatmap(pivot: &Pivot) {
    println!(
        "{} by {} x {} ({}):",
        pivot.value_column, pivot.row_key, pivot.col_key, pivot.reduction
    );
    let header: Vec<String> = pivot
        .columns()
        .iter()
        .map(|c| format!("{:>10}", key_label(&pivot.col_key, c)))
        .collect();
    println!("  {:>6} {}", "", header.join(""));
    for row in pivot.rows() {
        let cells: Vec<String> = pivot
            .columns()
            .iter()
            .map(|c| match pivot.get(row, c) {
                Some(v) => format!("{v:>10.0}"),
                None => format!("{:>10}", "-"),
            })
            .collect();
        println!("  {:>6} {}", row.to_string(), cells.join(""));
    }
}

/// Print the whole view: KPIs, statistics, distributions and summaries
pub fn print_view(view: &DashboardView, preview_rows: usize) {
    println!("Filters: {}", view.filters);
    println!("Matching records: {}", view.table.num_rows());

    if let Some(advisory) = view.state.advisory() {
        println!();
        println!("{advisory}");
        return;
    }

    println!();
    print_sample_rows(&view.table, preview_rows);

    println!();
    println!("KPIs:");
    println!("  Total records:  {}", view.kpis.total_records);
    println!("  Total amount:   {}", money(Some(view.kpis.total)));
    println!("  Mean per user:  {}", money(view.kpis.mean));
    println!("  Max amount:     {}", money(view.kpis.max));
    println!("  Min amount:     {}", money(view.kpis.min));

    if let Some(stats) = &view.describe {
        println!();
        println!("Statistics:");
        for line in stats.to_string().lines() {
            println!("  {line}");
        }
    }

    for distribution in &view.distributions {
        println!();
        println!("Records per {}:", distribution.column);
        for (key, count) in &distribution.counts {
            println!("  {:<30} {count}", key.to_string());
        }
    }

    for summary in &view.summaries {
        println!();
        print_summary(summary.dimension, &summary.table);
    }

    if let Some(pivot) = &view.heatmap {
        println!();
        print_heatmap(pivot);
    }

    if !view.scatter.is_empty() {
        println!();
        println!("Amount vs. contracts: {} points", view.scatter.len());
        let null_groups = view.scatter.iter().filter(|p| p.group.is_none()).count();
        if null_groups > 0 {
            println!("  ({null_groups} without a company)");
        }
    }
}
