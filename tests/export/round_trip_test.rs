use std::fs;

use arrow::array::Array;
use serde_json::json;
use user_dashboard::export::{read_parquet, to_csv_bytes};
use user_dashboard::{
    ExportFormat, FilterSet, ViewSpec, export_summaries, export_table, flatten_records, read_csv,
};

use crate::utils::{load_users, users_payload};

#[test]
fn test_filtered_table_survives_csv() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let view = dataset.view(&FilterSet::from_choices("Lima", "Todas", "", "Todas"), &ViewSpec::minimal())?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("filtered.csv");
    assert_eq!(export_table(&path, &view.table, None)?, ExportFormat::Csv);

    let bytes = fs::read(&path)?;
    let text = String::from_utf8(bytes.clone()).expect("csv is utf-8");
    let header = text.lines().next().unwrap_or_default();
    let expected: Vec<String> = view
        .table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(header, expected.join(","));
    assert_eq!(text.lines().count(), view.table.num_rows() + 1);

    let back = read_csv(&bytes, view.table.schema())?;
    assert_eq!(back, view.table);
    Ok(())
}

#[test]
fn test_null_filled_columns_survive_csv() -> user_dashboard::Result<()> {
    let mut payload = users_payload();
    payload[2].as_object_mut().unwrap().remove("company");
    let dataset = load_users(payload)?;

    let bytes = to_csv_bytes(dataset.batch())?;
    let back = read_csv(&bytes, dataset.batch().schema())?;
    assert_eq!(&back, dataset.batch());
    Ok(())
}

#[test]
fn test_empty_strings_stay_distinct_from_nulls() -> user_dashboard::Result<()> {
    let batch = flatten_records(&[
        json!({"id": 1, "address": {"suite": "", "city": "Quito"}}),
        json!({"id": 2, "address": {"suite": "Apt. 2", "city": "Lima"}}),
        json!({"id": 3, "address": {"city": ""}}),
    ])?;

    let bytes = to_csv_bytes(&batch)?;
    let back = read_csv(&bytes, batch.schema())?;

    let suite = back.column_by_name("address_suite").expect("suite column");
    assert!(!suite.is_null(0));
    assert!(suite.is_null(2));
    assert!(!back.column_by_name("address_city").expect("city column").is_null(2));
    assert_eq!(back, batch);
    Ok(())
}

#[test]
fn test_parquet_export_by_flag() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("users.out");

    let format = export_table(&path, dataset.batch(), Some(ExportFormat::Parquet))?;
    assert_eq!(format, ExportFormat::Parquet);

    let back = read_parquet(&path)?;
    assert_eq!(back.num_rows(), dataset.len());
    assert_eq!(back.columns(), dataset.batch().columns());
    Ok(())
}

#[test]
fn test_summary_files() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let view = dataset.view(&FilterSet::new(), &ViewSpec::default())?;
    let dir = tempfile::tempdir()?;

    let written = export_summaries(dir.path(), &view)?;
    let names: Vec<String> = written
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
        .collect();
    assert_eq!(
        names,
        vec![
            "by_city.csv",
            "by_company.csv",
            "by_month.csv",
            "by_year.csv",
            "by_month_company.csv",
            "by_year_month.csv",
            "heatmap.csv",
            "scatter.csv",
        ]
    );

    let by_company = fs::read_to_string(dir.path().join("by_company.csv"))?;
    let mut lines = by_company.lines();
    assert_eq!(lines.next(), Some("company_name,count,sum,mean,min,max"));
    assert!(lines.next().is_some_and(|l| l.starts_with("Acme,5,")));
    Ok(())
}

#[test]
fn test_empty_view_writes_no_summaries() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let view = dataset.view(&FilterSet::from_choices("Cusco", "Todas", "", "Todas"), &ViewSpec::default())?;
    let dir = tempfile::tempdir()?;
    assert!(export_summaries(dir.path(), &view)?.is_empty());
    Ok(())
}
