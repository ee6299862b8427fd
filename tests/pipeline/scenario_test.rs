use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use user_dashboard::pipeline::EMPTY_ADVISORY;
use user_dashboard::synth::MONTO_COLUMN;
use user_dashboard::{
    Dataset, Dimension, FilterSet, KeyValue, MetricSynthesizer, RecordBatch, Reduction, Selection,
    ViewSpec, ViewState, flatten_records, pivot, rng_from_seed,
};

use crate::utils::{int_values, load_users, string_values, users_payload, users_payload_with};

#[test]
fn test_city_and_company_filter_keeps_only_matching_rows() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let filters = FilterSet::from_choices("Quito", "Acme", "", "Todas");
    let view = dataset.view(&filters, &ViewSpec::default())?;

    assert_eq!(view.state, ViewState::Populated);
    assert_eq!(view.table.num_rows(), 3);
    assert!(
        string_values(&view.table, "address_city")
            .iter()
            .all(|c| c.as_deref() == Some("Quito"))
    );
    assert!(
        string_values(&view.table, "company_name")
            .iter()
            .all(|c| c.as_deref() == Some("Acme"))
    );
    assert_eq!(int_values(&view.table, "id"), vec![1, 3, 5]);
    Ok(())
}

#[test]
fn test_no_match_takes_the_empty_path() -> user_dashboard::Result<()> {
    // Everyone in Quito works at Globex
    let dataset = load_users(users_payload_with(|id| {
        if id % 2 == 1 { ("Quito", "Globex") } else { ("Lima", "Acme") }
    }))?;
    let filters = FilterSet::from_choices("Quito", "Acme", "", "Todas");
    let view = dataset.view(&filters, &ViewSpec::default())?;

    assert_eq!(view.table.num_rows(), 0);
    assert_eq!(view.state.advisory(), Some(EMPTY_ADVISORY));
    assert!(view.summaries.is_empty());
    assert!(view.distributions.is_empty());
    assert!(view.heatmap.is_none());
    assert!(view.scatter.is_empty());
    assert!(view.describe.is_none());
    assert_eq!(view.kpis.total_records, 0);
    Ok(())
}

#[test]
fn test_name_search_is_case_insensitive() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let view = dataset.view(
        &FilterSet::new().name_contains("CLEMENTIN"),
        &ViewSpec::minimal(),
    )?;
    let names: Vec<_> = string_values(&view.table, "name").into_iter().flatten().collect();
    assert_eq!(names, vec!["Clementine Bauch", "Clementina DuBuque"]);
    Ok(())
}

#[test]
fn test_wildcard_selection_is_not_a_value() -> user_dashboard::Result<()> {
    assert_eq!(Selection::parse("Todas", "Todas"), Selection::All);
    assert_eq!(
        Selection::parse("Lima", "Todas"),
        Selection::Only("Lima".to_string())
    );

    let dataset = load_users(users_payload())?;
    let view = dataset.view(
        &FilterSet::from_choices("Todas", "Todas", "", "Todas"),
        &ViewSpec::minimal(),
    )?;
    assert_eq!(view.table, *dataset.batch());
    Ok(())
}

#[test]
fn test_summaries_cover_every_dimension() -> user_dashboard::Result<()> {
    let dataset = load_users(users_payload())?;
    let view = dataset.view(&FilterSet::new(), &ViewSpec::default())?;
    let monto_total: i64 = int_values(&view.table, MONTO_COLUMN).iter().sum();

    for dimension in Dimension::ALL {
        let table = view
            .summary(dimension)
            .unwrap_or_else(|| panic!("missing summary for {dimension}"));
        assert_eq!(table.total_count(), 10, "{dimension}");
        assert_eq!(table.total_sum(), monto_total as f64, "{dimension}");
    }

    let by_company = view.summary(Dimension::Company).unwrap();
    assert_eq!(by_company.len(), 2);
    assert_eq!(by_company.get(&[KeyValue::from("Acme")]).unwrap().count, 5);

    let cities = &view.distributions[0];
    assert_eq!(cities.column, "address_city");
    assert_eq!(
        cities.counts,
        vec![(KeyValue::from("Lima"), 5), (KeyValue::from("Quito"), 5)]
    );
    Ok(())
}

#[test]
fn test_monto_is_in_range_and_mean_is_sum_over_count() -> user_dashboard::Result<()> {
    let batch = flatten_records(&users_payload()[..5])?;
    let augmented = MetricSynthesizer::default().synthesize(&batch, &mut rng_from_seed(Some(5)))?;
    let montos = int_values(&augmented, MONTO_COLUMN);

    assert_eq!(montos.len(), 5);
    assert!(montos.iter().all(|m| (1000..=10000).contains(m)));

    let view = Dataset::from_batch(augmented).view(&FilterSet::new(), &ViewSpec::minimal())?;
    let mean = view.kpis.mean.unwrap();
    assert!((view.kpis.total / 5.0 - mean).abs() < 1e-9);
    assert_eq!(view.describe.unwrap().mean, mean);
    Ok(())
}

fn ledger(rows: &[(i64, i64, i64)]) -> RecordBatch {
    let column = |pick: fn(&(i64, i64, i64)) -> i64| -> ArrayRef {
        Arc::new(rows.iter().map(pick).collect::<Int64Array>())
    };
    let companies: ArrayRef = Arc::new(StringArray::from(vec!["Acme"; rows.len()]));
    RecordBatch::try_new(
        Arc::new(Schema::new(vec![
            Field::new("company_name", DataType::Utf8, true),
            Field::new("year", DataType::Int64, false),
            Field::new("month", DataType::Int64, false),
            Field::new("monto", DataType::Int64, false),
        ])),
        vec![companies, column(|r| r.0), column(|r| r.1), column(|r| r.2)],
    )
    .unwrap()
}

#[test]
fn test_year_month_pivot_leaves_absent_cells_absent() -> user_dashboard::Result<()> {
    let batch = ledger(&[
        (2022, 1, 1000),
        (2022, 1, 2500),
        (2022, 2, 4000),
        (2023, 2, 1500),
    ]);
    let matrix = pivot(&batch, "year", "month", "monto", Reduction::Sum)?;

    assert_eq!(matrix.len(), 3);
    assert_eq!(matrix.get(&KeyValue::Int(2022), &KeyValue::Int(1)), Some(3500.0));
    assert_eq!(matrix.get(&KeyValue::Int(2022), &KeyValue::Int(2)), Some(4000.0));
    assert_eq!(matrix.get(&KeyValue::Int(2023), &KeyValue::Int(2)), Some(1500.0));
    assert_eq!(matrix.get(&KeyValue::Int(2023), &KeyValue::Int(1)), None);

    let view = Dataset::from_batch(batch).view(&FilterSet::new(), &ViewSpec::default())?;
    assert_eq!(view.heatmap.as_ref(), Some(&matrix));
    Ok(())
}
