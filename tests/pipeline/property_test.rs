use arrow::array::Array;
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use user_dashboard::synth::MONTO_COLUMN;
use user_dashboard::{
    FilterSet, MetricSynthesizer, RecordBatch, Selection, flatten_records, group_by, rng_from_seed,
};

use crate::utils::{int_values, string_values};

static CITIES: [&str; 3] = ["Quito", "Lima", "Cusco"];
static COMPANIES: [&str; 3] = ["Acme", "Globex", "Initech"];

fn arb_city() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop::sample::select(&CITIES[..2]))
}

fn arb_company() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop::sample::select(&COMPANIES[..2]))
}

/// Raw user records; a `None` city or company leaves that nested object out
fn arb_payload() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        (arb_city(), arb_company(), "[A-Za-z]{1,8}( [A-Za-z]{1,8})?"),
        0..24,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(id, (city, company, name))| {
                let mut record = Map::new();
                record.insert("id".to_string(), json!(id));
                record.insert("name".to_string(), json!(name));
                if let Some(city) = city {
                    record.insert("address".to_string(), json!({"city": city, "zipcode": "170150"}));
                }
                if let Some(company) = company {
                    record.insert("company".to_string(), json!({"name": company}));
                }
                Value::Object(record)
            })
            .collect()
    })
}

fn arb_selection(choices: &'static [&'static str]) -> impl Strategy<Value = Selection> {
    prop_oneof![
        Just(Selection::All),
        prop::sample::select(choices).prop_map(|c| Selection::Only(c.to_string())),
    ]
}

fn augmented(payload: &[Value], seed: u64) -> RecordBatch {
    let batch = flatten_records(payload).unwrap();
    MetricSynthesizer::default()
        .synthesize(&batch, &mut rng_from_seed(Some(seed)))
        .unwrap()
}

fn column_or_nulls(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    if batch.schema().column_with_name(column).is_some() {
        string_values(batch, column)
    } else {
        vec![None; batch.num_rows()]
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalizer_keeps_one_row_per_record(payload in arb_payload()) {
        let batch = flatten_records(&payload).unwrap();
        prop_assert_eq!(batch.num_rows(), payload.len());
        for column in batch.columns() {
            prop_assert_eq!(column.len(), payload.len());
        }
    }

    #[test]
    fn wildcard_filters_are_identity(payload in arb_payload(), seed in any::<u64>()) {
        let batch = augmented(&payload, seed);
        let filtered = FilterSet::from_choices("Todas", "Todas", "", "Todas")
            .apply(&batch)
            .unwrap();
        prop_assert_eq!(filtered, batch);
    }

    #[test]
    fn filtered_rows_satisfy_every_predicate(
        payload in arb_payload(),
        seed in any::<u64>(),
        city in arb_selection(&CITIES),
        company in arb_selection(&COMPANIES),
        query in "[a-zA-Z]{0,2}",
    ) {
        let batch = augmented(&payload, seed);
        let filters = FilterSet::new()
            .city(city.clone())
            .company(company.clone())
            .name_contains(&query);
        let filtered = filters.apply(&batch).unwrap();

        prop_assert!(filtered.num_rows() <= batch.num_rows());

        let cities = column_or_nulls(&filtered, "address_city");
        let companies = column_or_nulls(&filtered, "company_name");
        let names = column_or_nulls(&filtered, "name");
        for row in 0..filtered.num_rows() {
            if let Some(want) = city.value() {
                prop_assert_eq!(cities[row].as_deref(), Some(want));
            }
            if let Some(want) = company.value() {
                prop_assert_eq!(companies[row].as_deref(), Some(want));
            }
            if !query.is_empty() {
                let name = names[row].clone().unwrap_or_default().to_lowercase();
                prop_assert!(name.contains(&query.to_lowercase()));
            }
        }
    }

    #[test]
    fn group_sums_are_conserved(payload in arb_payload(), seed in any::<u64>()) {
        prop_assume!(!payload.is_empty());
        let batch = augmented(&payload, seed);
        prop_assume!(batch.schema().column_with_name("company_name").is_some());

        let table = group_by(&batch, &["company_name"], MONTO_COLUMN).unwrap();
        let expected: i64 = int_values(&batch, MONTO_COLUMN).iter().sum();

        prop_assert_eq!(table.total_count(), batch.num_rows());
        prop_assert!((table.total_sum() - expected as f64).abs() < 1e-6);
    }
}
