use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use serde_json::{Value, json};
use user_dashboard::{DashboardConfig, Dataset, StaticSource};

/// Names of the ten users served by the public placeholder API
pub const NAMES: [&str; 10] = [
    "Leanne Graham",
    "Ervin Howell",
    "Clementine Bauch",
    "Patricia Lebsack",
    "Chelsey Dietrich",
    "Mrs. Dennis Schulist",
    "Kurtis Weissnat",
    "Nicholas Runolfsdottir V",
    "Glenna Reichert",
    "Clementina DuBuque",
];

/// One raw user record shaped like the placeholder API
#[must_use]
pub fn raw_user(id: usize, city: &str, company: &str) -> Value {
    let name = NAMES[(id - 1) % NAMES.len()];
    json!({
        "id": id,
        "name": name,
        "username": format!("user{id}"),
        "email": format!("user{id}@example.org"),
        "address": {
            "street": "Kulas Light",
            "suite": format!("Apt. {id}"),
            "city": city,
            "zipcode": "92998-3874",
            "geo": {"lat": "-37.3159", "lng": "81.1496"}
        },
        "phone": "1-770-736-8031",
        "website": "hildegard.org",
        "company": {
            "name": company,
            "catchPhrase": "Multi-layered client-server neural-net",
            "bs": "harness real-time e-markets"
        }
    })
}

/// Ten users: odd ids live in Quito, even ids in Lima; ids 1-5 work at Acme,
/// 6-10 at Globex
#[must_use]
pub fn users_payload() -> Vec<Value> {
    users_payload_with(|id| {
        let city = if id % 2 == 1 { "Quito" } else { "Lima" };
        let company = if id <= 5 { "Acme" } else { "Globex" };
        (city, company)
    })
}

/// Ten users with city and company chosen per id
#[must_use]
pub fn users_payload_with<F>(assign: F) -> Vec<Value>
where
    F: Fn(usize) -> (&'static str, &'static str),
{
    (1..=10)
        .map(|id| {
            let (city, company) = assign(id);
            raw_user(id, city, company)
        })
        .collect()
}

/// Config with a fixed seed so runs are reproducible
#[must_use]
pub fn seeded_config(seed: u64) -> DashboardConfig {
    DashboardConfig {
        random_seed: Some(seed),
        ..DashboardConfig::default()
    }
}

/// Load the fixture payload through the full pipeline
pub fn load_users(records: Vec<Value>) -> user_dashboard::Result<Dataset> {
    Dataset::load(&StaticSource::new(records), &seeded_config(7))
}

/// Values of a string column, `None` for nulls
#[must_use]
pub fn string_values(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array = batch
        .column_by_name(column)
        .unwrap_or_else(|| panic!("column {column} missing"))
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("column {column} is not Utf8"));
    (0..array.len())
        .map(|i| array.is_valid(i).then(|| array.value(i).to_string()))
        .collect()
}

/// Values of a non-null integer column
#[must_use]
pub fn int_values(batch: &RecordBatch, column: &str) -> Vec<i64> {
    batch
        .column_by_name(column)
        .unwrap_or_else(|| panic!("column {column} missing"))
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap_or_else(|| panic!("column {column} is not Int64"))
        .values()
        .to_vec()
}
