use std::fs;

use serde_json::json;
use user_dashboard::{DashboardError, Dataset, FileSource, RecordSource, StaticSource};

use crate::utils::{seeded_config, users_payload};

#[test]
fn test_file_source_matches_static_source() -> user_dashboard::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("users.json");
    fs::write(&path, serde_json::to_string(&json!(users_payload()))?)?;

    let from_file = Dataset::load(&FileSource::new(&path), &seeded_config(3))?;
    let from_memory = Dataset::load(&StaticSource::new(users_payload()), &seeded_config(3))?;

    assert_eq!(from_file.batch(), from_memory.batch());
    assert_eq!(FileSource::new(&path).describe(), path.display().to_string());
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = FileSource::new("/nonexistent/users.json").fetch().unwrap_err();
    assert!(matches!(err, DashboardError::Io(_)));
    assert!(err.to_string().contains("offline payload"));
}

#[test]
fn test_invalid_json_is_a_json_error() -> user_dashboard::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{\"id\": 1,")?;

    let err = FileSource::new(&path).fetch().unwrap_err();
    assert!(matches!(err, DashboardError::Json(_)));
    Ok(())
}
