use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use user_dashboard::{DashboardConfig, DashboardError, Dataset, HttpSource, RecordSource};

use crate::utils::{seeded_config, users_payload};

fn quick_config() -> DashboardConfig {
    DashboardConfig {
        timeout: Duration::from_secs(5),
        ..seeded_config(11)
    }
}

#[test]
fn test_fetch_returns_records() -> user_dashboard::Result<()> {
    let server = MockServer::start();
    let users = server.mock(|when, then| {
        when.method(GET).path("/users");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!(users_payload()));
    });

    let source = HttpSource::with_url(&server.url("/users"), &quick_config())?;
    let records = source.fetch()?;

    users.assert();
    assert_eq!(records.len(), 10);
    assert_eq!(records[0]["address"]["city"], "Quito");
    Ok(())
}

#[test]
fn test_user_agent_is_sent() -> user_dashboard::Result<()> {
    let server = MockServer::start();
    let config = quick_config();
    let users = server.mock(|when, then| {
        when.method(GET)
            .path("/users")
            .header("user-agent", config.user_agent.as_str());
        then.status(200).json_body(json!([]));
    });

    let records = HttpSource::with_url(&server.url("/users"), &config)?.fetch()?;
    users.assert();
    assert!(records.is_empty());
    Ok(())
}

#[test]
fn test_non_success_status_is_a_fetch_failure() -> user_dashboard::Result<()> {
    let server = MockServer::start();
    for (path, status) in [("/missing", 404), ("/broken", 500)] {
        let mock = server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(status).body("nope");
        });

        let url = server.url(path);
        let err = HttpSource::with_url(&url, &quick_config())?
            .fetch()
            .unwrap_err();

        mock.assert_hits(1);
        assert!(err.is_fetch_failure());
        match err {
            DashboardError::FetchStatus { url: failed, status: code } => {
                assert_eq!(failed, url);
                assert_eq!(code, status);
            }
            other => panic!("expected FetchStatus, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn test_fetch_failure_aborts_the_load() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users");
        then.status(503);
    });

    let source = HttpSource::with_url(&server.url("/users"), &quick_config()).unwrap();
    let result = Dataset::load(&source, &quick_config());
    assert!(matches!(result, Err(DashboardError::FetchStatus { status: 503, .. })));
}

#[test]
fn test_object_payload_is_rejected() -> user_dashboard::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users");
        then.status(200).json_body(json!({"users": users_payload()}));
    });

    let err = HttpSource::with_url(&server.url("/users"), &quick_config())?
        .fetch()
        .unwrap_err();
    assert!(matches!(err, DashboardError::Payload(_)));
    assert!(!err.is_fetch_failure());
    Ok(())
}

#[test]
fn test_unreachable_endpoint_is_a_transport_error() -> user_dashboard::Result<()> {
    // Port 9 (discard) on localhost is closed in test environments
    let err = HttpSource::with_url("http://127.0.0.1:9/users", &quick_config())?
        .fetch()
        .unwrap_err();
    assert!(matches!(err, DashboardError::Transport(_)));
    assert!(err.is_fetch_failure());
    Ok(())
}
