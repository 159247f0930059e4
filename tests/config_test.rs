//! Tests for configuration parsing, validation, and queue builders

use std::sync::Arc;
use std::time::Duration;

use prism_queue::builders::build_queues;
use prism_queue::config::{QueueConfig, QueuesConfig, TimeoutPolicy};
use prism_queue::core::{executor_fn, SchedulerError, TaskExecutor};

#[test]
fn test_queue_config_from_json() {
    let json = r#"{
        "delay": "250ms",
        "concurrency": 4,
        "timeout": 30000,
        "timeout_policy": "cancel",
        "groups": {
            "concurrency": 2,
            "expiration": "1m"
        }
    }"#;

    let config = QueueConfig::from_json_str(json).unwrap();
    let settings = config.resolve().unwrap();
    assert_eq!(settings.delay, Duration::from_millis(250));
    assert_eq!(settings.concurrency, 4);
    assert_eq!(settings.timeout, Duration::from_secs(30));
    assert_eq!(settings.timeout_policy, TimeoutPolicy::Cancel);
    assert_eq!(settings.expiration, Duration::from_secs(60));

    let group = config.for_group().resolve().unwrap();
    assert_eq!(group.concurrency, 2);
    assert_eq!(group.timeout, Duration::from_secs(30));
}

#[test]
fn test_empty_json_uses_defaults() {
    let config = QueueConfig::from_json_str("{}").unwrap();
    assert_eq!(config, QueueConfig::default());
}

#[test]
fn test_json_zero_concurrency_rejected() {
    let err = QueueConfig::from_json_str(r#"{ "concurrency": 0 }"#).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConcurrency(0)));
}

#[test]
fn test_json_bad_duration_rejected() {
    let err = QueueConfig::from_json_str(r#"{ "timeout": "eventually" }"#).unwrap_err();
    assert_eq!(format!("{err}"), "invalid duration for `timeout`: Text(\"eventually\")");
}

#[test]
fn test_malformed_json_rejected() {
    let err = QueueConfig::from_json_str("{ concurrency: ").unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_queues_config_requires_a_queue() {
    assert!(QueuesConfig::default().validate().is_err());
}

#[test]
fn test_queues_config_names_bad_queue() {
    let json = r#"{ "queues": { "mail": { "groups": { "concurrency": 0 } } } }"#;
    let err = QueuesConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("queue `mail` invalid"));
}

#[tokio::test]
async fn test_build_queues_wires_executors() {
    let json = r#"{
        "queues": {
            "mail": { "concurrency": 2 },
            "thumbnails": { "timeout": "10s" }
        }
    }"#;
    let cfg = QueuesConfig::from_json_str(json).unwrap();

    let mut seen = Vec::new();
    let queues = build_queues::<String, _>(&cfg, |name, _| {
        seen.push(name.to_string());
        let executor: Arc<dyn TaskExecutor<String>> =
            Arc::new(executor_fn(|_payload: String| async { Ok::<(), anyhow::Error>(()) }));
        Ok(executor)
    })
    .unwrap();

    seen.sort();
    assert_eq!(seen, vec!["mail", "thumbnails"]);
    assert_eq!(queues["mail"].settings().concurrency, 2);
    assert_eq!(queues["thumbnails"].settings().timeout, Duration::from_secs(10));
}

#[test]
fn test_build_queues_propagates_factory_error() {
    let cfg = QueuesConfig::from_json_str(r#"{ "queues": { "mail": {} } }"#).unwrap();
    let result = build_queues::<String, _>(&cfg, |name, _| {
        Err(SchedulerError::InvalidConfig(format!("no handler for {name}")))
    });
    assert!(result.is_err());
}

#[test]
fn test_build_queues_outside_runtime_fails() {
    let cfg = QueuesConfig::from_json_str(r#"{ "queues": { "mail": {} } }"#).unwrap();
    let result = build_queues::<String, _>(&cfg, |_, _| {
        let executor: Arc<dyn TaskExecutor<String>> =
            Arc::new(executor_fn(|_payload: String| async { Ok::<(), anyhow::Error>(()) }));
        Ok(executor)
    });
    assert!(matches!(result, Err(SchedulerError::NoRuntime)));
}

#[test]
fn test_error_display() {
    assert_eq!(
        SchedulerError::InvalidConcurrency(0).to_string(),
        "'concurrency' must be greater than 0 (got 0)"
    );
    assert_eq!(
        SchedulerError::Invariant("queue empty".into()).to_string(),
        "invariant violated: queue empty"
    );
}
