//! Tests for error types

use prometheus_ad_queue::config::ConfigError;
use prometheus_ad_queue::core::{AppResult, QueueError};

#[test]
fn test_empty_error() {
    let err = QueueError::Empty;
    assert_eq!(format!("{err}"), "queue empty");
    assert_eq!(err.status_code(), 404);
}

#[test]
fn test_invalid_request_error() {
    let err = QueueError::InvalidRequest("invalid n".to_string());
    assert_eq!(format!("{err}"), "invalid request: invalid n");
    assert!(err.is_client_error());
}

#[test]
fn test_invalid_duration_error() {
    let err = QueueError::InvalidDuration("unknown unit: \"5x\"".to_string());
    assert_eq!(format!("{err}"), "invalid duration: unknown unit: \"5x\"");
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_config_error_is_transparent() {
    let err: QueueError = ConfigError::Invalid("totalTiers too large".to_string()).into();
    assert_eq!(
        format!("{err}"),
        "invalid configuration: totalTiers too large"
    );
    assert!(!err.is_client_error());
}

#[test]
fn test_app_result_wraps_queue_error() {
    fn fails() -> AppResult<()> {
        Err(QueueError::Empty.into())
    }
    let err = fails().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueueError>(),
        Some(QueueError::Empty)
    ));
}
