//! Tests for utility functions

use std::time::Duration;

use chrono::TimeDelta;
use prometheus_ad_queue::util::{cutoff_before, elapsed_secs, init_tracing, now, DEFAULT_LOG_FILTER};

#[test]
fn test_now_is_monotonic_enough() {
    let a = now();
    let b = now();
    assert!(b >= a);
}

#[test]
fn test_cutoff_before_zero_is_now() {
    let t = now();
    assert_eq!(cutoff_before(t, Duration::ZERO), Some(t));
}

#[test]
fn test_elapsed_secs_millisecond_resolution() {
    let secs = elapsed_secs(TimeDelta::milliseconds(250));
    assert!((secs - 0.25).abs() < f64::EPSILON);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(filter = DEFAULT_LOG_FILTER, "tracing initialized");
}
