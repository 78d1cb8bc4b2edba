//! Tests for builder modules

use std::sync::Arc;
use std::thread;

use prometheus_ad_queue::builders::{build_queue, build_shared_queue};
use prometheus_ad_queue::config::{ConfigError, QueueConfig};
use prometheus_ad_queue::core::Ad;

#[test]
fn test_build_queue_applies_config() {
    let cfg = QueueConfig::new()
        .with_total_tiers(4)
        .with_anti_starvation(false)
        .with_max_wait_seconds(30);
    let queue = build_queue(&cfg).unwrap();
    let settings = queue.settings();
    assert_eq!(settings.total_tiers, 4);
    assert!(!settings.anti_starvation_enabled);
    assert_eq!(settings.max_wait_seconds, 30);
    assert!(queue.is_empty());
}

#[test]
fn test_build_queue_normalizes_out_of_range_values() {
    let cfg = QueueConfig::new()
        .with_total_tiers(0)
        .with_starvation_time_weight(0.0)
        .with_index_fanout(0);
    let settings = build_queue(&cfg).unwrap().settings();
    assert_eq!(settings.total_tiers, 1);
    assert!((settings.starvation_time_weight - 1.0).abs() < f64::EPSILON);
    assert_eq!(settings.index_fanout, 16);
}

#[test]
fn test_build_queue_rejects_invalid_config() {
    let cfg = QueueConfig::new().with_starvation_time_weight(f64::INFINITY);
    assert!(matches!(build_queue(&cfg), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_build_shared_queue_across_threads() {
    let queue = build_shared_queue(&QueueConfig::new().with_total_tiers(3)).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..25 {
                    queue.enqueue(Ad::new(format!("{t}-{i}"), "shared", (i % 3) + 1, 60));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(queue.len(), 100);
    queue.check_invariants().unwrap();
}
