//! Tests for configuration loading and validation

use prometheus_ad_queue::config::queue::{DEFAULT_MAX_WAIT_SECONDS, MAX_TOTAL_TIERS};
use prometheus_ad_queue::config::{ConfigError, QueueConfig};

#[test]
fn test_defaults() {
    let cfg = QueueConfig::default();
    assert_eq!(cfg.total_tiers, 1);
    assert!(cfg.enable_anti_starvation);
    assert_eq!(cfg.max_wait_seconds, DEFAULT_MAX_WAIT_SECONDS);
    assert_eq!(cfg.index_fanout, 16);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_json_str() {
    let cfg = QueueConfig::from_json_str(
        r#"{"totalTiers": 5, "enableAntiStarvation": false, "maxWaitSeconds": 90}"#,
    )
    .unwrap();
    assert_eq!(cfg.total_tiers, 5);
    assert!(!cfg.enable_anti_starvation);
    assert_eq!(cfg.max_wait_seconds, 90);
    assert!((cfg.starvation_time_weight - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_from_json_str_legacy_keys() {
    let cfg = QueueConfig::from_json_str(
        r#"{"totalPriority": 4, "maximumWaitSeconds": 30, "timeBoost": 2.0, "btreeDegree": 8}"#,
    )
    .unwrap();
    assert_eq!(cfg.total_tiers, 4);
    assert_eq!(cfg.max_wait_seconds, 30);
    assert!((cfg.starvation_time_weight - 2.0).abs() < f64::EPSILON);
    assert_eq!(cfg.index_fanout, 8);
}

#[test]
fn test_from_yaml_str() {
    let yaml = "totalTiers: 3\nenableAntiStarvation: true\nstarvationTimeWeight: 0.5\n";
    let cfg = QueueConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(cfg.total_tiers, 3);
    assert!((cfg.starvation_time_weight - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_from_json_str_rejects_garbage() {
    let err = QueueConfig::from_json_str("{totalTiers: }").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_validate_rejects_too_many_tiers() {
    let cfg = QueueConfig::new().with_total_tiers(MAX_TOTAL_TIERS + 1);
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    assert!(QueueConfig::new().with_total_tiers(MAX_TOTAL_TIERS).validate().is_ok());
}

#[test]
fn test_non_positive_tiers_are_defaulted_not_rejected() {
    let cfg = QueueConfig::new().with_total_tiers(-4);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.normalized().total_tiers, 1);
}

#[test]
fn test_from_path_json_and_yaml() {
    let dir = std::env::temp_dir().join(format!("ad-queue-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let json_path = dir.join("queue.json");
    std::fs::write(&json_path, r#"{"totalTiers": 7}"#).unwrap();
    assert_eq!(QueueConfig::from_path(&json_path).unwrap().total_tiers, 7);

    let yaml_path = dir.join("queue.yaml");
    std::fs::write(&yaml_path, "totalTiers: 2\nmaxWaitSeconds: 45\n").unwrap();
    let cfg = QueueConfig::from_path(&yaml_path).unwrap();
    assert_eq!(cfg.total_tiers, 2);
    assert_eq!(cfg.max_wait_seconds, 45);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_from_path_missing_file() {
    let err = QueueConfig::from_path("/definitely/not/here/queue.yaml").unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("queue.yaml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_from_lookup_bool_parse_failure() {
    let err = QueueConfig::from_lookup(|var| {
        (var == "AD_QUEUE_ENABLE_ANTI_STARVATION").then(|| "yes".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::Env { .. }));
}
