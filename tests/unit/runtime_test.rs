//! Tests for the request/response boundary

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use prometheus_ad_queue::config::QueueConfig;
use prometheus_ad_queue::core::{Ad, AdQueue, QueueError};
use prometheus_ad_queue::runtime::api::{
    self, AntiStarvationRequest, EnqueueRequest, MaximumWaitRequest, PeekQuery,
    ReprioritizeAgeRequest, ReprioritizeCategoryRequest, WaitingQuery,
};
use prometheus_ad_queue::runtime::{parse_duration, parse_request, ErrorResponse};

fn queue() -> AdQueue {
    AdQueue::new(QueueConfig::new().with_total_tiers(5).with_anti_starvation(false))
}

#[test]
fn test_enqueue_request_from_json() {
    let q = queue();
    let req: EnqueueRequest = parse_request(
        r#"{"ad": {"adId": "a1", "gameFamily": "racing", "priority": 4, "maxWaitTime": 30}}"#,
    )
    .unwrap();
    let record = api::enqueue(&q, req);
    assert_eq!(record.ad.id, "a1");
    assert_eq!(record.ad.tier, 4);
    assert_eq!(q.len(), 1);
}

#[test]
fn test_enqueue_request_with_explicit_time() {
    let q = queue();
    let at = Utc::now() - TimeDelta::minutes(10);
    api::enqueue(
        &q,
        EnqueueRequest {
            ad: Ad::new("late", "c", 2, 60),
            enqueue_at: None,
        },
    );
    let record = api::enqueue(
        &q,
        EnqueueRequest {
            ad: Ad::new("early", "c", 2, 60),
            enqueue_at: Some(at),
        },
    );
    assert_eq!(record.enqueued_at, at);
    assert_eq!(api::dequeue(&q).unwrap().ad.id, "early");
}

#[test]
fn test_dequeue_empty_is_not_found() {
    let err = api::dequeue(&queue()).unwrap_err();
    assert!(matches!(err, QueueError::Empty));
    assert_eq!(err.status_code(), 404);
    assert_eq!(ErrorResponse::from(&err).error, "queue empty");
}

#[test]
fn test_peek_defaults_to_one() {
    let q = queue();
    q.enqueue(Ad::new("a", "c", 1, 60));
    q.enqueue(Ad::new("b", "c", 1, 60));
    let out = api::peek(&q, &PeekQuery::default()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ad.id, "a");
    assert_eq!(q.len(), 2);
}

#[test]
fn test_peek_rejects_non_positive_n() {
    let q = queue();
    for n in [0, -3] {
        let err = api::peek(&q, &PeekQuery { n: Some(n) }).unwrap_err();
        assert_eq!(err.status_code(), 400, "n = {n}");
    }
}

#[test]
fn test_waiting_parses_age() {
    let q = queue();
    q.enqueue_at(Ad::new("old", "c", 1, 60), Utc::now() - TimeDelta::minutes(10));
    q.enqueue(Ad::new("new", "c", 1, 60));

    let out = api::waiting(&q, &WaitingQuery { age: "5m".into() }).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ad.id, "old");

    let err = api::waiting(&q, &WaitingQuery { age: String::new() }).unwrap_err();
    assert!(matches!(err, QueueError::InvalidRequest(_)));
    let err = api::waiting(&q, &WaitingQuery { age: "soon".into() }).unwrap_err();
    assert!(matches!(err, QueueError::InvalidDuration(_)));
}

#[test]
fn test_reprioritize_category_validation() {
    let q = queue();
    q.enqueue(Ad::new("a", "racing", 1, 60));

    let missing = ReprioritizeCategoryRequest {
        category: String::new(),
        new_tier: 3,
    };
    assert!(api::reprioritize_category(&q, &missing).is_err());
    let zero = ReprioritizeCategoryRequest {
        category: "racing".into(),
        new_tier: 0,
    };
    assert!(api::reprioritize_category(&q, &zero).is_err());

    let ok = ReprioritizeCategoryRequest {
        category: "racing".into(),
        new_tier: 5,
    };
    let resp = api::reprioritize_category(&q, &ok).unwrap();
    assert!(resp.ok);
    assert_eq!(resp.moved, 1);
    assert_eq!(q.tier_contents(5).len(), 1);
}

#[test]
fn test_reprioritize_age_request() {
    let q = queue();
    q.enqueue_at(Ad::new("old", "c", 1, 60), Utc::now() - TimeDelta::hours(1));
    q.enqueue(Ad::new("new", "c", 1, 60));

    let req: ReprioritizeAgeRequest =
        parse_request(r#"{"age": "30m", "newPriority": 4}"#).unwrap();
    assert_eq!(api::reprioritize_age(&q, &req).unwrap().moved, 1);
    assert_eq!(q.tier_contents(4)[0].ad.id, "old");

    let bad = ReprioritizeAgeRequest {
        age: "30m".into(),
        new_tier: 0,
    };
    assert!(api::reprioritize_age(&q, &bad).is_err());
}

#[test]
fn test_set_anti_starvation_and_distribution() {
    let q = queue();
    q.enqueue(Ad::new("a", "c", 5, 60));
    api::set_anti_starvation(&q, &AntiStarvationRequest { enable: true });

    let dist = api::distribution(&q);
    assert!(dist.enable_anti_starvation);
    assert_eq!(dist.total, 1);
    assert_eq!(dist.distribution.len(), 5);
    assert_eq!(dist.distribution[0].tier, 5);

    let json = serde_json::to_value(&dist).unwrap();
    assert_eq!(json["enable_anti_starvation"], true);
}

#[test]
fn test_set_maximum_wait_rejects_non_positive() {
    let q = queue();
    for maximum_wait in [0, -10] {
        let err = api::set_maximum_wait(&q, &MaximumWaitRequest { maximum_wait }).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
    assert!(api::set_maximum_wait(&q, &MaximumWaitRequest { maximum_wait: 45 }).unwrap().ok);
    assert_eq!(q.max_wait_seconds(), 45);
}

#[test]
fn test_parse_duration_compound() {
    assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
    assert_eq!(parse_duration("1500us").unwrap(), Duration::from_micros(1500));
}

#[test]
fn test_health() {
    assert!(api::health().ok);
}
