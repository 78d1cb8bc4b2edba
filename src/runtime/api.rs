//! API-facing request/response models and handlers.
//!
//! Transport adapters decode a body with [`parse_request`], call the matching handler,
//! and render either the response or an [`ErrorResponse`] with
//! [`QueueError::status_code`]. Handlers validate input before it reaches the engine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::{Ad, AdQueue, QueueError, QueuedAd, TierShare};

/// Enqueue payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    /// Ad to admit.
    pub ad: Ad,
    /// Optional explicit admission time; defaults to now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueue_at: Option<DateTime<Utc>>,
}

/// Peek query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeekQuery {
    /// Number of ads to look ahead; defaults to 1.
    #[serde(default)]
    pub n: Option<i64>,
}

/// Age-based listing query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingQuery {
    /// Duration string such as `"5s"`, `"3m"` or `"1h30m"`.
    pub age: String,
}

/// Category re-key payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprioritizeCategoryRequest {
    /// Category to move.
    #[serde(default, alias = "family")]
    pub category: String,
    /// Destination tier.
    #[serde(default, alias = "newPriority")]
    pub new_tier: i64,
}

/// Age re-key payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprioritizeAgeRequest {
    /// Duration string; ads waiting at least this long are moved.
    #[serde(default)]
    pub age: String,
    /// Destination tier.
    #[serde(default, alias = "newPriority")]
    pub new_tier: i64,
}

/// Anti-starvation toggle payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiStarvationRequest {
    /// New flag value.
    pub enable: bool,
}

/// Global max-wait payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaximumWaitRequest {
    /// New cap in seconds; must be positive.
    pub maximum_wait: i64,
}

/// Generic success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    /// Always true.
    pub ok: bool,
}

/// Re-key response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprioritizeResponse {
    /// Always true.
    pub ok: bool,
    /// Number of ads moved.
    pub moved: usize,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}

impl From<&QueueError> for ErrorResponse {
    fn from(err: &QueueError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Distribution response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResponse {
    /// Total ads waiting.
    pub total: usize,
    /// Per-tier shares, highest tier first.
    pub distribution: Vec<TierShare>,
    /// Current anti-starvation flag.
    pub enable_anti_starvation: bool,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Decode a JSON request body.
pub fn parse_request<T: DeserializeOwned>(body: &str) -> Result<T, QueueError> {
    serde_json::from_str(body).map_err(|e| QueueError::InvalidRequest(format!("invalid JSON: {e}")))
}

/// Parse a duration string made of decimal numbers with unit suffixes.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Segments add up, so `"1h30m"` and
/// `"1.5h"` are equal. A bare `"0"` is accepted; negative durations are not.
pub fn parse_duration(input: &str) -> Result<Duration, QueueError> {
    let invalid = |reason: &str| QueueError::InvalidDuration(format!("{reason}: {input:?}"));

    let trimmed = input.trim();
    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.starts_with('-') {
        return Err(invalid("negative duration"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut nanos = 0.0_f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid("expected number"));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    Duration::try_from_secs_f64(nanos / 1e9).map_err(|_| invalid("duration out of range"))
}

/// Admit an ad, with or without an explicit timestamp.
pub fn enqueue(queue: &AdQueue, req: EnqueueRequest) -> QueuedAd {
    match req.enqueue_at {
        Some(at) => queue.enqueue_at(req.ad, at),
        None => queue.enqueue(req.ad),
    }
}

/// Remove the next ad; an empty queue is [`QueueError::Empty`].
pub fn dequeue(queue: &AdQueue) -> Result<QueuedAd, QueueError> {
    queue.dequeue().ok_or(QueueError::Empty)
}

/// Look ahead without consuming.
pub fn peek(queue: &AdQueue, query: &PeekQuery) -> Result<Vec<QueuedAd>, QueueError> {
    let n = query.n.unwrap_or(1);
    let n = usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| QueueError::InvalidRequest("invalid n".into()))?;
    Ok(queue.peek(n))
}

/// Backlog per tier plus the anti-starvation flag.
pub fn distribution(queue: &AdQueue) -> DistributionResponse {
    let dist = queue.distribution();
    DistributionResponse {
        total: dist.total,
        distribution: dist.tiers,
        enable_anti_starvation: dist.anti_starvation_enabled,
    }
}

/// Ads waiting at least `query.age`.
pub fn waiting(queue: &AdQueue, query: &WaitingQuery) -> Result<Vec<QueuedAd>, QueueError> {
    if query.age.trim().is_empty() {
        return Err(QueueError::InvalidRequest("missing age".into()));
    }
    let age = parse_duration(&query.age)?;
    Ok(queue.waiting_longer_than(age))
}

/// Move a category to another tier.
pub fn reprioritize_category(
    queue: &AdQueue,
    req: &ReprioritizeCategoryRequest,
) -> Result<ReprioritizeResponse, QueueError> {
    if req.category.is_empty() || req.new_tier == 0 {
        return Err(QueueError::InvalidRequest(
            "category and newTier required".into(),
        ));
    }
    let moved = queue.reprioritize_by_category(&req.category, req.new_tier);
    Ok(ReprioritizeResponse { ok: true, moved })
}

/// Move every ad older than `req.age` to another tier.
pub fn reprioritize_age(
    queue: &AdQueue,
    req: &ReprioritizeAgeRequest,
) -> Result<ReprioritizeResponse, QueueError> {
    if req.age.is_empty() || req.new_tier == 0 {
        return Err(QueueError::InvalidRequest("age and newTier required".into()));
    }
    let age = parse_duration(&req.age)?;
    let moved = queue.reprioritize_by_age(age, req.new_tier);
    Ok(ReprioritizeResponse { ok: true, moved })
}

/// Toggle anti-starvation.
pub fn set_anti_starvation(queue: &AdQueue, req: &AntiStarvationRequest) -> OkResponse {
    queue.set_anti_starvation(req.enable);
    OkResponse { ok: true }
}

/// Change the global max-wait cap.
pub fn set_maximum_wait(
    queue: &AdQueue,
    req: &MaximumWaitRequest,
) -> Result<OkResponse, QueueError> {
    let cap = u64::try_from(req.maximum_wait)
        .ok()
        .filter(|&cap| cap > 0)
        .ok_or_else(|| QueueError::InvalidRequest("maximumWait must be > 0".into()))?;
    queue.set_max_wait_seconds(cap);
    Ok(OkResponse { ok: true })
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
