//! Wall-clock helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// Current wall-clock time in UTC.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// The instant `age` before `now`, or `None` when it falls outside the representable range.
#[must_use]
pub fn cutoff_before(now: DateTime<Utc>, age: std::time::Duration) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::from_std(age).ok()?;
    now.checked_sub_signed(delta)
}

/// Elapsed time in fractional seconds. Negative when `since` is in the future.
#[must_use]
pub fn elapsed_secs(elapsed: TimeDelta) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = elapsed.num_milliseconds() as f64;
    millis / 1000.0
}
