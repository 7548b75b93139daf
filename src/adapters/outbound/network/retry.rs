use chrono::{DateTime, Utc};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Longest server-directed pause honoured; larger hints are cut to this.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// How many times to try a request and how long to wait in between when
/// the server gives no hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Exponential delay after the `attempt`-th failure (1-based), capped at
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Pause to take for a server hint, at least the policy's own cap and
    /// never beyond [`MAX_RETRY_AFTER`].
    pub fn hinted_delay(&self, hint: Duration) -> Duration {
        hint.min(MAX_RETRY_AFTER.max(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    NotFound,
    RateLimited,
    Transient,
    Rejected,
}

pub fn classify(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        404 | 410 => ResponseClass::NotFound,
        429 => ResponseClass::RateLimited,
        408 | 500..=599 => ResponseClass::Transient,
        _ => ResponseClass::Rejected,
    }
}

/// Parses a `Retry-After` style value: integer seconds or an HTTP date.
///
/// Non-positive durations, dates in the past and anything unparsable mean
/// "no hint".
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(seconds) = value.parse::<i64>() {
        return u64::try_from(seconds)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    delta.to_std().ok().filter(|d| !d.is_zero())
}
