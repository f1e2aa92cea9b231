//! Advisory GitHub rate-limit tracking
//!
//! The flag is raised when a response reports `x-ratelimit-remaining: 0` and
//! lowered by the next successful response that does not. Nothing is blocked
//! or queued while it is raised; callers read it and decide what to do.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

/// How long the flag stays raised without a clearing response
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// Response header carrying the remaining request budget
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Rate-limit flag owned by a client instance.
#[derive(Debug, Default)]
pub struct RateLimitState {
    /// Unix milliseconds until which the flag is raised; 0 when clear
    limited_until: AtomicI64,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise or clear the flag.
    pub fn set_rate_limited(&self, limited: bool) {
        if limited {
            let until = Utc::now().timestamp_millis() + RATE_LIMIT_COOLDOWN.as_millis() as i64;
            let previous = self.limited_until.swap(until, Ordering::SeqCst);
            if previous == 0 {
                warn!("GitHub API rate limit reached");
            }
        } else {
            let previous = self.limited_until.swap(0, Ordering::SeqCst);
            if previous != 0 {
                debug!("GitHub API rate limit cleared");
            }
        }
    }

    /// True while the flag is raised and its cool-down has not elapsed.
    pub fn is_rate_limited(&self) -> bool {
        let until = self.limited_until.load(Ordering::SeqCst);
        until != 0 && Utc::now().timestamp_millis() < until
    }

    /// Record what a successful response said about the remaining budget.
    pub fn observe(&self, remaining: Option<u64>) {
        self.set_rate_limited(remaining == Some(0));
    }
}

/// Parse the remaining-budget header from a response.
pub fn remaining_from_headers(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
