//! Request rate tracking over a fixed window.
//!
//! A single `RateLimiter` is shared by every conversation in the process.
//! It counts accepted requests, blocks once the window is at capacity, and
//! rolls over when the host forwards a clock reading at or past the reset
//! deadline. It never owns a timer.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use citebase_types::budget::{RateBudget, RateStatus};
use citebase_types::config::RateLimitConfig;

/// Tracks the shared request window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    budget: RateBudget,
    window: Duration,
    near_limit_ratio: f64,
}

impl RateLimiter {
    /// Create an empty window of `window` length starting at `now`.
    pub fn new(max_requests: u32, window: Duration, near_limit_ratio: f64, now: DateTime<Utc>) -> Self {
        Self {
            budget: RateBudget::new(max_requests, deadline(now, window)),
            window,
            near_limit_ratio,
        }
    }

    /// Create a limiter from configuration, pre-counting `initial_requests`.
    pub fn from_config(config: &RateLimitConfig, now: DateTime<Utc>) -> Self {
        let mut limiter = Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.near_limit_ratio,
            now,
        );
        limiter.budget.current_requests = config.initial_requests.min(config.max_requests);
        limiter.budget.is_blocked = limiter.budget.is_at_capacity();
        limiter
    }

    /// Current window state.
    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Fraction of the window's capacity in use.
    pub fn usage_ratio(&self) -> f64 {
        if self.budget.max_requests == 0 {
            return 1.0;
        }
        self.budget.current_requests as f64 / self.budget.max_requests as f64
    }

    pub fn status(&self) -> RateStatus {
        if self.budget.is_blocked || self.budget.is_at_capacity() {
            RateStatus::Blocked
        } else if self.usage_ratio() >= self.near_limit_ratio {
            RateStatus::NearLimit
        } else {
            RateStatus::Available
        }
    }

    /// Count one request.
    ///
    /// Only legal while not blocked; calling it while blocked leaves the
    /// state untouched and returns `false`. The submission gate checks
    /// capacity before calling this.
    pub fn record_request(&mut self) -> bool {
        if self.status() == RateStatus::Blocked {
            return false;
        }
        self.budget.current_requests += 1;
        if self.budget.is_at_capacity() {
            self.budget.is_blocked = true;
            debug!(
                current = self.budget.current_requests,
                max = self.budget.max_requests,
                "Rate window reached capacity"
            );
        }
        true
    }

    /// Mark the window blocked after a refused submission. Idempotent.
    ///
    /// Only takes effect at capacity so the blocked flag never contradicts
    /// the counter.
    pub fn force_block(&mut self) {
        if self.budget.is_at_capacity() {
            self.budget.is_blocked = true;
        }
    }

    /// Roll the window over if `now` has reached the reset deadline.
    ///
    /// Safe to call at any frequency: before the deadline it is a no-op.
    /// Returns `true` when a reset happened.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.budget.reset_time {
            return false;
        }
        self.reset(now);
        true
    }

    /// Unconditionally start a fresh window at `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.budget = RateBudget::new(self.budget.max_requests, deadline(now, self.window));
        info!(reset_at = %self.budget.reset_time, "Rate window reset");
    }

    /// Time left until the window rolls over, never negative.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.budget.reset_time - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// `now + window`, saturating at the largest representable instant.
fn deadline(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(15, Duration::from_secs(60), 0.80, start())
    }

    #[test]
    fn test_fresh_window_is_available() {
        let limiter = limiter();
        assert_eq!(limiter.status(), RateStatus::Available);
        assert_eq!(limiter.budget().current_requests, 0);
        assert_eq!(limiter.budget().reset_time, start() + TimeDelta::seconds(60));
    }

    #[test]
    fn test_near_limit_at_eighty_percent() {
        let mut limiter = limiter();
        for _ in 0..11 {
            limiter.record_request();
        }
        assert_eq!(limiter.status(), RateStatus::Available);
        limiter.record_request(); // 12 / 15 = 0.80
        assert_eq!(limiter.status(), RateStatus::NearLimit);
    }

    #[test]
    fn test_blocks_when_reaching_capacity() {
        let mut limiter = limiter();
        for _ in 0..14 {
            assert!(limiter.record_request());
        }
        assert!(!limiter.budget().is_blocked);
        assert!(limiter.record_request());
        assert!(limiter.budget().is_blocked);
        assert_eq!(limiter.status(), RateStatus::Blocked);
    }

    #[test]
    fn test_record_while_blocked_is_noop() {
        let mut limiter = limiter();
        for _ in 0..15 {
            limiter.record_request();
        }
        let before = limiter.budget().clone();
        assert!(!limiter.record_request());
        assert_eq!(limiter.budget(), &before);
    }

    #[test]
    fn test_force_block_is_idempotent_and_never_increments() {
        let mut limiter = limiter();
        for _ in 0..15 {
            limiter.record_request();
        }
        limiter.force_block();
        limiter.force_block();
        assert!(limiter.budget().is_blocked);
        assert_eq!(limiter.budget().current_requests, 15);
    }

    #[test]
    fn test_force_block_below_capacity_keeps_invariant() {
        let mut limiter = limiter();
        limiter.record_request();
        limiter.force_block();
        assert!(!limiter.budget().is_blocked);
    }

    #[test]
    fn test_tick_before_deadline_is_noop() {
        let mut limiter = limiter();
        limiter.record_request();
        let before = limiter.budget().clone();
        assert!(!limiter.tick(start() + TimeDelta::seconds(59)));
        assert_eq!(limiter.budget(), &before);
    }

    #[test]
    fn test_tick_at_deadline_resets() {
        let mut limiter = limiter();
        for _ in 0..15 {
            limiter.record_request();
        }
        let now = start() + TimeDelta::seconds(60);
        assert!(limiter.tick(now));
        let budget = limiter.budget();
        assert_eq!(budget.current_requests, 0);
        assert!(!budget.is_blocked);
        assert_eq!(budget.max_requests, 15);
        assert_eq!(budget.reset_time, now + TimeDelta::seconds(60));
    }

    #[test]
    fn test_repeated_tick_at_same_instant_resets_once() {
        let mut limiter = limiter();
        limiter.record_request();
        let now = start() + TimeDelta::seconds(75);
        assert!(limiter.tick(now));
        let after_first = limiter.budget().clone();
        assert!(!limiter.tick(now));
        assert!(!limiter.tick(now));
        assert_eq!(limiter.budget(), &after_first);
    }

    #[test]
    fn test_time_until_reset_clamps_to_zero() {
        let limiter = limiter();
        assert_eq!(
            limiter.time_until_reset(start() + TimeDelta::seconds(20)),
            Duration::from_secs(40)
        );
        assert_eq!(
            limiter.time_until_reset(start() + TimeDelta::seconds(600)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_from_config_precounts_initial_requests() {
        let config = RateLimitConfig {
            initial_requests: 9,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::from_config(&config, start());
        assert_eq!(limiter.budget().current_requests, 9);
        assert_eq!(limiter.status(), RateStatus::Available);

        let full = RateLimitConfig {
            initial_requests: 15,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::from_config(&full, start());
        assert!(limiter.budget().is_blocked);
    }

    #[test]
    fn test_explicit_reset_ignores_deadline() {
        let mut limiter = limiter();
        for _ in 0..15 {
            limiter.record_request();
        }
        let now = start() + TimeDelta::seconds(5);
        limiter.reset(now);
        assert_eq!(limiter.status(), RateStatus::Available);
        assert_eq!(limiter.budget().reset_time, now + TimeDelta::seconds(60));
    }
}
