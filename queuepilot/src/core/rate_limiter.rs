//! Leaky-bucket rate limiter implementation
//!
//! This module provides the [`RateLimiter`] scheduler. It never grants bursts:
//! each claim pushes the next free slot forward by one interval per permit,
//! and unused capacity from idle periods is discarded rather than banked.

use super::Rate;
use std::time::{Duration, Instant};

/// Leaky-bucket permit scheduler
///
/// The limiter does not sleep by itself. [`claim`](RateLimiter::claim) returns
/// how long the caller has to wait before proceeding, which keeps the
/// scheduling logic independent of any runtime and lets tests drive it with
/// synthetic timestamps.
///
/// The limiter itself is not thread-safe. Callers sharing one instance wrap
/// it in a mutex and release the lock before sleeping.
///
/// # Example
///
/// ```
/// use queuepilot::{Rate, RateLimiter};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut limiter = RateLimiter::new(Rate::per_second(1.0).unwrap(), start);
///
/// assert_eq!(limiter.claim(1, start), Duration::ZERO);
/// assert_eq!(limiter.claim(1, start), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate: Rate,
    next_free: Instant,
}

impl RateLimiter {
    /// Create a limiter whose first permit is free at `now`
    pub fn new(rate: Rate, now: Instant) -> Self {
        RateLimiter {
            rate,
            next_free: now,
        }
    }

    /// Reserve `permits` and return how long the caller must wait
    ///
    /// If `now` is past the next free slot, the schedule catches up to `now`
    /// first, so idle time never turns into burst credit. The returned wait
    /// only covers the time until the *first* reserved permit; the remaining
    /// permits delay whoever claims next.
    pub fn claim(&mut self, permits: u32, now: Instant) -> Duration {
        if now > self.next_free {
            self.next_free = now;
        }

        let wait = self.next_free.saturating_duration_since(now);
        self.next_free += self.rate.interval().saturating_mul(permits);

        wait
    }

    /// Replace the rate
    ///
    /// Only the interval changes. Slots already reserved keep their place in
    /// the schedule, so the new rate shows up once the backlog has drained.
    pub fn set_rate(&mut self, rate: Rate) {
        self.rate = rate;
    }

    /// Current rate
    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Instant at which the next permit becomes free
    pub fn next_free(&self) -> Instant {
        self.next_free
    }
}
