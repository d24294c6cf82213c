//! Shared, sleeping wrapper around the leaky-bucket scheduler
//!
//! [`SharedLimiter`] owns one [`RateLimiter`] behind its own lock. Callers
//! reserve their slot under the lock, release it, and only then sleep, so a
//! rate change from the controller or the control channel never waits for a
//! sleeping producer.

use crate::pipeline::Shutdown;
use parking_lot::Mutex;
use queuepilot::{Rate, RateLimiter};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Rate limiter shared between the throttled task and whoever steers it
pub struct SharedLimiter {
    name: &'static str,
    inner: Mutex<RateLimiter>,
}

impl SharedLimiter {
    /// Create a limiter whose first permit is free immediately
    pub fn new(name: &'static str, rate: Rate) -> Self {
        SharedLimiter {
            name,
            inner: Mutex::new(RateLimiter::new(rate, Instant::now().into_std())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for one permit
    pub async fn acquire(&self, shutdown: &CancellationToken) -> Result<Duration, Shutdown> {
        self.acquire_permits(1, shutdown).await
    }

    /// Wait until `permits` have been reserved and the first one is due
    ///
    /// Returns the time spent waiting, or [`Shutdown`] if the token fires
    /// first. A cancelled wait keeps its reservation: the schedule only ever
    /// moves forward.
    pub async fn acquire_permits(
        &self,
        permits: u32,
        shutdown: &CancellationToken,
    ) -> Result<Duration, Shutdown> {
        let wait = self.inner.lock().claim(permits, Instant::now().into_std());

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(Shutdown),
            _ = sleep(wait) => Ok(wait),
        }
    }

    /// Replace the rate; permits already reserved are not rescheduled
    pub fn set_rate(&self, rate: Rate) {
        self.inner.lock().set_rate(rate);
    }

    pub fn rate(&self) -> Rate {
        self.inner.lock().rate()
    }
}

impl std::fmt::Debug for SharedLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLimiter")
            .field("name", &self.name)
            .field("rate", &self.rate())
            .finish()
    }
}
