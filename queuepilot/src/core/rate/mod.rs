//! Rate representation for the leaky-bucket scheduler
//!
//! This module provides the [`Rate`] type which pairs a human-friendly
//! "permits per second" value with the emission interval the scheduler
//! actually works with.

use super::RateError;
use std::time::Duration;


/// Rate defines how often the limiter releases a permit
///
/// The permits-per-second value is kept as given so that reading a rate back
/// never drifts through repeated interval conversions. The interval is
/// derived once at construction.
///
/// # Examples
///
/// ```
/// use queuepilot::Rate;
/// use std::time::Duration;
///
/// // 10 permits per second
/// let rate = Rate::per_second(10.0).unwrap();
/// assert_eq!(rate.interval(), Duration::from_millis(100));
///
/// // One permit every two seconds
/// let rate = Rate::per_second(0.5).unwrap();
/// assert_eq!(rate.interval(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    permits_per_second: f64,
    interval: Duration,
}

impl Rate {
    /// Creates a rate of `permits` per second
    ///
    /// # Errors
    ///
    /// Returns [`RateError::InvalidRate`] if `permits` is zero, negative,
    /// NaN, infinite, or so small that its interval cannot be represented.
    pub fn per_second(permits: f64) -> Result<Self, RateError> {
        if !permits.is_finite() || permits <= 0.0 {
            return Err(RateError::InvalidRate(permits));
        }

        let interval = Duration::try_from_secs_f64(1.0 / permits)
            .map_err(|_| RateError::InvalidRate(permits))?;
        if interval.is_zero() {
            return Err(RateError::InvalidRate(permits));
        }

        Ok(Rate {
            permits_per_second: permits,
            interval,
        })
    }

    /// Creates a rate from the interval between two permits
    ///
    /// # Errors
    ///
    /// Returns [`RateError::InvalidInterval`] for a zero interval.
    ///
    /// ```
    /// use queuepilot::Rate;
    /// use std::time::Duration;
    ///
    /// let rate = Rate::from_interval(Duration::from_millis(250)).unwrap();
    /// assert_eq!(rate.permits_per_second(), 4.0);
    /// ```
    pub fn from_interval(interval: Duration) -> Result<Self, RateError> {
        if interval.is_zero() {
            return Err(RateError::InvalidInterval);
        }

        Ok(Rate {
            permits_per_second: 1.0 / interval.as_secs_f64(),
            interval,
        })
    }

    /// Returns the number of permits released per second
    pub fn permits_per_second(&self) -> f64 {
        self.permits_per_second
    }

    /// Returns the emission interval between two consecutive permits
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the interval in microseconds
    pub fn interval_micros(&self) -> f64 {
        self.interval.as_secs_f64() * 1_000_000.0
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/s", self.permits_per_second)
    }
}
