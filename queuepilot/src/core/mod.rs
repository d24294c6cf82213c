//! Core components of the queuepilot library
//!
//! This module contains the fundamental building blocks:
//! - [`rate`]: Permits-per-second rates and their emission intervals
//! - [`rate_limiter`]: The leaky-bucket permit scheduler
//! - [`ring`]: The fixed-capacity circular buffer behind the pipeline queue
//! - [`controller`]: The bang-bang producer rate controller

pub mod controller;
pub mod rate;
pub mod rate_limiter;
pub mod ring;

pub use controller::{ControlDecision, Controller, Direction};
pub use rate::Rate;
pub use rate_limiter::RateLimiter;
pub use ring::{QueueCounts, Ring};

use std::error::Error;
use std::fmt;

/// Errors raised when building rates or controllers
///
/// # Example
///
/// ```
/// use queuepilot::{Rate, RateError};
///
/// match Rate::per_second(0.0) {
///     Err(RateError::InvalidRate(r)) => println!("rejected rate {r}"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RateError {
    /// The rate was not a positive, finite number of permits per second
    InvalidRate(f64),
    /// A zero interval between permits was requested
    InvalidInterval,
    /// The controller step was not positive and finite
    InvalidStep(f64),
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::InvalidRate(r) => write!(f, "invalid rate: {r} permits/s"),
            RateError::InvalidInterval => write!(f, "interval must be greater than zero"),
            RateError::InvalidStep(s) => write!(f, "invalid controller step: {s}"),
        }
    }
}

impl Error for RateError {}
