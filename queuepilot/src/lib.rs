//! # queuepilot
//!
//! Building blocks for a self-regulating producer/consumer pipeline.
//!
//! ## Overview
//!
//! A producer and a consumer exchange items through a fixed-capacity buffer.
//! Both sides are paced by leaky-bucket rate limiters, and a feedback
//! controller nudges the producer rate up or down to keep the buffer
//! occupancy around a threshold.
//!
//! This crate holds the runtime-independent parts:
//!
//! - [`RateLimiter`]: leaky-bucket scheduler with no burst allowance
//! - [`Ring`]: fixed-capacity circular buffer with lifetime counters
//! - [`Controller`]: fixed-step threshold controller
//! - [`protocol`]: the line-oriented telemetry and control formats
//!
//! With the `tokio` feature, the `framing` module adds async newline framing
//! for those formats.
//!
//! Nothing here sleeps or blocks. Time-dependent operations take the current
//! instant as a parameter and return how long the caller has to wait, so the
//! async pipeline in `queuepilot-server` decides how to wait.
//!
//! ## Quick Start
//!
//! ```
//! use queuepilot::{Rate, RateLimiter};
//! use std::time::{Duration, Instant};
//!
//! let start = Instant::now();
//! let mut limiter = RateLimiter::new(Rate::per_second(1.0).unwrap(), start);
//!
//! limiter.claim(1, start);
//! limiter.claim(1, start);
//!
//! // Slots already reserved keep their place after a rate change
//! limiter.set_rate(Rate::per_second(0.5).unwrap());
//! assert_eq!(limiter.claim(1, start), Duration::from_secs(2));
//! assert_eq!(limiter.claim(1, start), Duration::from_secs(4));
//! ```
//!
//! ## Feedback Control
//!
//! ```
//! use queuepilot::{Controller, Rate};
//!
//! let controller = Controller::new(1.0).unwrap();
//! let consumer = Rate::per_second(10.0).unwrap();
//! let mut producer = Rate::per_second(10.0).unwrap();
//!
//! // Occupancy stays above the threshold: the producer backs off to half
//! // the consumer rate and stays there
//! for _ in 0..10 {
//!     producer = controller.step(producer, consumer, 50, 5).target;
//! }
//! assert_eq!(producer.permits_per_second(), 5.0);
//! ```
//!
//! ## Thread Safety
//!
//! [`RateLimiter`] and [`Ring`] are plain data structures. For concurrent
//! access, wrap each in its own mutex and never hold the lock while waiting.
//!
//! ## Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for [`MetricsSnapshot`] and
//!   [`QueueCounts`]

pub mod core;
#[cfg(feature = "tokio")]
pub mod framing;
pub mod protocol;

pub use core::{
    ControlDecision, Controller, Direction, QueueCounts, Rate, RateError, RateLimiter, Ring,
};
pub use protocol::{ControlCommand, Field, FieldError, FrameError, MetricsSnapshot, ParsedCommand};
