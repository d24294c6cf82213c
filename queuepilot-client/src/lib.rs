//! Client library for the queuepilot control channel
//!
//! Connects to a running pipeline, checks the banner, and sends commands
//! that change the consumer rate, the controller rate or the queue
//! threshold at runtime. Every request is bounded by a timeout.
//!
//! ```no_run
//! # async fn run() -> queuepilot_client::Result<()> {
//! use queuepilot::{ControlCommand, Rate};
//! use queuepilot_client::ControlClient;
//! use std::time::Duration;
//!
//! let mut client = ControlClient::builder()
//!     .request_timeout(Duration::from_secs(2))
//!     .connect("127.0.0.1:7368")
//!     .await?;
//!
//! // Equivalent to sending "5:_:100"
//! let command = ControlCommand::keep_all()
//!     .with_consumer_rate(Rate::per_second(5.0)?)
//!     .with_queue_threshold(100);
//! client.send(&command).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{ClientBuilder, ControlClient};
pub use error::{ClientError, Result};
