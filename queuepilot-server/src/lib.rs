//! # QueuePilot Server
//!
//! A self-regulating producer/consumer pipeline with a TCP control channel,
//! plus the collector that receives its telemetry.
//!
//! ## Purpose
//!
//! A producer and a consumer exchange items through a bounded queue. Each
//! side is paced by its own leaky-bucket limiter. A controller watches the
//! queue depth and moves the producer rate one step at a time so the
//! occupancy hovers around a threshold, never leaving the band between half
//! and twice the consumer rate.
//!
//! ## Quick Start
//!
//! ```bash
//! # Collector: telemetry on 6873, Prometheus scrape on 9090
//! queuepilot-collector
//!
//! # Pipeline: control port 7368, telemetry to 127.0.0.1:6873
//! queuepilot --consumer-rate 10 --queue-threshold 5
//!
//! # Steer it: new consumer rate 5, keep controller rate, threshold 100
//! echo "5:_:100" | nc localhost 7368
//!
//! # Observe it
//! curl http://localhost:9090/metrics
//! ```
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes
//! precedence). List every variable with `queuepilot --list-env-vars`.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  control   ┌───────────────┐
//! │   client   │───────────▶│ ControlServer │──┐
//! └────────────┘            └───────────────┘  │ rates, threshold
//!                                              ▼
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Producer │──▶│ PipelineState│◀──│   Consumer    │
//! └──────────┘   └──────┬───────┘   └───────────────┘
//!                       │ snapshot
//!                ┌──────▼─────┐  telemetry  ┌───────────┐
//!                │ Controller │────────────▶│ Collector │──▶ /metrics
//!                └────────────┘             └───────────┘
//! ```
//!
//! ## Protocol
//!
//! All traffic is newline-terminated ASCII; see [`queuepilot::protocol`].
//!
//! ## Shutdown
//!
//! Every task observes one [`CancellationToken`](tokio_util::sync::CancellationToken).
//! Cancelling it wakes every blocked queue operation, limiter wait and
//! socket read; [`Pipeline::shutdown`](pipeline::Pipeline::shutdown) then
//! joins the tasks.

pub mod collector;
pub mod config;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod telemetry;
pub mod transport;

pub use pipeline::{Pipeline, PipelineState, Shutdown};
pub use transport::control::ControlServer;
