//! The running pipeline
//!
//! ```text
//!  ┌──────────┐  push   ┌──────────────┐   pop   ┌──────────┐
//!  │ Producer │────────▶│ BoundedQueue │────────▶│ Consumer │
//!  └────▲─────┘         └──────┬───────┘         └────▲─────┘
//!       │ set_rate             │ counts               │ set_rate
//!  ┌────┴───────┐  snapshot    │                ┌─────┴─────────┐
//!  │ Controller │◀─────────────┘                │ ControlServer │
//!  └────┬───────┘                               └───────────────┘
//!       │ publish
//!       ▼
//!  TelemetrySink
//! ```
//!
//! Every task shares one [`PipelineState`] and one cancellation token.
//! Each piece of state has its own lock, and no lock is held across an
//! await.

mod controller;
mod workers;


use crate::config::{ListenConfig, PipelineConfig};
use crate::limiter::SharedLimiter;
use crate::queue::BoundedQueue;
use crate::telemetry::TelemetrySink;
use crate::transport::control::ControlServer;
use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use queuepilot::{ControlCommand, Controller, MetricsSnapshot, Rate};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Returned by every blocking operation once shutdown has been requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pipeline is shutting down")]
pub struct Shutdown;

/// State shared by the pipeline tasks and the control server
pub struct PipelineState {
    queue: BoundedQueue<u64>,
    producer: SharedLimiter,
    consumer: SharedLimiter,
    controller: SharedLimiter,
    queue_threshold: Mutex<usize>,
}

impl PipelineState {
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(PipelineState {
            queue: BoundedQueue::new(config.queue_capacity),
            producer: SharedLimiter::new("producer", rate(config.producer_rate)?),
            consumer: SharedLimiter::new("consumer", rate(config.consumer_rate)?),
            controller: SharedLimiter::new("controller", rate(config.controller_rate)?),
            queue_threshold: Mutex::new(config.queue_threshold),
        })
    }

    pub fn queue(&self) -> &BoundedQueue<u64> {
        &self.queue
    }

    pub fn producer_limiter(&self) -> &SharedLimiter {
        &self.producer
    }

    pub fn consumer_limiter(&self) -> &SharedLimiter {
        &self.consumer
    }

    pub fn controller_limiter(&self) -> &SharedLimiter {
        &self.controller
    }

    pub fn queue_threshold(&self) -> usize {
        *self.queue_threshold.lock()
    }

    pub fn set_queue_threshold(&self, threshold: usize) {
        *self.queue_threshold.lock() = threshold;
    }

    /// Current counters, threshold and producer rate
    ///
    /// The queue counters are read under one lock and are consistent with
    /// each other; the threshold and rate are read right after.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counts = self.queue.counts();
        MetricsSnapshot::new(self.producer.rate(), counts, self.queue_threshold())
    }

    /// Apply every field set in `command`, leaving the others untouched
    pub fn apply(&self, command: &ControlCommand) {
        if let Some(rate) = command.consumer_rate {
            self.consumer.set_rate(rate);
            info!("{} rate set to {}", self.consumer.name(), rate);
        }
        if let Some(rate) = command.controller_rate {
            self.controller.set_rate(rate);
            info!("{} rate set to {}", self.controller.name(), rate);
        }
        if let Some(threshold) = command.queue_threshold {
            self.set_queue_threshold(threshold);
            info!("Queue threshold set to {}", threshold);
        }
    }
}

fn rate(permits_per_second: f64) -> Result<Rate> {
    Rate::per_second(permits_per_second).map_err(|e| anyhow!("{e}"))
}

fn prepare(config: &PipelineConfig) -> Result<(Arc<PipelineState>, Controller)> {
    let state = PipelineState::new(config).context("Invalid pipeline configuration")?;
    let controller = Controller::new(config.controller_step)
        .map_err(|e| anyhow!("Invalid controller step: {e}"))?;
    Ok((Arc::new(state), controller))
}

/// Handle to the producer, consumer and controller tasks
pub struct Pipeline {
    state: Arc<PipelineState>,
    tasks: JoinSet<()>,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Build the shared state from `config` and start the tasks
    pub fn spawn(
        config: &PipelineConfig,
        telemetry: Box<dyn TelemetrySink>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let (state, controller) = prepare(config)?;
        Ok(Self::start(state, controller, telemetry, shutdown))
    }

    /// Bind the control listener, then start the tasks
    ///
    /// Nothing is spawned unless the configuration is valid and the control
    /// address could be bound.
    pub async fn launch(
        config: &PipelineConfig,
        control: &ListenConfig,
        telemetry: Box<dyn TelemetrySink>,
        shutdown: CancellationToken,
    ) -> Result<(Self, ControlServer)> {
        let (state, controller) = prepare(config)?;
        let server = ControlServer::bind(&control.host, control.port, Arc::clone(&state)).await?;

        Ok((Self::start(state, controller, telemetry, shutdown), server))
    }

    /// Start the tasks on existing state
    pub fn start(
        state: Arc<PipelineState>,
        controller: Controller,
        telemetry: Box<dyn TelemetrySink>,
        shutdown: CancellationToken,
    ) -> Self {
        let mut tasks = JoinSet::new();

        let step = controller.step_size();
        tasks.spawn(workers::run_producer(Arc::clone(&state), shutdown.clone()));
        tasks.spawn(workers::run_consumer(Arc::clone(&state), shutdown.clone()));
        tasks.spawn(controller::run_controller(
            Arc::clone(&state),
            controller,
            telemetry,
            shutdown.clone(),
        ));

        info!(
            "Pipeline started: capacity {}, producer {}, consumer {}, controller {}, threshold {}, step {}",
            state.queue().capacity(),
            state.producer_limiter().rate(),
            state.consumer_limiter().rate(),
            state.controller_limiter().rate(),
            state.queue_threshold(),
            step
        );

        Pipeline {
            state,
            tasks,
            shutdown,
        }
    }

    pub fn state(&self) -> Arc<PipelineState> {
        Arc::clone(&self.state)
    }

    /// Cancel every task and wait for all of them to stop
    ///
    /// # Errors
    ///
    /// Returns an error if a task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.cancel();

        let mut panicked = 0;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Pipeline task panicked: {}", e);
                panicked += 1;
            }
        }

        let counts = self.state.queue().counts();
        info!(
            "Pipeline stopped: produced {}, consumed {}, left in queue {}",
            counts.produced_total, counts.consumed_total, counts.occupancy
        );

        if panicked > 0 {
            return Err(anyhow!("{panicked} pipeline task(s) panicked"));
        }
        Ok(())
    }
}
