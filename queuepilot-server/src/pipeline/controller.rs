use super::{PipelineState, Shutdown};
use crate::telemetry::TelemetrySink;
use queuepilot::Controller;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub(super) async fn run_controller(
    state: Arc<PipelineState>,
    controller: Controller,
    mut telemetry: Box<dyn TelemetrySink>,
    shutdown: CancellationToken,
) {
    let mut ticks = 0u64;
    let _ = control_loop(&state, &controller, telemetry.as_mut(), &shutdown, &mut ticks).await;
    debug!("Controller stopped after {} ticks", ticks);
}

async fn control_loop(
    state: &PipelineState,
    controller: &Controller,
    telemetry: &mut dyn TelemetrySink,
    shutdown: &CancellationToken,
    ticks: &mut u64,
) -> Result<(), Shutdown> {
    loop {
        state.controller_limiter().acquire(shutdown).await?;

        let snapshot = state.snapshot();
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(Shutdown),
            _ = telemetry.publish(&snapshot) => {}
        }

        let decision = controller.step(
            state.producer_limiter().rate(),
            state.consumer_limiter().rate(),
            snapshot.occupancy,
            snapshot.queue_threshold,
        );
        state.producer_limiter().set_rate(decision.target);
        *ticks += 1;

        if decision.is_change() {
            debug!(
                "Tick {}: occupancy {} vs threshold {}, {:?} producer {} -> {}",
                ticks,
                snapshot.occupancy,
                snapshot.queue_threshold,
                decision.direction,
                decision.previous,
                decision.target
            );
        } else {
            trace!(
                "Tick {}: occupancy {} vs threshold {}, producer held at {}",
                ticks, snapshot.occupancy, snapshot.queue_threshold, decision.target
            );
        }
    }
}
