use super::{PipelineState, Shutdown};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub(super) async fn run_producer(state: Arc<PipelineState>, shutdown: CancellationToken) {
    let mut sequence = 0u64;
    let _ = produce(&state, &shutdown, &mut sequence).await;
    debug!("Producer stopped after {} items", sequence);
}

async fn produce(
    state: &PipelineState,
    shutdown: &CancellationToken,
    sequence: &mut u64,
) -> Result<(), Shutdown> {
    loop {
        state.producer_limiter().acquire(shutdown).await?;
        state.queue().push(*sequence, shutdown).await?;
        *sequence = sequence.wrapping_add(1);
    }
}

pub(super) async fn run_consumer(state: Arc<PipelineState>, shutdown: CancellationToken) {
    let mut consumed = 0u64;
    let _ = consume(&state, &shutdown, &mut consumed).await;
    debug!("Consumer stopped after {} items", consumed);
}

async fn consume(
    state: &PipelineState,
    shutdown: &CancellationToken,
    consumed: &mut u64,
) -> Result<(), Shutdown> {
    loop {
        state.consumer_limiter().acquire(shutdown).await?;
        let item = state.queue().pop(shutdown).await?;
        trace!("Consumed item {}", item);
        *consumed += 1;
    }
}
