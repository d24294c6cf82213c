//! Control server
//!
//! Each connection receives the banner, then any number of command frames,
//! each answered with the acknowledgement:
//!
//! ```text
//! $ telnet localhost 7368
//! Message Format = new_cons_rate:new_orch_rate:new_queue_size_threshold (Use '_' to keep the current values)
//! 5:_:100
//! Metrics Updated
//! ```
//!
//! Invalid tokens are logged and skipped; the rest of the command is still
//! applied and acknowledged. Connections share no state beyond the pipeline
//! itself.

use super::framing::{LineError, LineReader, send_line};
use super::{ConnectionHandler, Listener};
use crate::pipeline::PipelineState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use queuepilot::ControlCommand;
use queuepilot::protocol::{ACKNOWLEDGEMENT, BANNER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Applies control frames from one connection to the pipeline
pub struct ControlHandler {
    state: Arc<PipelineState>,
}

impl ControlHandler {
    pub fn new(state: Arc<PipelineState>) -> Self {
        ControlHandler { state }
    }
}

#[async_trait]
impl ConnectionHandler for ControlHandler {
    async fn handle(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = LineReader::new(read_half);

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            sent = send_line(&mut write_half, BANNER) => sent.context("Failed to send banner")?,
        }

        loop {
            let payload = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                line = reader.read_line() => match line {
                    Ok(payload) => payload,
                    Err(LineError::Closed) => {
                        debug!("Control client {} disconnected", peer);
                        return Ok(());
                    }
                    Err(e) => return Err(e).context("Failed to read control frame"),
                },
            };

            let parsed = ControlCommand::parse(&payload);
            for error in &parsed.errors {
                warn!("Control frame from {}: {}", peer, error);
            }
            if parsed.ignored_tokens > 0 {
                warn!(
                    "Control frame from {}: ignoring {} extra token(s)",
                    peer, parsed.ignored_tokens
                );
            }

            self.state.apply(&parsed.command);

            // A peer that never reads can block this write indefinitely
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                sent = send_line(&mut write_half, ACKNOWLEDGEMENT) => {
                    sent.context("Failed to send acknowledgement")?
                }
            }
        }
    }
}

/// Listener for control connections bound to one pipeline
pub struct ControlServer {
    listener: Listener,
    state: Arc<PipelineState>,
}

impl ControlServer {
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn bind(host: &str, port: u16, state: Arc<PipelineState>) -> Result<Self> {
        let listener = Listener::bind("Control server", host, port).await?;
        Ok(ControlServer { listener, state })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let handler = Arc::new(ControlHandler::new(self.state));
        self.listener.serve(handler, shutdown).await
    }
}
