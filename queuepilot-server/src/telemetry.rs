//! Telemetry publishing
//!
//! The controller publishes one [`MetricsSnapshot`] per tick through a
//! [`TelemetrySink`]. Publishing is best-effort: a sink never reports
//! failure to its caller.

use crate::transport::framing::send_line;
use anyhow::{Context, Result};
use async_trait::async_trait;
use queuepilot::MetricsSnapshot;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Destination for controller snapshots
#[async_trait]
pub trait TelemetrySink: Send {
    /// Deliver one snapshot; failures are logged and swallowed
    async fn publish(&mut self, snapshot: &MetricsSnapshot);
}

/// Pushes telemetry frames to a collector over one TCP connection
///
/// The connection is opened once. If the collector goes away every later
/// publish logs a warning; there is no reconnect.
pub struct TcpTelemetryPublisher {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTelemetryPublisher {
    /// Resolve `host` and connect to the collector
    ///
    /// # Errors
    ///
    /// Fails when the host does not resolve or the connection is refused.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to telemetry collector at {host}:{port}"))?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        info!("Publishing telemetry to {}", peer);
        Ok(TcpTelemetryPublisher { stream, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl TelemetrySink for TcpTelemetryPublisher {
    async fn publish(&mut self, snapshot: &MetricsSnapshot) {
        let frame = snapshot.encode();
        if let Err(e) = send_line(&mut self.stream, &frame).await {
            warn!("Failed to send telemetry to {}: {}", self.peer, e);
        }
    }
}

/// Sink used when telemetry is turned off
#[derive(Debug, Default)]
pub struct DisabledTelemetry;

#[async_trait]
impl TelemetrySink for DisabledTelemetry {
    async fn publish(&mut self, snapshot: &MetricsSnapshot) {
        debug!("Telemetry disabled, dropping frame {}", snapshot.encode());
    }
}

/// Forwards snapshots to an in-process channel
pub struct ChannelTelemetry {
    tx: mpsc::UnboundedSender<MetricsSnapshot>,
}

impl ChannelTelemetry {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MetricsSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelTelemetry { tx }, rx)
    }
}

#[async_trait]
impl TelemetrySink for ChannelTelemetry {
    async fn publish(&mut self, snapshot: &MetricsSnapshot) {
        if self.tx.send(*snapshot).is_err() {
            debug!("Telemetry receiver dropped");
        }
    }
}
