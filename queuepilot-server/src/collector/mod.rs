//! Telemetry collector
//!
//! Receives the frames a pipeline publishes and exposes the latest values
//! over HTTP. Any number of pipelines may connect; the gauges always show
//! the most recent frame from any of them.

pub mod http;

use crate::config::CollectorConfig;
use crate::metrics::CollectorMetrics;
use crate::transport::framing::{LineError, LineReader};
use crate::transport::{ConnectionHandler, Listener};
use anyhow::{Context, Result};
use async_trait::async_trait;
use queuepilot::MetricsSnapshot;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Decodes telemetry frames from one connection into the metrics registry
pub struct TelemetryIngest {
    metrics: Arc<CollectorMetrics>,
}

impl TelemetryIngest {
    pub fn new(metrics: Arc<CollectorMetrics>) -> Self {
        TelemetryIngest { metrics }
    }
}

struct ConnectionGuard<'a>(&'a CollectorMetrics);

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.0.connection_closed();
    }
}

#[async_trait]
impl ConnectionHandler for TelemetryIngest {
    async fn handle(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.metrics.connection_opened();
        let _guard = ConnectionGuard(&self.metrics);
        info!("Telemetry publisher connected from {}", peer);

        let mut reader = LineReader::new(stream);
        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                line = reader.read_line() => line,
            };

            let payload = match line {
                Ok(payload) => payload,
                Err(LineError::Closed) => {
                    info!("Telemetry publisher {} disconnected", peer);
                    return Ok(());
                }
                Err(LineError::Io(e)) => {
                    return Err(e).context("Failed to read telemetry frame");
                }
                Err(e) => {
                    warn!("Rejected telemetry frame from {}: {}", peer, e);
                    self.metrics.record_rejected();
                    continue;
                }
            };

            match MetricsSnapshot::parse(&payload) {
                Ok(snapshot) => {
                    trace!("Telemetry from {}: {}", peer, payload);
                    self.metrics.record_snapshot(snapshot);
                }
                Err(e) => {
                    warn!("Rejected telemetry frame {:?} from {}: {}", payload, peer, e);
                    self.metrics.record_rejected();
                }
            }
        }
    }
}

/// Telemetry listener plus HTTP scrape endpoint
pub struct Collector {
    telemetry: Listener,
    http: TcpListener,
    http_addr: SocketAddr,
    metrics: Arc<CollectorMetrics>,
}

impl Collector {
    /// Bind both listeners
    ///
    /// # Errors
    ///
    /// Fails if either address cannot be bound.
    pub async fn bind(config: &CollectorConfig) -> Result<Self> {
        let telemetry = Listener::bind(
            "Telemetry collector",
            &config.telemetry.host,
            config.telemetry.port,
        )
        .await?;

        let http = TcpListener::bind((config.http.host.as_str(), config.http.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind HTTP listener to {}:{}",
                    config.http.host, config.http.port
                )
            })?;
        let http_addr = http.local_addr()?;

        Ok(Collector {
            telemetry,
            http,
            http_addr,
            metrics: Arc::new(CollectorMetrics::new()),
        })
    }

    pub fn telemetry_addr(&self) -> SocketAddr {
        self.telemetry.local_addr()
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn metrics(&self) -> Arc<CollectorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve telemetry and HTTP until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let Collector {
            telemetry,
            http: http_listener,
            http_addr,
            metrics,
        } = self;

        let ingest = Arc::new(TelemetryIngest::new(Arc::clone(&metrics)));
        let app = http::router(metrics);

        info!("HTTP server listening on {}", http_addr);
        let http_shutdown = shutdown.clone();
        let http_server = async move {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(http_shutdown.cancelled_owned())
                .await
                .context("HTTP server failed")
        };

        tokio::try_join!(telemetry.serve(ingest, shutdown), http_server)?;
        debug!("Collector stopped");
        Ok(())
    }
}
