//! Network plumbing shared by the control server and the collector
//!
//! A [`Listener`] owns the accept loop and hands each connection to a
//! [`ConnectionHandler`] on its own task. Both sides speak the line protocol
//! from [`framing`].
//!
//! - [`control`]: control server applying commands to the pipeline
//! - [`framing`]: newline-delimited send and receive

pub mod control;
pub use queuepilot::framing;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-connection behaviour of a [`Listener`]
///
/// Implementations run until the peer disconnects, the protocol is
/// violated, or `shutdown` fires. An error ends only this connection.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// TCP accept loop dispatching to a [`ConnectionHandler`]
pub struct Listener {
    name: &'static str,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `host:port`
    ///
    /// `name` only appears in log lines.
    pub async fn bind(name: &'static str, host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {name} listener to {host}:{port}"))?;
        let local_addr = listener.local_addr()?;

        info!("{} listening on {}", name, local_addr);
        Ok(Listener {
            name,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` fires, then wait for every
    /// connection task to finish
    pub async fn serve(
        self,
        handler: Arc<dyn ConnectionHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let name = self.name;
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!("{} connection task panicked: {}", name, e);
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("New {} connection from {}", name, peer);
                        let handler = Arc::clone(&handler);
                        let shutdown = shutdown.clone();
                        connections.spawn(async move {
                            if let Err(e) = handler.handle(stream, peer, shutdown).await {
                                error!("Error handling {} connection from {}: {:#}", name, peer, e);
                            }
                            debug!("{} connection from {} closed", name, peer);
                        });
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning
                        error!("Failed to accept {} connection: {}", name, e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        info!("{} listener on {} stopping", name, self.local_addr);
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}
