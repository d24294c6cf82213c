use std::future::Future;
use std::time::Duration;

use queuepilot::framing::{LineReader, send_line};
use queuepilot::protocol::{ACKNOWLEDGEMENT, BANNER};
use queuepilot::{ControlCommand, Rate};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

use crate::error::{ClientError, Result};

/// Builder for creating a ControlClient
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time allowed for connecting and receiving the banner
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the time allowed for one command and its acknowledgement
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Connect to `addr` and consume the banner
    pub async fn connect(self, addr: impl ToSocketAddrs) -> Result<ControlClient> {
        let connect_timeout = self.connect_timeout;
        with_timeout(connect_timeout, async move {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;

            let (read_half, writer) = stream.into_split();
            let mut client = ControlClient {
                reader: LineReader::new(read_half),
                writer,
                request_timeout: self.request_timeout,
                broken: false,
            };

            let banner = client.reader.read_line().await?;
            if banner != BANNER {
                return Err(ClientError::UnexpectedBanner(banner));
            }
            tracing::debug!("Connected to control server");

            Ok(client)
        })
        .await
    }
}

/// Client for the pipeline control channel
///
/// One client owns one connection. Commands are sent one at a time and each
/// waits for its acknowledgement. A request that fails after its frame may
/// have been written (timeout, I/O error, unexpected reply) leaves the
/// connection out of step with the server, so every later call fails with
/// [`ClientError::ConnectionBroken`]; connect again to continue.
///
/// ```no_run
/// # async fn run() -> queuepilot_client::Result<()> {
/// use queuepilot_client::ControlClient;
///
/// let mut client = ControlClient::connect("127.0.0.1:7368").await?;
/// client.set_consumer_rate(5.0).await?;
/// client.set_queue_threshold(100).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ControlClient {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    request_timeout: Duration,
    broken: bool,
}

impl ControlClient {
    /// Connect with default timeouts
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        ClientBuilder::new().connect(addr).await
    }

    /// Create a new client builder for advanced configuration
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Whether an earlier request failed and the connection must be dropped
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Send a command and wait for its acknowledgement
    ///
    /// The server acknowledges every well-formed frame, including one whose
    /// fields it rejected, so a successful return means the frame was
    /// processed, not that every value was applied.
    pub async fn send(&mut self, command: &ControlCommand) -> Result<()> {
        if self.broken {
            return Err(ClientError::ConnectionBroken);
        }

        let request_timeout = self.request_timeout;
        let frame = command.encode();

        // Cleared only once the acknowledgement for this frame has been read
        self.broken = true;
        with_timeout(request_timeout, async {
            send_line(&mut self.writer, &frame).await?;

            let reply = self.reader.read_line().await?;
            if reply != ACKNOWLEDGEMENT {
                return Err(ClientError::UnexpectedReply(reply));
            }
            Ok(())
        })
        .await?;
        self.broken = false;

        Ok(())
    }

    pub async fn set_consumer_rate(&mut self, permits_per_second: f64) -> Result<()> {
        let command =
            ControlCommand::keep_all().with_consumer_rate(Rate::per_second(permits_per_second)?);
        self.send(&command).await
    }

    pub async fn set_controller_rate(&mut self, permits_per_second: f64) -> Result<()> {
        let command =
            ControlCommand::keep_all().with_controller_rate(Rate::per_second(permits_per_second)?);
        self.send(&command).await
    }

    pub async fn set_queue_threshold(&mut self, threshold: usize) -> Result<()> {
        let command = ControlCommand::keep_all().with_queue_threshold(threshold);
        self.send(&command).await
    }
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout),
    }
}
