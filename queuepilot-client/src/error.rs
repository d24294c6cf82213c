use queuepilot::RateError;
use queuepilot::framing::LineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame longer than {0} bytes")]
    FrameTooLong(usize),

    #[error("Unexpected banner from server: {0:?}")]
    UnexpectedBanner(String),

    #[error("Unexpected reply from server: {0:?}")]
    UnexpectedReply(String),

    #[error("Invalid rate: {0}")]
    InvalidRate(#[from] RateError),

    #[error("Invalid frame: {0}")]
    InvalidFrame(LineError),

    #[error("Timeout")]
    Timeout,

    #[error("Connection is out of step after a failed request")]
    ConnectionBroken,
}

impl From<LineError> for ClientError {
    fn from(e: LineError) -> Self {
        match e {
            LineError::Io(e) => ClientError::Io(e),
            LineError::Closed => ClientError::ConnectionClosed,
            LineError::TooLong(n) => ClientError::FrameTooLong(n),
            other => ClientError::InvalidFrame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
