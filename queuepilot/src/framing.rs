//! Newline-delimited framing over byte streams
//!
//! Available with the `tokio` feature. The control server, the telemetry
//! publisher, the collector and the control client all read and write frames
//! through this module.

use crate::protocol::MAX_FRAME_LEN;
use bytes::{BufMut, BytesMut};
use std::error::Error;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors raised while sending or receiving a line
#[derive(Debug)]
pub enum LineError {
    Io(io::Error),
    /// The peer closed the stream before a terminator arrived
    Closed,
    /// No terminator within the given number of bytes
    TooLong(usize),
    InvalidUtf8,
    /// An outgoing payload contained `\n`
    EmbeddedTerminator,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Io(e) => write!(f, "I/O error: {e}"),
            LineError::Closed => write!(f, "connection closed by peer"),
            LineError::TooLong(n) => write!(f, "no line terminator within {n} bytes"),
            LineError::InvalidUtf8 => write!(f, "frame is not valid UTF-8"),
            LineError::EmbeddedTerminator => write!(f, "payload contains a line terminator"),
        }
    }
}

impl Error for LineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LineError {
    fn from(e: io::Error) -> Self {
        LineError::Io(e)
    }
}

/// Write `payload` followed by `\n` and flush
pub async fn send_line<W>(writer: &mut W, payload: &str) -> Result<(), LineError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if payload.contains('\n') {
        return Err(LineError::EmbeddedTerminator);
    }
    if payload.len() >= MAX_FRAME_LEN {
        return Err(LineError::TooLong(MAX_FRAME_LEN));
    }

    let mut frame = BytesMut::with_capacity(payload.len() + 1);
    frame.put_slice(payload.as_bytes());
    frame.put_u8(b'\n');

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads `\n`-terminated lines from a stream
///
/// Bytes received after a terminator stay buffered for the next call, so a
/// peer may pipeline several frames in one segment or split one frame over
/// many.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    buffer: BytesMut,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_len(reader, MAX_FRAME_LEN)
    }

    /// `max_len` bounds a frame including its terminator
    pub fn with_max_len(reader: R, max_len: usize) -> Self {
        LineReader {
            reader,
            buffer: BytesMut::with_capacity(max_len),
            max_len,
        }
    }

    /// Read the next line without its terminator
    ///
    /// A trailing `\r` is stripped. On [`LineError::TooLong`] the oversized
    /// bytes are dropped and the reader can be used again; the rest of that
    /// line then arrives as its own frame.
    ///
    /// This method is cancel safe.
    pub async fn read_line(&mut self) -> Result<String, LineError> {
        loop {
            if let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                return String::from_utf8(line.to_vec()).map_err(|_| LineError::InvalidUtf8);
            }

            if self.buffer.len() >= self.max_len {
                self.buffer.clear();
                return Err(LineError::TooLong(self.max_len));
            }

            let remaining = self.max_len - self.buffer.len();
            self.buffer.reserve(remaining);
            let read = self
                .reader
                .read_buf(&mut (&mut self.buffer).limit(remaining))
                .await?;
            if read == 0 {
                return Err(LineError::Closed);
            }
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reads_across_partial_reads() {
        let mock = Builder::new()
            .read(b"5:_")
            .read(b":10")
            .read(b"0\n")
            .build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap(), "5:_:100");
    }

    #[tokio::test]
    async fn test_keeps_bytes_after_terminator() {
        let mock = Builder::new().read(b"1:_:_\n_:2:_\n_:_:3").read(b"\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap(), "1:_:_");
        assert_eq!(reader.read_line().await.unwrap(), "_:2:_");
        assert_eq!(reader.read_line().await.unwrap(), "_:_:3");
        assert!(matches!(reader.read_line().await, Err(LineError::Closed)));
    }

    #[tokio::test]
    async fn test_strips_carriage_return() {
        let mock = Builder::new().read(b"_:_:_\r\n\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(reader.read_line().await.unwrap(), "_:_:_");
        assert_eq!(reader.read_line().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_closed_mid_frame() {
        let mock = Builder::new().read(b"partial").build();
        let mut reader = LineReader::new(mock);

        assert!(matches!(reader.read_line().await, Err(LineError::Closed)));
    }

    #[tokio::test]
    async fn test_too_long_then_recovers() {
        let mock = Builder::new().read(b"abcdefgh").read(b"ij\nok\n").build();
        let mut reader = LineReader::with_max_len(mock, 8);

        assert!(matches!(reader.read_line().await, Err(LineError::TooLong(8))));
        assert_eq!(reader.read_line().await.unwrap(), "ij");
        assert_eq!(reader.read_line().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_max_frame_fits_exactly() {
        let payload = "x".repeat(MAX_FRAME_LEN - 1);
        let mut data = payload.clone().into_bytes();
        data.push(b'\n');

        let mock = Builder::new().read(&data).build();
        let mut reader = LineReader::new(mock);
        assert_eq!(reader.read_line().await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let mock = Builder::new().read(&[0xff, 0xfe, b'\n']).read(b"ok\n").build();
        let mut reader = LineReader::new(mock);

        assert!(matches!(reader.read_line().await, Err(LineError::InvalidUtf8)));
        assert_eq!(reader.read_line().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_send_line_appends_terminator() {
        let mut mock = Builder::new().write(b"Metrics Updated\n").build();
        send_line(&mut mock, "Metrics Updated").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_line_rejects_bad_payloads() {
        let mut sink = Vec::new();
        assert!(matches!(
            send_line(&mut sink, "a\nb").await,
            Err(LineError::EmbeddedTerminator)
        ));
        assert!(matches!(
            send_line(&mut sink, &"x".repeat(MAX_FRAME_LEN)).await,
            Err(LineError::TooLong(_))
        ));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(server);

        send_line(&mut client, "10:20:15:5:5").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), "10:20:15:5:5");
    }
}
