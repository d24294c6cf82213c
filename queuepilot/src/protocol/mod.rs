//! Line-oriented wire protocol
//!
//! Every message is one ASCII line terminated by `\n`. The terminator is the
//! message delimiter and never part of the payload, so the functions here
//! work on payloads without it.
//!
//! # Telemetry frame (pipeline → collector)
//!
//! ```text
//! <producer_rate>:<produced_total>:<consumed_total>:<occupancy>:<queue_threshold>
//! ```
//!
//! All fields are integers; the producer rate is rounded to the nearest one.
//!
//! # Control session (client ↔ pipeline)
//!
//! ```text
//! server: Message Format = new_cons_rate:new_orch_rate:new_queue_size_threshold (Use '_' to keep the current values)
//! client: 5:_:100
//! server: Metrics Updated
//! ```
//!
//! Each control token is either the wildcard `_` (keep the current value) or
//! a number. A token that is neither is rejected on its own; the remaining
//! fields of the same command still apply.

use crate::core::{QueueCounts, Rate};
use std::error::Error;
use std::fmt;

#[cfg(test)]
mod tests;

/// Banner sent once when a control connection opens
pub const BANNER: &str = "Message Format = new_cons_rate:new_orch_rate:new_queue_size_threshold (Use '_' to keep the current values)";

/// Reply sent after every control command
pub const ACKNOWLEDGEMENT: &str = "Metrics Updated";

/// Token meaning "keep the current value"
pub const WILDCARD: &str = "_";

/// Separator between fields of a frame
pub const SEPARATOR: char = ':';

/// Maximum frame length in bytes, terminator included
pub const MAX_FRAME_LEN: usize = 256;

const TELEMETRY_FIELDS: usize = 5;

/// Pipeline state published on every controller tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Producer rate in permits per second
    pub producer_rate: f64,
    pub produced_total: u64,
    pub consumed_total: u64,
    pub occupancy: usize,
    pub queue_threshold: usize,
}

impl MetricsSnapshot {
    pub fn new(producer_rate: Rate, counts: QueueCounts, queue_threshold: usize) -> Self {
        MetricsSnapshot {
            producer_rate: producer_rate.permits_per_second(),
            produced_total: counts.produced_total,
            consumed_total: counts.consumed_total,
            occupancy: counts.occupancy,
            queue_threshold,
        }
    }

    /// Encode as a telemetry payload (no terminator)
    pub fn encode(&self) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.producer_rate.round() as u64,
            self.produced_total,
            self.consumed_total,
            self.occupancy,
            self.queue_threshold
        )
    }

    /// Parse a telemetry payload
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the field count is wrong or a field is not
    /// a non-negative integer.
    pub fn parse(payload: &str) -> Result<Self, FrameError> {
        let fields: Vec<&str> = payload.trim_end().split(SEPARATOR).collect();
        if fields.len() != TELEMETRY_FIELDS {
            return Err(FrameError::FieldCount {
                expected: TELEMETRY_FIELDS,
                found: fields.len(),
            });
        }

        Ok(MetricsSnapshot {
            producer_rate: parse_integer::<u64>("producer_rate", fields[0])? as f64,
            produced_total: parse_integer("produced_total", fields[1])?,
            consumed_total: parse_integer("consumed_total", fields[2])?,
            occupancy: parse_integer("occupancy", fields[3])?,
            queue_threshold: parse_integer("queue_threshold", fields[4])?,
        })
    }
}

fn parse_integer<T: std::str::FromStr>(field: &'static str, token: &str) -> Result<T, FrameError> {
    token
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidNumber {
            field,
            token: token.to_string(),
        })
}

/// Errors raised while decoding a telemetry frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame did not have the expected number of fields
    FieldCount { expected: usize, found: usize },
    /// A field was not a valid number
    InvalidNumber { field: &'static str, token: String },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::FieldCount { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
            FrameError::InvalidNumber { field, token } => {
                write!(f, "invalid {field}: {token:?}")
            }
        }
    }
}

impl Error for FrameError {}

/// Setting addressed by one token of a control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ConsumerRate,
    ControllerRate,
    QueueThreshold,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::ConsumerRate => "consumer rate",
            Field::ControllerRate => "controller rate",
            Field::QueueThreshold => "queue threshold",
        };
        f.write_str(name)
    }
}

/// A control token that was neither the wildcard nor a valid value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub token: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Field::QueueThreshold => write!(
                f,
                "invalid {}: {:?} is not a non-negative integer",
                self.field, self.token
            ),
            _ => write!(
                f,
                "invalid {}: {:?} is not a positive number",
                self.field, self.token
            ),
        }
    }
}

impl Error for FieldError {}

/// Settings requested by one control frame
///
/// `None` means "leave unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlCommand {
    pub consumer_rate: Option<Rate>,
    pub controller_rate: Option<Rate>,
    pub queue_threshold: Option<usize>,
}

/// Result of decoding a control frame
///
/// Decoding never fails as a whole. Invalid tokens are reported in `errors`
/// and leave their field unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedCommand {
    pub command: ControlCommand,
    pub errors: Vec<FieldError>,
    /// Tokens found after the third one
    pub ignored_tokens: usize,
}

impl ControlCommand {
    /// Command that changes nothing
    pub fn keep_all() -> Self {
        Self::default()
    }

    pub fn with_consumer_rate(mut self, rate: Rate) -> Self {
        self.consumer_rate = Some(rate);
        self
    }

    pub fn with_controller_rate(mut self, rate: Rate) -> Self {
        self.controller_rate = Some(rate);
        self
    }

    pub fn with_queue_threshold(mut self, threshold: usize) -> Self {
        self.queue_threshold = Some(threshold);
        self
    }

    /// Whether the command would leave every setting unchanged
    pub fn is_empty(&self) -> bool {
        self.consumer_rate.is_none()
            && self.controller_rate.is_none()
            && self.queue_threshold.is_none()
    }

    /// Encode as a control payload (no terminator)
    ///
    /// ```
    /// use queuepilot::{ControlCommand, Rate};
    ///
    /// let command = ControlCommand::keep_all()
    ///     .with_consumer_rate(Rate::per_second(5.0).unwrap())
    ///     .with_queue_threshold(100);
    /// assert_eq!(command.encode(), "5:_:100");
    /// ```
    pub fn encode(&self) -> String {
        let rate = |r: Option<Rate>| match r {
            Some(r) => r.permits_per_second().to_string(),
            None => WILDCARD.to_string(),
        };
        let threshold = match self.queue_threshold {
            Some(t) => t.to_string(),
            None => WILDCARD.to_string(),
        };

        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            rate(self.consumer_rate),
            rate(self.controller_rate),
            threshold
        )
    }

    /// Decode a control payload
    ///
    /// Missing trailing tokens are treated as wildcards.
    ///
    /// ```
    /// use queuepilot::ControlCommand;
    ///
    /// let parsed = ControlCommand::parse("5:_:abc");
    /// assert_eq!(parsed.command.consumer_rate.unwrap().permits_per_second(), 5.0);
    /// assert!(parsed.command.queue_threshold.is_none());
    /// assert_eq!(parsed.errors.len(), 1);
    /// ```
    pub fn parse(payload: &str) -> ParsedCommand {
        let mut parsed = ParsedCommand::default();
        let payload = payload.trim();
        if payload.is_empty() {
            return parsed;
        }

        for (index, token) in payload.split(SEPARATOR).enumerate() {
            let token = token.trim();
            match index {
                0 => match parse_rate(Field::ConsumerRate, token) {
                    Ok(rate) => parsed.command.consumer_rate = rate,
                    Err(e) => parsed.errors.push(e),
                },
                1 => match parse_rate(Field::ControllerRate, token) {
                    Ok(rate) => parsed.command.controller_rate = rate,
                    Err(e) => parsed.errors.push(e),
                },
                2 => match parse_threshold(token) {
                    Ok(threshold) => parsed.command.queue_threshold = threshold,
                    Err(e) => parsed.errors.push(e),
                },
                _ => parsed.ignored_tokens += 1,
            }
        }

        parsed
    }
}

fn parse_rate(field: Field, token: &str) -> Result<Option<Rate>, FieldError> {
    if token == WILDCARD {
        return Ok(None);
    }

    token
        .parse::<f64>()
        .ok()
        .and_then(|permits| Rate::per_second(permits).ok())
        .map(Some)
        .ok_or_else(|| FieldError {
            field,
            token: token.to_string(),
        })
}

fn parse_threshold(token: &str) -> Result<Option<usize>, FieldError> {
    if token == WILDCARD {
        return Ok(None);
    }

    token.parse::<usize>().map(Some).map_err(|_| FieldError {
        field: Field::QueueThreshold,
        token: token.to_string(),
    })
}
