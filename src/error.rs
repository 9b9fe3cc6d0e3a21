//! Error types for the MSSP link.
//!
//! Two layers, matching how failures are recovered:
//!
//! - [`FramingError`], a single inbound frame that was malformed or never
//!   completed. Recovered locally: the session reports it and keeps reading.
//! - [`LinkError`], everything the link surface can fail with, including
//!   framing, a transport that could not be opened, and mid-session I/O
//!   failures.
//!
//! All errors implement `std::error::Error` and are `Send + Sync + 'static`
//! so they can cross the worker-task boundary.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// A malformed or incomplete MSSP frame.
///
/// Framing errors never terminate the communication loop; the offending
/// bytes are discarded and the loop continues with the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FramingError {
    #[error("frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("declared length {declared} does not match the {actual} byte region")]
    LengthMismatch { declared: u8, actual: usize },

    #[error("bad frame terminator: expected {expected:#04x}, found {found:#04x}")]
    BadTerminator { expected: u8, found: u8 },

    #[error("checksum mismatch at offset {offset}: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch { offset: usize, expected: u8, found: u8 },

    #[error("no complete frame within {deadline:?}")]
    Timeout { deadline: Duration },
}

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("transport unavailable: {reason}")]
    TransportUnavailable {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("transport {operation} failed: {reason}")]
    TransportIo {
        operation: &'static str,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("session terminated after {failures} consecutive transport failures")]
    SessionTerminated { failures: u32 },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Framing(_) => true,
            LinkError::TransportIo { .. } => true,
            LinkError::TransportUnavailable { .. } => false,
            LinkError::SessionTerminated { .. } => false,
        }
    }

    /// Helper constructor for open failures.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        LinkError::TransportUnavailable { reason: reason.into(), source: None }
    }

    /// Helper constructor for open failures with an underlying cause.
    pub fn unavailable_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::TransportUnavailable { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for read failures.
    pub fn read_failed(reason: impl Into<String>) -> Self {
        LinkError::TransportIo { operation: "read", reason: reason.into(), source: None }
    }

    /// Helper constructor for write failures.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        LinkError::TransportIo { operation: "write", reason: reason.into(), source: None }
    }

    /// Helper constructor for close failures.
    pub fn close_failed(reason: impl Into<String>) -> Self {
        LinkError::TransportIo { operation: "close", reason: reason.into(), source: None }
    }

    /// Whether this is a read-deadline expiry rather than a real failure.
    ///
    /// The communication loop treats an expired read deadline as "no frame
    /// available this tick", not as an error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Framing(FramingError::Timeout { .. }))
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::TransportIo {
            operation: "io",
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
