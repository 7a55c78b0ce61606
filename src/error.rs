//! Error types for the Skyhash client
//!
//! Provides a unified error type for codec, connection and dial operations.
//!
//! Errors fall into two groups:
//! - **Fatal**: the stream can no longer be trusted (transport failure,
//!   timeout, lost framing). The owning connection is closed.
//! - **Recoverable**: the offending message was drained from the stream
//!   ([`SkyError::Discarded`]) or nothing was written at all
//!   ([`SkyError::Encode`]). The connection stays usable.

use std::fmt;

use thiserror::Error;

use crate::protocol::WireType;

/// Result type alias using SkyError
pub type Result<T> = std::result::Result<T, SkyError>;

/// Unified error type for Skyhash client operations
#[derive(Debug, Error)]
pub enum SkyError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The stream position is lost and no further message can be read.
    #[error("Framing error: {0}")]
    Framing(String),

    /// A whole message was consumed but could not be used.
    #[error("{0}")]
    Discarded(#[source] Discarded),

    /// The value cannot be expressed on the wire. Nothing was written.
    #[error("Encode error: {0}")]
    Encode(String),

    // -------------------------------------------------------------------------
    // Setup Errors
    // -------------------------------------------------------------------------
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SkyError {
    /// True when the error leaves the stream unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SkyError::Io(_) | SkyError::Tls(_) | SkyError::Framing(_) | SkyError::ConnectionClosed
        )
    }

    /// True when the failed message was fully drained off the stream.
    pub fn is_discarded(&self) -> bool {
        matches!(self, SkyError::Discarded(_))
    }

    /// The error message sent by the peer, if this is one.
    pub fn peer_error(&self) -> Option<&WireError> {
        match self {
            SkyError::Discarded(Discarded::Peer(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<Discarded> for SkyError {
    fn from(discarded: Discarded) -> Self {
        SkyError::Discarded(discarded)
    }
}

impl From<WireError> for SkyError {
    fn from(err: WireError) -> Self {
        SkyError::Discarded(Discarded::Peer(err))
    }
}

/// Cause of a failure whose message was drained from the stream
#[derive(Debug, Error)]
pub enum Discarded {
    /// The peer replied with an error message
    #[error("{0}")]
    Peer(#[source] WireError),

    /// A message of another type arrived
    #[error("expected prefix {:?}, got {:?}", .expected.name(), .observed.name())]
    UnexpectedPrefix {
        expected: WireType,
        observed: WireType,
    },

    /// The message was well framed but its payload was not valid for its type
    #[error("invalid {} payload: {reason}", .wire_type.name())]
    InvalidPayload { wire_type: WireType, reason: String },
}

/// An error message carried on the wire (prefix `1`)
///
/// This is the peer's own report, separate from network or parsing errors.
/// An empty message is equivalent to an error with no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireError {
    message: String,
}

impl WireError {
    /// Create a wire error with the given text
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The text sent by the peer
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WireError {}
