//! Error types for the stampede link crate
//!
//! Link errors fall into three families: codec failures, which are always
//! fatal to the connection; I/O failures, which the manager tolerates once
//! before forcing a disconnect; and handshake rejections, which terminate
//! the manager entirely when the controller's response code is in the
//! non-recoverable set.

use crate::messages::ResponseCode;
use stampede_codec::CodecError;
use thiserror::Error;

/// Control-link operation errors
#[derive(Error, Debug)]
pub enum LinkError {
    /// Framing failed; the connection cannot be resynchronized
    #[error("Codec error on control link: {0}")]
    Codec(#[from] CodecError),

    /// A well-framed message violated the control protocol
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// A connection could not be established
    #[error("Connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    /// A transient read or write failure
    #[error("I/O error during {operation}: {reason}")]
    Io { operation: String, reason: String },

    /// TLS setup or negotiation failed
    #[error("TLS error: {reason}")]
    Tls { reason: String },

    /// The controller rejected the handshake with a terminal code
    #[error("Handshake rejected with {code:?}: {message}")]
    HandshakeRejected {
        code: ResponseCode,
        message: String,
    },

    /// A client process could not be started
    #[error("Failed to spawn client with '{command}': {reason}")]
    Spawn { command: String, reason: String },
}

impl LinkError {
    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(reason: S) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a new connection error
    pub fn connect<S: Into<String>>(address: S, reason: S) -> Self {
        Self::Connect {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(operation: S, reason: S) -> Self {
        Self::Io {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a new TLS error
    pub fn tls<S: Into<String>>(reason: S) -> Self {
        Self::Tls {
            reason: reason.into(),
        }
    }

    /// True when this error must terminate the manager rather than
    /// trigger a reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkError::HandshakeRejected { .. })
    }
}

/// Result type for control-link operations
pub type LinkResult<T> = std::result::Result<T, LinkError>;
