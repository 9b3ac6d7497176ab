//! Error types for the stampede codec crate
//!
//! This module provides error handling for element encoding, decoding, and
//! framed transport reads. Every decode failure is fatal to the link that
//! produced it: once a malformed element has been consumed, the byte stream
//! cannot be resynchronized.

use thiserror::Error;

/// Codec operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An element carried a type tag the decoder does not know
    #[error("Unknown element type tag: 0x{tag:02x}")]
    UnknownTag { tag: u8 },

    /// The stream ended before the element was complete
    #[error("Truncated element: expected {needed} more bytes while reading {context}")]
    Truncated { needed: usize, context: String },

    /// A declared element length exceeded the per-connection maximum
    #[error("Element too large: declared {size} bytes, maximum {max}")]
    ElementTooLarge { size: usize, max: usize },

    /// A length octet sequence was malformed
    #[error("Invalid length encoding: {reason}")]
    InvalidLength { reason: String },

    /// An integer payload could not be represented
    #[error("Invalid integer payload: {reason}, {length} bytes")]
    InvalidInteger { reason: String, length: usize },

    /// A boolean payload was not exactly one byte
    #[error("Invalid boolean payload: {length} bytes")]
    InvalidBoolean { length: usize },

    /// An element body contained trailing bytes after its last child
    #[error("Malformed sequence: {reason}")]
    MalformedSequence { reason: String },

    /// The peer closed the stream cleanly between elements
    #[error("End of stream while reading {context}")]
    EndOfStream { context: String },

    /// An underlying I/O operation failed
    #[error("I/O error during {operation}: {reason}")]
    Io { operation: String, reason: String },

    /// A bounded read did not complete before its deadline
    #[error("Read timed out after {timeout_ms}ms while reading {context}")]
    Timeout { context: String, timeout_ms: u64 },
}

impl CodecError {
    /// Create a new truncation error
    pub fn truncated<S: Into<String>>(needed: usize, context: S) -> Self {
        Self::Truncated {
            needed,
            context: context.into(),
        }
    }

    /// Create a new invalid-length error
    pub fn invalid_length<S: Into<String>>(reason: S) -> Self {
        Self::InvalidLength {
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

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(context: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            context: context.into(),
            timeout_ms,
        }
    }

    /// True when the error means the peer went away rather than spoke
    /// garbage. Timeouts are the only recoverable codec condition; every
    /// other variant forces the link down.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CodecError::Timeout { .. })
    }

    /// True when the peer closed the stream cleanly between elements.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CodecError::EndOfStream { .. })
    }
}

impl From<std::io::Error> for CodecError {
    fn from(error: std::io::Error) -> Self {
        CodecError::io("read", &error.to_string())
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
