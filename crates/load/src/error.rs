//! Error types for the stampede load crate
//!
//! Everything here is a configuration-time failure: a malformed variance
//! argument, an unknown algorithm, or a bad program file. All of them are
//! fatal to job startup.

use thiserror::Error;

/// Load-shaping configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A variance argument token could not be understood
    #[error("Invalid variance argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// A variance program named an algorithm that does not exist
    #[error("Unknown variance algorithm: {name}")]
    UnknownAlgorithm { name: String },

    /// An algorithm was given the wrong number of arguments
    #[error("Algorithm {name} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A variance program line could not be parsed
    #[error("Variance program line {line}: {reason}")]
    ProgramLine { line: usize, reason: String },

    /// A variance program file could not be read
    #[error("Failed to read variance program {path}: {reason}")]
    Io { path: String, reason: String },
}

impl LoadError {
    /// Create a new invalid-argument error
    pub fn invalid_argument<S: Into<String>>(argument: S, reason: S) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Create a new program-line error
    pub fn program_line<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::ProgramLine {
            line,
            reason: reason.into(),
        }
    }

    /// Attach a 1-based program line to a configuration error
    pub fn at_line(self, line: usize) -> Self {
        match self {
            LoadError::ProgramLine { .. } => self,
            other => LoadError::ProgramLine {
                line,
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for load-shaping operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;
