//! Error types for the stampede script crate
//!
//! Parse errors carry 1-based line and character positions. Configuration
//! errors cover type registration and class resolution. Runtime errors are
//! raised for conditions a running script cannot recover from; recoverable
//! method failures are surfaced through method return values instead.

use thiserror::Error;

/// Script operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Syntactic or semantic problem found while parsing
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// Type registration or class resolution problem
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Unrecoverable failure while executing an instruction
    #[error("Runtime error at line {line}: {message}")]
    Runtime { line: usize, message: String },
}

impl ScriptError {
    /// Create a new parse error at the given 1-based position
    pub fn parse<S: Into<String>>(line: usize, column: usize, message: S) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new runtime error
    pub fn runtime<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Runtime {
            line,
            message: message.into(),
        }
    }

    /// The 1-based line the error refers to, when positional
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Parse { line, .. } | ScriptError::Runtime { line, .. } => Some(*line),
            ScriptError::Config { .. } => None,
        }
    }
}

/// Result type for script operations
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;
