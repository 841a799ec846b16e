// File: src/error.rs
//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// A token field that breaks the length or non-empty rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token '{pattern}' has an empty {field}")]
    Empty { field: &'static str, pattern: String },

    #[error("token '{pattern}' has a {field} '{value}' longer than {max} bytes")]
    TooLong {
        field: &'static str,
        pattern: String,
        value: String,
        max: usize,
    },

    #[error("symbol is empty")]
    EmptySymbol,

    #[error("symbol '{value}' is longer than {max} bytes")]
    SymbolTooLong { value: String, max: usize },

    #[error("token '{pattern}' has {count} values, at most 3 are allowed")]
    TooManyValues { pattern: String, count: usize },

    #[error("unknown token type code {0}")]
    UnknownTokenType(i32),

    #[error("unknown match type code {0}")]
    UnknownMatchType(i32),
}

/// Errors coming back from the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine returned a non-zero status.
    #[error("{operation} failed ({code}): {message}")]
    Rejected {
        operation: &'static str,
        code: i32,
        message: String,
    },

    /// An operation was attempted before `init` or after `close`.
    #[error("engine is not initialized; call init first")]
    NotInitialized,

    /// The scheme file or the engine library could not be loaded.
    #[error("cannot initialize engine with '{}': {message}", .path.display())]
    FatalIo { path: PathBuf, message: String },

    /// The engine handed back a token that does not satisfy the token rules.
    #[error("engine returned a malformed token: {0}")]
    MalformedToken(#[from] ValidationError),
}

impl EngineError {
    pub fn rejected(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Only initialization failures abort a compilation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::FatalIo { .. } | EngineError::NotInitialized)
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors while loading a compiler configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
