//! Error types for the streambar engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the streambar engine.
///
/// Every variant aborts a run; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// The tape cannot be opened or read.
    #[error("Source error: {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tape record cannot be decoded into a well-formed trade.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Invalid threshold, policy selector or configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The output cannot be created, written or flushed.
    #[error("Sink error: {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An engine invariant was violated: run phases driven out of order, or
    /// an in-memory trade stream whose bar volume exceeds `Volume::MAX`.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error category, for callers that only branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Source,
    Parse,
    Config,
    Sink,
    Internal,
}

impl Error {
    /// Create a source error.
    pub fn tape_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Source {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for the given 1-based line.
    pub fn parse(line: u64, msg: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a sink error.
    pub fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Sink {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Source { .. } => ErrorKind::Source,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Config(_) => ErrorKind::Config,
            Error::Sink { .. } => ErrorKind::Sink,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}
