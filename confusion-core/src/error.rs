//! Error types for confusion

use thiserror::Error;

/// Result type alias using confusion's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the input, configuration and report layers.
///
/// Alignment and aggregation themselves cannot fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed record on line {line}: expected at least {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },
}
