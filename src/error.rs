//! Error types for lossprobe
//!
//! Per-file failures never surface through these types to the batch: the
//! [`Analyzer`](crate::Analyzer) folds them into the result record. They are
//! returned directly only by setup steps (config loading, path scanning) and
//! by the collaborator traits.

use thiserror::Error;

/// Result type for lossprobe operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// File unreadable, corrupt, or encoded with an unsupported codec
    #[error("Decode error: {0}")]
    Decode(String),

    /// Container extension outside the supported set
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scan root missing or not usable
    #[error("Path error: {0}")]
    Path(String),
}
