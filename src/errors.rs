use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::FileId;

/// Error type for configuration, IO, oracle, and export failures.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON encode or decode failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The syntax oracle could not run for a file.
    #[error("syntax validator unavailable for '{file_id}': {reason}")]
    ValidatorUnavailable {
        /// File being checked.
        file_id: FileId,
        /// Spawn or I/O failure text.
        reason: String,
    },
    /// The syntax oracle exceeded its per-file timeout.
    #[error("syntax validator timed out on '{file_id}' after {timeout:?}")]
    ValidatorTimeout {
        /// File being checked.
        file_id: FileId,
        /// Limit that was exceeded.
        timeout: Duration,
    },
    /// A file could not be decoded to text.
    #[error("could not decode '{path}': {reason}")]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Decoder failure text.
        reason: String,
    },
}
