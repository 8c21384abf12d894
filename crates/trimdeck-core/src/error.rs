//! Error types for TrimDeck.

use thiserror::Error;

/// Main error type for TrimDeck operations.
///
/// Two of these are contract-level failures that callers must handle
/// (`Probe`, `InvalidSpeed`); the rest describe recoverable runtime
/// conditions. Invalid cut-timestamp edits are deliberately NOT an error
/// variant: they are held as pending text in the edit buffer and never
/// surface as `Err`.
#[derive(Error, Debug)]
pub enum TrimdeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be probed. Fatal to opening that clip.
    #[error("cannot open {path}: {reason}")]
    Probe { path: String, reason: String },

    /// A fallback decode request (full frame or stream) failed.
    /// Recoverable: playback stops, a report is shown, editing continues.
    #[error("fallback playback error: {0}")]
    Fallback(String),

    /// Playback speed outside the supported range. Indicates a caller bug;
    /// the call fails and state is left untouched.
    #[error("playback speed {0} outside supported range 0.5..=100")]
    InvalidSpeed(f64),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for TrimDeck operations.
pub type Result<T> = std::result::Result<T, TrimdeckError>;
