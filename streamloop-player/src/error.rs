//! Error types for streamloop-player
//!
//! Ingest and cursor-creation failures are returned to the caller and leave no
//! partially committed state behind. End of stream and loop boundaries inside
//! the mixing loop are normal control flow and never surface here.

use thiserror::Error;

/// Failures while ingesting a payload or opening a decoder against it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The decoder rejected the payload outright (corrupt or unsupported)
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Arena probing reached the ceiling without a successful open
    #[error("Decoder arena exhausted: no arena up to {ceiling_bytes} bytes was large enough")]
    ArenaExhausted { ceiling_bytes: usize },

    /// A playback cursor could not open a decoder against a validated payload
    #[error("Decoder initialization failed: {0}")]
    InitFailed(String),
}

/// Main error type for streamloop-player
#[derive(Error, Debug)]
pub enum Error {
    /// Payload ingest or decoder initialization errors
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared streamloop-common crate
    #[error(transparent)]
    Common(#[from] streamloop_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using streamloop-player Error
pub type Result<T> = std::result::Result<T, Error>;
