//! Error types for live stream playback.
//!
//! All errors implement the `std::error::Error` trait and carry enough context
//! to decide whether the session can recover on its own.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: the duplex connection failed to open or dropped
//! - **Codec Errors**: the output surface cannot play the announced codec set
//! - **Decode Errors**: a codec or metadata frame carried an unreadable payload
//! - **Append Errors**: the sink refused a media chunk
//! - **Config Errors**: invalid or unreadable player configuration
//!
//! ## Recovery and Retry
//!
//! Only a handful of errors are worth retrying. The supervisor retries transport
//! loss on its own; everything else is logged and the stream keeps going.
//!
//! ```rust
//! use wsmp4f::PlayerError;
//!
//! let error = PlayerError::transport_failed("connection reset by peer");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for playback operations.
pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

/// Main error type for playback operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported codec set \"{codecs}\": {reason}")]
    UnsupportedCodec { codecs: String, reason: String },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Append rejected by sink: {reason}")]
    Append { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output surface unavailable: {reason}")]
    SurfaceUnavailable { reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl PlayerError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlayerError::Transport { .. } => true,
            PlayerError::Timeout { .. } => true,
            // A later codec announcement (usually after a reconnect) may succeed.
            PlayerError::UnsupportedCodec { .. } => true,
            PlayerError::Decode { .. } => false,
            PlayerError::Append { .. } => false,
            PlayerError::Config { .. } => false,
            PlayerError::File { .. } => false,
            PlayerError::SurfaceUnavailable { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PlayerError::Transport { .. } => vec![
                "Check that the stream endpoint is reachable",
                "Verify the stream URL",
                "Wait for the automatic reconnect",
            ],
            PlayerError::UnsupportedCodec { .. } => vec![
                "Check which codecs the output surface can decode",
                "Ask the stream source for a different encoding preset",
            ],
            PlayerError::Decode { .. } => vec![
                "Verify the stream server speaks the tagged frame protocol",
                "Check the server encodes codec and metadata payloads as UTF-8",
            ],
            PlayerError::Append { .. } => vec![
                "Check the sink accepts fragmented MP4 segments",
                "Inspect the stream for corrupt segments",
            ],
            PlayerError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Use positive durations and capacities",
            ],
            PlayerError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            PlayerError::SurfaceUnavailable { .. } => vec![
                "Bind a new output surface to the player",
                "Check the previous session shut down cleanly",
            ],
            PlayerError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Check the transport is responsive",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        PlayerError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        PlayerError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for unsupported codec errors.
    pub fn unsupported_codec(codecs: impl Into<String>, reason: impl Into<String>) -> Self {
        PlayerError::UnsupportedCodec { codecs: codecs.into(), reason: reason.into() }
    }

    /// Helper constructor for frame decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        PlayerError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for sink rejections.
    pub fn append_rejected(reason: impl Into<String>) -> Self {
        PlayerError::Append { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        PlayerError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        PlayerError::File { path, source }
    }

    /// Helper constructor for a missing output surface.
    pub fn surface_unavailable(reason: impl Into<String>) -> Self {
        PlayerError::SurfaceUnavailable { reason: reason.into() }
    }
}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        PlayerError::Decode { context: "metadata json".to_string(), details: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for PlayerError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        PlayerError::Config { reason: err.to_string() }
    }
}
