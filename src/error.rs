//! Error handling for the mirage display controller.

use std::time::Duration;

/// A specialized `Result` type for mirage operations.
pub type Result<T> = std::result::Result<T, MirageError>;

/// The main error type for display and system operations.
#[derive(Debug, thiserror::Error)]
pub enum MirageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The display lock could not be acquired before the deadline
    #[error("timed out after {0:?} waiting for the display lock")]
    LockTimeout(Duration),

    /// The uploaded file's extension is not in the supported set
    #[error("unsupported image format {extension:?} (supported: {supported})")]
    UnsupportedFormat {
        extension: String,
        supported: String,
    },

    /// The file exists but is not a decodable image
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Device communication failed during transmit or redraw
    #[error("display hardware error: {0}")]
    Hardware(String),

    /// A non-display collector failed; degraded at the controller boundary
    #[error("collector failed: {0}")]
    Collector(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("web server error: {0}")]
    WebServer(String),
}

impl MirageError {
    /// Create a new image decode error
    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Create a new collector error
    pub fn collector(msg: impl Into<String>) -> Self {
        Self::Collector(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// True when the failure was caused by the caller's input rather than
    /// the device. The HTTP boundary uses this to pick 4xx over 5xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. } | Self::ImageDecode(_))
    }
}
