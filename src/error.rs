//! Error types for the status service.

use thiserror::Error;

/// Errors from fetching and decoding receiver documents.
#[derive(Debug, Error)]
pub enum SourceError {
    /// URL is missing a scheme or host.
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    /// Every attempt failed with a transient error, or the server rejected
    /// the request outright.
    #[error("GET {url} failed after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The response body was not the expected document.
    #[error("failed to parse response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl SourceError {
    /// Short text for the display, without the URL.
    pub fn summary(&self) -> &'static str {
        match self {
            SourceError::InvalidUrl(_) => "Invalid URL",
            SourceError::Fetch { .. } => "Failed API Call",
            SourceError::Parse { .. } => "Malformed API Response",
        }
    }
}

/// Errors from delivering an alert.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API accepted the request but refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NotifyError::Parse(err.to_string())
        } else {
            NotifyError::Http(err.to_string())
        }
    }
}

/// Errors reported by a display panel.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The panel did not come up.
    #[error("panel initialisation failed: {0}")]
    Init(String),

    /// SPI or GPIO transfer failed.
    #[error("panel I/O failed: {0}")]
    Io(String),

    /// A frame was sent before `init`.
    #[error("panel used before initialisation")]
    NotInitialized,

    /// The frame does not match the panel geometry.
    #[error("frame is {got_width}x{got_height}, panel expects {width}x{height}")]
    Geometry {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
}
