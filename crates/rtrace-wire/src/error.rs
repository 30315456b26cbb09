//! Error types for rtrace-wire

use thiserror::Error;

/// Result type alias using rtrace-wire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading an agent event stream
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The byte source failed mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// A line was not valid UTF-8
    #[error("Invalid UTF-8 in stream at byte {valid_up_to}")]
    Decode { line: Vec<u8>, valid_up_to: usize },

    /// A line was not a well-formed event record
    #[error("Malformed event line: {reason}")]
    Parse { line: String, reason: String },

    /// The configured endpoint is not a valid URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Stream was aborted
    #[error("Request aborted")]
    Aborted,
}

impl Error {
    /// Create a parse error for a line
    pub fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }
}
