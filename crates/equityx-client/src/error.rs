//! Error types for report acquisition

use thiserror::Error;

/// Coarse classification of a [`ReportError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Parse,
    Validation,
    RenderFetch,
    Config,
    Storage,
    Io,
}

/// Errors raised by the report client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    /// Request could not complete: connectivity, timeout or non-2xx status
    #[error("Network error: {0}")]
    Network(String),

    /// Response arrived but its payload could not be reconstructed or decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller supplied empty or unusable input; nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Secondary fetch of the report document failed
    #[error("Report document fetch failed: {0}")]
    RenderFetch(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(String),
}

impl ReportError {
    /// Classification used by callers that branch on the failure type
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::RenderFetch(_) => ErrorKind::RenderFetch,
            Self::Config(_) => ErrorKind::Config,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the report service. Please try again.".to_string(),
            Self::Parse(_) => "Received an unusable response from the report service.".to_string(),
            Self::RenderFetch(_) => "The detailed report could not be loaded.".to_string(),
            other => other.to_string(),
        }
    }

    /// Map a transport failure from `reqwest`
    ///
    /// The URL is stripped because report links carry signatures in their query.
    pub(crate) fn network(context: &str, err: reqwest::Error) -> Self {
        Self::Network(format!("{context}: {}", err.without_url()))
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for report client operations
pub type Result<T> = std::result::Result<T, ReportError>;
