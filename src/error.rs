//! Error types for the PDF renderer

use thiserror::Error;

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a document
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the automation session
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Failed to open a page inside the session
    #[error("Failed to open page: {0}")]
    PageError(String),

    /// Failed to load content into the page
    #[error("Failed to load content: {0}")]
    LoadError(String),

    /// Failed to print the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The request body could not be turned into a render request
    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_invalid_requests() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(err.to_string().starts_with("Invalid render request"));
    }

    #[test]
    fn timeout_message_includes_duration() {
        assert_eq!(Error::Timeout(1500).to_string(), "Operation timed out after 1500ms");
    }
}
