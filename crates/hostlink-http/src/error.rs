//! Error types for the shared client lifecycle and request execution

use thiserror::Error;

/// Result type for hostlink operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Errors raised while managing or using the shared client
#[derive(Debug, Error)]
pub enum HttpError {
    /// The host configuration is not reachable from this process (e.g. a
    /// worker node rather than the controller)
    #[error("The shared HTTP client is only available where the host configuration is")]
    HostUnavailable,

    /// Closing a stale or shutting-down client failed
    #[error("Could not close shared HTTP client: {0}")]
    Teardown(#[source] std::io::Error),

    /// Client build error
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Invalid proxy configuration
    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    /// TLS trust context could not be constructed
    #[error("Could not build TLS context for the client: {0}")]
    Tls(String),

    /// Environment configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A request was issued through a client that has been closed
    #[error("HTTP client has been closed")]
    Closed,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network request failed
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// HTTP error status
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
}

impl From<config::ConfigError> for HttpError {
    fn from(err: config::ConfigError) -> Self {
        HttpError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_keeps_source() {
        let err = HttpError::Teardown(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "socket gone",
        ));
        assert!(err.to_string().contains("socket gone"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_error_converts() {
        let err: HttpError = config::ConfigError::Message("bad value".into()).into();
        assert!(matches!(err, HttpError::Config(ref m) if m.contains("bad value")));
    }
}
