//! Custom error types for translation and improvement operations

use thiserror::Error;

/// Errors raised by the translation engine, the improvement service and the loop
#[derive(Error, Debug)]
pub enum ImproverError {
    /// Translation engine call failed
    #[error("Translation engine error: {message}")]
    Engine {
        /// Failure description
        message: String,
    },

    /// Input rejected before any external call
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Failure description
        message: String,
    },

    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Failure description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// Failure description
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        /// Offending path
        path: String,
        /// Underlying failure
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Failure description
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ImproverError {
    /// Map a transport failure, keeping timeouts distinct
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImproverError::TimeoutError
        } else {
            ImproverError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

impl From<anyhow::Error> for ImproverError {
    fn from(err: anyhow::Error) -> Self {
        ImproverError::InternalError(err.to_string())
    }
}

/// Result type for improver operations
pub type Result<T> = std::result::Result<T, ImproverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ImproverError::ApiError {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - unauthorized");

        let err: ImproverError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}
