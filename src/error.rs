//! Error types for the CoinPayments client

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for CoinPayments operations
pub type Result<T> = std::result::Result<T, CoinPaymentsError>;

/// Main error type for CoinPayments operations
#[derive(Error, Debug)]
pub enum CoinPaymentsError {
    /// Connection, DNS or timeout failure in the HTTP layer
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body is not a JSON object
    #[error("Response parse error (HTTP {status}): {source}")]
    Parse {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// Response body has no `result` field
    #[error("Response parse error (HTTP {status}): missing result field{}", api_error_suffix(.error))]
    MissingResult {
        status: StatusCode,
        error: Option<String>,
    },

    /// The API reported an error next to its result
    #[error("API error (HTTP {status}): {message}")]
    Api { status: StatusCode, message: String },

    /// The result did not match the record expected for a command
    #[error("Unexpected result for {command}: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn api_error_suffix(error: &Option<String>) -> String {
    match error {
        Some(message) => format!(" (API error: {})", message),
        None => String::new(),
    }
}

impl CoinPaymentsError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an API error
    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// True when the response body could not be turned into a result
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::MissingResult { .. })
    }

    /// True for failures below HTTP (connect, DNS, timeout)
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// HTTP status of the response that produced this error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Parse { status, .. }
            | Self::MissingResult { status, .. }
            | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            Self::Decode { .. } | Self::Config { .. } => None,
        }
    }

    /// Error text reported by the API, if the response carried one
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::MissingResult { error, .. } => error.as_deref(),
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_result_is_parse_error() {
        let error = CoinPaymentsError::MissingResult {
            status: StatusCode::BAD_REQUEST,
            error: Some("bad request".to_string()),
        };

        assert!(error.is_parse_error());
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(error.api_message(), Some("bad request"));
        assert_eq!(
            error.to_string(),
            "Response parse error (HTTP 400 Bad Request): missing result field (API error: bad request)"
        );
    }

    #[test]
    fn test_api_error_is_not_parse_error() {
        let error = CoinPaymentsError::api(StatusCode::OK, "Invalid command");
        assert!(!error.is_parse_error());
        assert!(!error.is_transport_error());
        assert_eq!(error.api_message(), Some("Invalid command"));
    }

    #[test]
    fn test_config_error_has_no_status() {
        let error = CoinPaymentsError::config("missing key");
        assert_eq!(error.status(), None);
        assert_eq!(error.to_string(), "Configuration error: missing key");
    }
}
