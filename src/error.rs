//! Error types for the catatkeu CLI

use serde_json::Value;
use thiserror::Error;

/// Result type alias for catatkeu operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Prompt(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Prompt(err.to_string())
    }
}

/// Message used when a request never produced a response.
pub const NO_RESPONSE_MESSAGE: &str = "No response received from server";

/// Uniform shape for every HTTP failure.
///
/// Callers only ever see a message, an optional status code and the raw
/// response payload, whatever went wrong underneath.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message
    pub message: String,

    /// HTTP status, absent for transport failures
    pub status: Option<u16>,

    /// Raw response body, when one was received
    pub data: Option<Value>,
}

impl ApiError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }

    /// The request was sent but nothing came back.
    pub fn no_response() -> Self {
        Self::new(NO_RESPONSE_MESSAGE)
    }

    /// Build an error from a rejected response.
    ///
    /// The message is taken from the body's `message` or `error` field, then
    /// from a bare string body, and finally from the status code.
    pub fn from_response(status: u16, data: Option<Value>) -> Self {
        let message = data
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        Self {
            message,
            status: Some(status),
            data,
        }
    }

    /// The response arrived but its body could not be decoded.
    pub fn invalid_response(detail: impl std::fmt::Display) -> Self {
        Self::new(format!("Invalid API response: {}", detail))
    }

    /// Whether this failure is an authentication rejection.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

/// Pull a human message out of an error payload.
fn extract_message(data: &Value) -> Option<String> {
    const MESSAGE_FIELDS: [&str; 2] = ["message", "error"];

    if let Value::String(s) = data {
        return (!s.is_empty()).then(|| s.clone());
    }

    MESSAGE_FIELDS.iter().find_map(|field| match data.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ApiError::no_response()
        } else if err.is_decode() {
            ApiError::invalid_response(err)
        } else {
            ApiError::new(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Session-related errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not logged in. Run `catatkeu login --remember` to start a session.")]
    NotLoggedIn,

    #[error("Session storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_response_has_no_status() {
        let err = ApiError::no_response();
        assert_eq!(err.message, NO_RESPONSE_MESSAGE);
        assert!(err.status.is_none());
        assert!(err.data.is_none());
    }

    #[test]
    fn test_from_response_prefers_message_field() {
        let body = json!({ "message": "quota exceeded", "error": "E_QUOTA" });
        let err = ApiError::from_response(429, Some(body));
        assert_eq!(err.message, "quota exceeded");
        assert_eq!(err.status, Some(429));
    }

    #[test]
    fn test_from_response_falls_back_to_error_field() {
        let err = ApiError::from_response(403, Some(json!({ "error": "invalid_token" })));
        assert_eq!(err.message, "invalid_token");
        assert_eq!(err.to_string(), "invalid_token");
    }

    #[test]
    fn test_from_response_string_body() {
        let err = ApiError::from_response(500, Some(json!("boom")));
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_from_response_without_body() {
        let err = ApiError::from_response(502, None);
        assert!(err.message.contains("502"));
        assert_eq!(err.status, Some(502));
    }

    #[test]
    fn test_from_response_keeps_payload() {
        let body = json!({ "error": "missing_file_field", "field": "file" });
        let err = ApiError::from_response(400, Some(body.clone()));
        assert_eq!(err.data, Some(body));
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ApiError::from_response(401, None).is_unauthorized());
        assert!(!ApiError::from_response(403, None).is_unauthorized());
        assert!(!ApiError::no_response().is_unauthorized());
    }

    #[test]
    fn test_session_error_not_logged_in() {
        assert!(SessionError::NotLoggedIn.to_string().contains("catatkeu login"));
    }

    #[test]
    fn test_error_from_api_error() {
        let err: Error = ApiError::no_response().into();
        match err {
            Error::Api(api) => assert!(api.status.is_none()),
            _ => panic!("Expected Error::Api"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("bad: [yaml").unwrap_err();
        let config_err: ConfigError = yaml_err.into();
        assert!(matches!(config_err, ConfigError::ParseError(_)));
    }
}
