//! Unified error types for the IFS Cloud MCP Server.

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Token endpoint errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OAuth2 token request failed ({status}): {body}")]
    TokenRequestFailed { status: StatusCode, body: String },

    #[error("Token parse error: {0}")]
    TokenParse(String),

    #[error("OAuth2 token request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// API request/response errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("IFS not configured: connection must be established before any request")]
    NotConfigured,

    #[error("IFS connection is already configured")]
    AlreadyConfigured,

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IFS {method} {endpoint} failed ({status}): {body}")]
    Http {
        method: Method,
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("IFS request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to create HTTP client: {0}")]
    HttpClientInit(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// Status code of a failed resource call, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Auth(AuthError::TokenRequestFailed { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// True for the statuses that trigger a single re-authentication.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::Http { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_missing_field_display() {
        let error = ConfigError::MissingField("base_url".to_string());
        assert_eq!(error.to_string(), "Missing required field: base_url");
    }

    #[test]
    fn test_config_error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(config_err.to_string().contains("IO error"));
    }

    #[test]
    fn test_auth_error_token_request_failed_display() {
        let error = AuthError::TokenRequestFailed {
            status: StatusCode::UNAUTHORIZED,
            body: "invalid_client".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("401"));
        assert!(display.contains("invalid_client"));
    }

    #[test]
    fn test_timeout_display_names_duration() {
        let error = ApiError::Timeout { timeout_ms: 30000 };
        assert_eq!(error.to_string(), "IFS request timed out after 30000ms");
    }

    #[test]
    fn test_http_error_display() {
        let error = ApiError::Http {
            method: Method::PATCH,
            endpoint: "/WorkTaskHandling.svc/JtTaskSet".to_string(),
            status: StatusCode::PRECONDITION_FAILED,
            body: "etag mismatch".to_string(),
        };
        let display = error.to_string();
        assert!(display.starts_with("IFS PATCH /WorkTaskHandling.svc/JtTaskSet failed"));
        assert!(display.contains("412"));
        assert!(display.contains("etag mismatch"));
    }

    #[test]
    fn test_auth_rejection_detection() {
        let forbidden = ApiError::Http {
            method: Method::GET,
            endpoint: "/x".to_string(),
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };
        let server_error = ApiError::Http {
            method: Method::GET,
            endpoint: "/x".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(forbidden.is_auth_rejection());
        assert!(!server_error.is_auth_rejection());
        assert!(!ApiError::Timeout { timeout_ms: 1 }.is_auth_rejection());
        assert_eq!(server_error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_api_error_from_auth_error() {
        let auth_error = AuthError::TokenParse("missing access_token".to_string());
        let api_error: ApiError = auth_error.into();
        assert!(api_error.to_string().contains("Authentication error"));
    }

    #[test]
    fn test_api_error_debug_format() {
        let error = ApiError::NotConfigured;
        assert!(format!("{:?}", error).contains("NotConfigured"));
    }
}
