use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Status used when no response was received at all
pub const STATUS_NO_RESPONSE: i32 = 0;

/// Status used for failures that never reached the network
pub const STATUS_UNKNOWN: i32 = -1;

/// Failure taxonomy applied to every non-success outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    NetworkError,
    Unknown,
}

impl ErrorKind {
    /// Classify a normalized status. `None` for success.
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            500 => Some(ErrorKind::ServerError),
            STATUS_NO_RESPONSE => Some(ErrorKind::NetworkError),
            _ => Some(ErrorKind::Unknown),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Access forbidden",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::ServerError => "Server error",
            ErrorKind::NetworkError => "Network error",
            ErrorKind::Unknown => "API error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified failure in the uniform `{status, message, data}` shape.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: i32,
    pub message: String,
    pub data: Value,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    pub fn new(kind: ErrorKind, status: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            data: Value::Null,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, 401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, 403, message)
    }

    /// A success response whose body did not match the expected shape
    pub fn invalid_body(status: i32, error: &serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Unknown,
            status,
            format!("Invalid response body: {}", error),
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(204), None);
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::Forbidden));
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(500), Some(ErrorKind::ServerError));
        assert_eq!(ErrorKind::from_status(0), Some(ErrorKind::NetworkError));

        // Everything else is unknown, including other 5xx
        assert_eq!(ErrorKind::from_status(400), Some(ErrorKind::Unknown));
        assert_eq!(ErrorKind::from_status(429), Some(ErrorKind::Unknown));
        assert_eq!(ErrorKind::from_status(502), Some(ErrorKind::Unknown));
        assert_eq!(ErrorKind::from_status(-1), Some(ErrorKind::Unknown));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(ApiError::truncate_body("short"), "short");

        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));

        // Never split a multi-byte character
        let wide = "é".repeat(300);
        assert!(ApiError::truncate_body(&wide).contains("600 total bytes"));
    }

    #[test]
    fn test_display() {
        let err = ApiError::forbidden("Admins only");
        assert_eq!(err.to_string(), "Access forbidden: Admins only");
        assert!(!err.is_unauthorized());
        assert!(ApiError::unauthorized("x").is_unauthorized());
    }
}
