//! Client error taxonomy
//!
//! Every failure surfaced by the client collapses into one of four
//! [`ApiError`] variants so callers can branch on kind without
//! inspecting message text.

use serde_json::Value;
use thiserror::Error;

use crate::response::RawResponse;

/// Errors surfaced by the portal client.
///
/// All variants carry a human-readable message through `Display`.
/// HTTP details, when they exist, are available through
/// [`ApiError::status`] and [`ApiError::payload`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request deadline elapsed before a response arrived.
    #[error("Request timeout after {timeout_ms} ms")]
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        timeout_ms: u64,
    },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the error body, or synthesized
        /// from the status line.
        message: String,
        /// Parsed error body, when the server sent one.
        payload: Option<Value>,
    },

    /// The session could not be kept alive.
    ///
    /// Raised when no refresh token is stored or when the refresh
    /// call itself fails. The client clears the session before
    /// returning this variant.
    #[error("{message}")]
    Auth {
        /// Description of the authentication failure.
        message: String,
    },

    /// Transport-level failure: DNS, connection, malformed payload.
    #[error("{message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },
}

impl ApiError {
    /// Creates an [`ApiError::Http`] with the given details.
    #[must_use]
    pub fn http(status: u16, message: String, payload: Option<Value>) -> Self {
        Self::Http {
            status,
            message,
            payload,
        }
    }

    /// Creates an [`ApiError::Auth`] with the given message.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates an [`ApiError::Network`] with the given message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// The auth failure reported when a refresh is needed but no
    /// refresh token is stored.
    #[must_use]
    pub fn no_refresh_token() -> Self {
        Self::Auth {
            message: "No refresh token available".to_string(),
        }
    }

    /// Builds an [`ApiError::Http`] from a non-2xx response.
    ///
    /// The message is taken from the body's `detail` or `message`
    /// field when the body is JSON, from the body text when it is
    /// non-empty, and otherwise synthesized from the status line.
    /// The payload always carries an object so callers can inspect
    /// field-level validation errors.
    #[must_use]
    pub fn from_response(response: &RawResponse) -> Self {
        let status = response.status;

        if let Ok(value) = serde_json::from_slice::<Value>(&response.body) {
            let message = Self::json_message(&value)
                .map_or_else(|| status_line(status), str::to_owned);
            return Self::Http {
                status,
                message,
                payload: Some(value),
            };
        }

        let message = match std::str::from_utf8(&response.body) {
            Ok(text) if !text.is_empty() => text.to_owned(),
            _ => status_line(status),
        };
        let payload = serde_json::json!({ "detail": message });
        Self::Http {
            status,
            message,
            payload: Some(payload),
        }
    }

    /// Extracts the human-readable `detail` or `message` field from
    /// a JSON error body. Empty strings count as absent.
    #[must_use]
    pub fn json_message(value: &Value) -> Option<&str> {
        value
            .get("detail")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
            })
    }

    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed error body, if the server sent one.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Http {
                payload: Some(payload),
                ..
            } => Some(payload),
            _ => None,
        }
    }

    /// Returns true if this is an authentication failure.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Returns true if this is a request timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Synthesizes a `"HTTP <code>: <reason>"` message for responses
/// whose body yields no usable text.
fn status_line(status: u16) -> String {
    format!("HTTP {status}: {}", reason_phrase(status))
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Result type alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;
