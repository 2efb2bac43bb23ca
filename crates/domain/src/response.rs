//! Response model
//!
//! [`RawResponse`] is what a transport hands back: status, headers,
//! bytes and timing, with no interpretation applied. [`ResponseBody`]
//! is the decoded form the client returns to callers, classified by
//! the declared content type.

use std::collections::HashMap;
use std::time::Duration;

use mime::Mime;
use serde_json::Value;

use crate::error::ApiError;

/// An HTTP response exactly as the transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as a map.
    pub headers: HashMap<String, String>,
    /// Response body bytes, fully read.
    pub body: Vec<u8>,
    /// Wall-clock time spent on the exchange.
    pub elapsed: Duration,
}

impl RawResponse {
    /// Creates a new `RawResponse` from transport data.
    #[must_use]
    pub fn new(
        status: u16,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            elapsed,
        }
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the declared `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// A response body decoded according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Body declared and parsed as JSON.
    Json(Value),
    /// Body declared as text, decoded as UTF-8.
    Text(String),
    /// Anything else, kept as raw bytes.
    Binary(Vec<u8>),
}

impl ResponseBody {
    /// Classifies a successful response by its declared content type.
    ///
    /// `application/json` and any `+json` suffix parse as [`Self::Json`];
    /// a declared-JSON body that fails to parse is a
    /// [`ApiError::Network`] error, not a silent downgrade. `text/*`
    /// decodes as [`Self::Text`], replacing invalid UTF-8. Everything
    /// else, including a missing or unparseable content type, is
    /// returned as [`Self::Binary`].
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] when a declared-JSON body does not parse.
    pub fn classify(response: RawResponse) -> Result<Self, ApiError> {
        let declared = response
            .content_type()
            .and_then(|value| value.parse::<Mime>().ok());

        match declared {
            Some(mime_type)
                if mime_type.subtype() == mime::JSON
                    || mime_type.suffix() == Some(mime::JSON) =>
            {
                serde_json::from_slice(&response.body).map(Self::Json).map_err(|err| {
                    ApiError::network(format!("Response declared JSON but failed to parse: {err}"))
                })
            }
            Some(mime_type) if mime_type.type_() == mime::TEXT => {
                Ok(Self::Text(String::from_utf8_lossy(&response.body).into_owned()))
            }
            _ => Ok(Self::Binary(response.body)),
        }
    }

    /// Returns the JSON value, or a network error for non-JSON bodies.
    ///
    /// Used by callers of endpoints that are contractually JSON.
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] when the body was not classified as JSON.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(_) | Self::Binary(_) => {
                Err(ApiError::network("Expected a JSON response body"))
            }
        }
    }

    /// Returns the JSON value without consuming the body.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text content without consuming the body.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the raw bytes for binary bodies.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}
