//! HTTP Request body types

use serde_json::Value;

/// Payload attached to an outgoing request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// Structured value serialized as JSON by the transport
    Json(Value),
    /// Pre-encoded payload passed through untouched
    Raw {
        /// The content type (e.g., "text/csv")
        content_type: String,
        /// The encoded payload bytes
        bytes: Vec<u8>,
    },
}

impl RequestBody {
    /// Creates an empty body.
    #[must_use]
    pub const fn none() -> Self {
        Self::None
    }

    /// Creates a JSON body from any serializable value.
    #[must_use]
    pub fn json(value: impl Into<Value>) -> Self {
        Self::Json(value.into())
    }

    /// Creates a raw body with an explicit content type.
    #[must_use]
    pub fn raw(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Raw {
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Returns true if no body is attached.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the content type the transport should declare,
    /// unless a header already overrides it.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Json(_) => Some("application/json"),
            Self::Raw { content_type, .. } => Some(content_type),
        }
    }
}
