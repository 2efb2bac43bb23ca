//! Request descriptor
//!
//! A [`RequestDescriptor`] captures everything the client needs to
//! dispatch one call: endpoint path, method, headers, body and the
//! per-request deadline. Descriptors are cheap to clone, which is
//! what makes replay after a token refresh possible.

use super::{Header, Headers, HttpMethod, RequestBody};

/// Default per-request deadline in milliseconds, applied when neither
/// the descriptor nor the client configuration overrides it.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A single outgoing request, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the service base URL (e.g., "/api/courses/courses/").
    pub endpoint: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Extra headers. `Authorization` is managed by the client and
    /// overwritten on dispatch and on replay.
    pub headers: Headers,
    /// Request payload.
    pub body: RequestBody,
    /// Deadline for the whole exchange, in milliseconds. `None` means
    /// the client's configured default.
    pub timeout_ms: Option<u64>,
}

impl RequestDescriptor {
    /// Creates a GET descriptor using the client's default deadline.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            headers: Headers::new(),
            body: RequestBody::None,
            timeout_ms: None,
        }
    }

    /// Creates a GET descriptor.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint)
    }

    /// Creates a POST descriptor with a JSON body.
    #[must_use]
    pub fn post(endpoint: impl Into<String>, body: impl Into<serde_json::Value>) -> Self {
        Self {
            method: HttpMethod::Post,
            body: RequestBody::json(body),
            ..Self::new(endpoint)
        }
    }

    /// Creates a bodyless POST descriptor, as used by the portal's
    /// action endpoints (borrow, renew, register and friends).
    #[must_use]
    pub fn post_empty(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::new(endpoint)
        }
    }

    /// Creates a PATCH descriptor with a JSON body.
    #[must_use]
    pub fn patch(endpoint: impl Into<String>, body: impl Into<serde_json::Value>) -> Self {
        Self {
            method: HttpMethod::Patch,
            body: RequestBody::json(body),
            ..Self::new(endpoint)
        }
    }

    /// Creates a DELETE descriptor.
    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            ..Self::new(endpoint)
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(Header::new(name, value));
        self
    }

    /// Overrides the per-request deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the `Authorization` header to a bearer token, replacing
    /// any previous value. This is the only mutation the client
    /// performs on a descriptor after construction.
    pub fn set_bearer(&mut self, token: &str) {
        self.headers.set("Authorization", format!("Bearer {token}"));
    }

    /// Returns the current `Authorization` header value, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_descriptor_defaults() {
        let descriptor = RequestDescriptor::new("/api/courses/courses/");

        assert_eq!(descriptor.method, HttpMethod::Get);
        assert_eq!(descriptor.timeout_ms, None);
        assert!(descriptor.headers.is_empty());
        assert!(descriptor.body.is_none());
    }

    #[test]
    fn test_post_carries_json_body() {
        let descriptor = RequestDescriptor::post(
            "/api/auth/login/",
            json!({"username": "amina", "password": "secret"}),
        );

        assert_eq!(descriptor.method, HttpMethod::Post);
        assert_eq!(
            descriptor.body,
            RequestBody::Json(json!({"username": "amina", "password": "secret"}))
        );
    }

    #[test]
    fn test_set_bearer_replaces_previous_token() {
        let mut descriptor = RequestDescriptor::get("/api/todos/todos/");
        descriptor.set_bearer("first");
        descriptor.set_bearer("second");

        assert_eq!(descriptor.authorization(), Some("Bearer second"));
        assert_eq!(descriptor.headers.len(), 1);
    }

    #[test]
    fn test_with_timeout_overrides_default() {
        let descriptor = RequestDescriptor::get("/api/results/results/").with_timeout_ms(5_000);
        assert_eq!(descriptor.timeout_ms, Some(5_000));
    }
}
