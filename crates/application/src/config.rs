//! Client configuration

use std::time::Duration;

use portico_domain::{ApiError, DEFAULT_TIMEOUT_MS};
use url::Url;

/// Connection settings for the portal service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the given base URL.
    ///
    /// The URL must be absolute with an `http` or `https` scheme.
    /// Any trailing slash is dropped so endpoint paths can always
    /// start with one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the URL does not parse or
    /// uses an unsupported scheme.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ApiError::network(format!("Invalid base URL {base_url:?}: {err}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ApiError::network(format!(
                "Base URL must use http or https, got {:?}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: parsed,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    /// Overrides the default per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The default per-request deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The default deadline in milliseconds, saturating on overflow.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// Paths are joined by concatenation, so a base URL with a path
    /// prefix keeps that prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the joined URL does not parse.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = format!("{base}{endpoint}");
        Url::parse(&joined)
            .map_err(|err| ApiError::network(format!("Invalid endpoint {endpoint:?}: {err}")))
    }
}
