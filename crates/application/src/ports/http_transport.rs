//! HTTP transport port

use async_trait::async_trait;
use portico_domain::{ApiError, RawResponse, RequestDescriptor};
use url::Url;

/// Port for performing a single HTTP exchange.
///
/// This trait abstracts the HTTP library, keeping the application
/// layer independent of it. Implementations enforce the descriptor's
/// deadline and surface transport failures as [`ApiError::Timeout`]
/// or [`ApiError::Network`]. A response with a non-2xx status is NOT
/// an error at this level; status interpretation belongs to the
/// client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request to `url` and reads the response fully.
    ///
    /// The client resolves `request.timeout_ms` before dispatch;
    /// adapters fall back to the domain default when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Timeout`] when the deadline elapses and
    /// [`ApiError::Network`] for connection or protocol failures.
    async fn send(&self, url: Url, request: &RequestDescriptor) -> Result<RawResponse, ApiError>;
}
