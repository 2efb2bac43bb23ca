//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port using the reqwest
//! library. It handles all HTTP communication for the client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use portico_application::ports::HttpTransport;
use portico_domain::{
    ApiError, HttpMethod, RawResponse, RequestBody, RequestDescriptor, DEFAULT_TIMEOUT_MS,
};
use reqwest::{Client, Method};
use url::Url;

/// HTTP transport backed by `reqwest::Client`.
///
/// Non-2xx statuses are returned as responses, never as errors;
/// interpreting them is the client's job. The descriptor's deadline
/// covers the whole exchange including reading the body.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// Default configuration:
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    /// - User-Agent: "Portico/0.1.0"
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying client cannot
    /// be constructed.
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent("Portico/0.1.0")
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| ApiError::network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { client })
    }

    /// Creates a transport over a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Attaches the request body to the builder.
    fn apply_body(
        builder: reqwest::RequestBuilder,
        body: &RequestBody,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        match body {
            RequestBody::None => Ok(builder),
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|err| {
                    ApiError::network(format!("Failed to encode JSON body: {err}"))
                })?;
                Ok(builder.body(bytes))
            }
            RequestBody::Raw { bytes, .. } => Ok(builder.body(bytes.clone())),
        }
    }

    /// Maps reqwest errors into the client taxonomy.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> ApiError {
        if error.is_timeout() {
            return ApiError::Timeout { timeout_ms };
        }
        if error.is_connect() {
            return ApiError::network(format!("Connection failed: {error}"));
        }
        if error.is_redirect() {
            return ApiError::network(format!("Redirect loop: {error}"));
        }
        ApiError::network(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, url: Url, request: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let timeout_ms = request.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(Duration::from_millis(timeout_ms));

        for header in &request.headers {
            builder = builder.header(&header.name, &header.value);
        }

        // Declare the body's content type unless a header already did.
        if let Some(content_type) = request.body.content_type() {
            if !request.headers.contains("content-type") {
                builder = builder.header("Content-Type", content_type);
            }
        }

        builder = Self::apply_body(builder, &request.body)?;

        let response = builder
            .send()
            .await
            .map_err(|err| Self::map_error(&err, timeout_ms))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|err| Self::map_error(&err, timeout_ms))?
            .to_vec();

        Ok(RawResponse::new(status, headers, body, start.elapsed()))
    }
}
