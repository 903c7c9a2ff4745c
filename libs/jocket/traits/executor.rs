use crate::error::HttpError;
use crate::headers::Headers;
use crate::packet::Packet;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// HTTP methods used by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One HTTP request to execute
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    /// JSON body; sent with `Content-Type: application/json`
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Headers::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(url: Url, body: Vec<u8>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: Headers::new(),
            body: Some(body),
            timeout,
        }
    }

    /// Add extra headers, keeping any already present
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Trait for executing HTTP requests
///
/// Used for the prepare request and by the polling transport. The future
/// completes on whatever task awaits it; callers hand the result back to the
/// client actor through its channels before touching connection state.
///
/// # Example
/// ```ignore
/// struct Canned(Packet);
///
/// #[async_trait::async_trait]
/// impl HttpExecutor for Canned {
///     async fn execute(&self, _request: HttpRequest) -> Result<Packet, HttpError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Execute the request and decode the response body as a packet
    ///
    /// # Returns
    /// * `Ok(packet)` - status 200 and a valid JSON envelope
    /// * `Err(HttpError::RequestTimeout)` - the request timeout elapsed
    /// * `Err(HttpError::Status(_))` - any other status code
    /// * `Err(HttpError::Decode(_))` - body was not an envelope
    /// * `Err(HttpError::Transport(_))` - the network call failed
    async fn execute(&self, request: HttpRequest) -> Result<Packet, HttpError>;
}
