use async_trait::async_trait;
use std::collections::HashMap;

/// Extra HTTP headers to send with Jocket requests
pub type Headers = HashMap<String, String>;

/// Trait for providing HTTP headers dynamically
///
/// Implement this trait to add headers to every request the client makes:
/// the prepare request, each long-poll and send request, and the WebSocket
/// upgrade request. It is called per request, so tokens can be refreshed.
///
/// The fixed `Referer` and cache-disabling headers are always sent and do
/// not need to be provided here.
///
/// # Example
/// ```ignore
/// struct BearerToken(String);
///
/// #[async_trait::async_trait]
/// impl HeaderProvider for BearerToken {
///     async fn get_headers(&self) -> Headers {
///         let mut headers = HashMap::new();
///         headers.insert("Authorization".to_string(), format!("Bearer {}", self.0));
///         headers
///     }
/// }
/// ```
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Generate headers for the next request
    async fn get_headers(&self) -> Headers;
}

/// A no-op header provider that doesn't add any headers
pub struct NoHeaders;

#[async_trait]
impl HeaderProvider for NoHeaders {
    async fn get_headers(&self) -> Headers {
        HashMap::new()
    }
}

/// A fixed set of headers sent with every request
pub struct StaticHeaders(Headers);

impl StaticHeaders {
    pub fn new(headers: Headers) -> Self {
        Self(headers)
    }
}

#[async_trait]
impl HeaderProvider for StaticHeaders {
    async fn get_headers(&self) -> Headers {
        self.0.clone()
    }
}
