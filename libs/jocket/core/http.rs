//! HTTP request executor backed by reqwest

use crate::codec;
use crate::error::{HttpError, JocketError, Result};
use crate::executor::{HttpExecutor, HttpMethod, HttpRequest};
use crate::packet::Packet;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, REFERER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Value of the `Referer` header identifying this client
pub const CLIENT_REFERER: &str = "jocket-rs";

/// Cache-disabling directive sent with every request
pub const NO_CACHE: &str = "no-store, no-cache";

/// Default HTTP executor
///
/// Per-request timeouts come from [`HttpRequest::timeout`]; the client
/// itself only bounds connection setup.
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Create an executor with a fresh connection pool
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(15))
            .build()
            .map_err(|e| JocketError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<Packet, HttpError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };

        builder = builder
            .timeout(request.timeout)
            .header(REFERER, CLIENT_REFERER)
            .header(CACHE_CONTROL, NO_CACHE)
            .header(CONTENT_TYPE, "application/json");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();

        if status != StatusCode::OK {
            warn!("HTTP {:?} {} returned {}", request.method, request.url, status);
            return Err(HttpError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        let packet = codec::decode(&body)?;
        debug!("HTTP {:?} {} ok", request.method, request.url);
        Ok(packet)
    }
}

fn classify(error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::RequestTimeout
    } else {
        HttpError::Transport(error.to_string())
    }
}
