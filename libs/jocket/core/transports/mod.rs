//! Concrete transports and the default factory

pub mod polling;
pub mod websocket;

pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

use crate::config::PollingOptions;
use crate::executor::HttpExecutor;
use crate::headers::HeaderProvider;
use crate::transport::{Transport, TransportFactory, TransportKind, TransportSink};
use std::sync::Arc;
use url::Url;

/// Builds the stock WebSocket and polling transports
pub struct DefaultTransportFactory {
    executor: Arc<dyn HttpExecutor>,
    headers: Arc<dyn HeaderProvider>,
    polling: PollingOptions,
}

impl DefaultTransportFactory {
    pub fn new(
        executor: Arc<dyn HttpExecutor>,
        headers: Arc<dyn HeaderProvider>,
        polling: PollingOptions,
    ) -> Self {
        Self {
            executor,
            headers,
            polling,
        }
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, kind: TransportKind, url: Url, sink: TransportSink) -> Box<dyn Transport> {
        match kind {
            TransportKind::WebSocket => {
                Box::new(WebSocketTransport::new(url, sink, Arc::clone(&self.headers)))
            }
            TransportKind::Polling => Box::new(PollingTransport::new(
                url,
                sink,
                Arc::clone(&self.executor),
                Arc::clone(&self.headers),
                self.polling.clone(),
            )),
        }
    }
}
