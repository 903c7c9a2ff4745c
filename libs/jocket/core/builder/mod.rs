pub mod states;

use crate::client::Jocket;
use crate::config::*;
use crate::http::ReqwestExecutor;
use crate::traits::*;
use crate::transports::DefaultTransportFactory;
use states::*;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Type-state builder for [`Jocket`]
///
/// The base URL is the only required field; `build()` does not exist until
/// it is set. Everything else has a protocol default.
pub struct JocketBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    transports: Vec<TransportKind>,
    profile: ProtocolProfile,
    handshake_timeout: Duration,
    heartbeat_interval: Duration,
    pong_timeout: Option<Duration>,
    prepare_timeout: Duration,
    send_open_ack: bool,
    polling: PollingOptions,
    auto_reconnect: bool,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    headers: Option<Arc<dyn HeaderProvider>>,
    executor: Option<Arc<dyn HttpExecutor>>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    handler: Option<Box<dyn EventHandler>>,
    span: Option<tracing::Span>,
}

impl JocketBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            profile: ProtocolProfile::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pong_timeout: None,
            prepare_timeout: DEFAULT_PREPARE_TIMEOUT,
            send_open_ack: true,
            polling: PollingOptions::default(),
            auto_reconnect: false,
            reconnect_strategy: None,
            headers: None,
            executor: None,
            transport_factory: None,
            handler: None,
            span: None,
        }
    }

    /// Base URL of the Jocket endpoint, e.g. `http://host:8080/jocket/chat/simple`
    pub fn url(self, url: impl Into<String>) -> JocketBuilder<HasUrl> {
        JocketBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            transports: self.transports,
            profile: self.profile,
            handshake_timeout: self.handshake_timeout,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout,
            prepare_timeout: self.prepare_timeout,
            send_open_ack: self.send_open_ack,
            polling: self.polling,
            auto_reconnect: self.auto_reconnect,
            reconnect_strategy: self.reconnect_strategy,
            headers: self.headers,
            executor: self.executor,
            transport_factory: self.transport_factory,
            handler: self.handler,
            span: self.span,
        }
    }
}

impl Default for JocketBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> JocketBuilder<U>
where
    U: UrlState,
{
    /// Transports requested in the prepare body, in preferred order
    ///
    /// Defaults to websocket, then polling. The server's answer decides the
    /// order actually tried.
    pub fn transports(mut self, transports: impl IntoIterator<Item = TransportKind>) -> Self {
        self.transports = transports.into_iter().collect();
        self
    }

    pub fn profile(mut self, profile: ProtocolProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Bound on the wait for the handshake pong of each transport attempt
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Close with `PingTimeout` when a heartbeat ping stays unanswered
    /// longer than `timeout`
    ///
    /// Off by default. Should be shorter than the heartbeat interval, since
    /// the check runs on each heartbeat tick.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = Some(timeout);
        self
    }

    pub fn prepare_timeout(mut self, timeout: Duration) -> Self {
        self.prepare_timeout = timeout;
        self
    }

    /// Send `{"type":"open"}` once the handshake completes (default on)
    pub fn send_open_ack(mut self, enabled: bool) -> Self {
        self.send_open_ack = enabled;
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.polling.poll_timeout = timeout;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.polling.send_timeout = timeout;
        self
    }

    /// POST `{"type":"close"}` when a polling transport is closed (default on)
    pub fn send_close_packet(mut self, enabled: bool) -> Self {
        self.polling.send_close_packet = enabled;
        self
    }

    /// Reconnect after an established session is lost
    ///
    /// Needs a [`ReconnectionStrategy`] that yields delays; with the default
    /// [`NeverReconnect`] nothing happens.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    pub fn executor(mut self, executor: impl HttpExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Share an executor with other components
    pub fn executor_arc(mut self, executor: Arc<dyn HttpExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn transport_factory(mut self, factory: impl TransportFactory + 'static) -> Self {
        self.transport_factory = Some(Arc::new(factory));
        self
    }

    pub fn transport_factory_arc(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Deliver events to `handler` on a dedicated thread instead of the
    /// client's event channel
    pub fn handler(mut self, handler: impl EventHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Span the client actor runs in
    ///
    /// Defaults to an `info` span named `jocket` carrying the base URL.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }
}

// Build method - only available once the URL is set
impl JocketBuilder<HasUrl> {
    pub async fn build(self) -> Result<Jocket> {
        let raw = self.url.unwrap_or_default();
        let base_url = Url::parse(&raw)
            .map_err(|e| JocketError::Configuration(format!("Invalid URL {:?}: {}", raw, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(JocketError::Configuration(format!(
                "Base URL must be http or https: {}",
                base_url
            )));
        }

        if self.profile == ProtocolProfile::Multi && self.transports.is_empty() {
            return Err(JocketError::Configuration(
                "At least one transport must be requested".into(),
            ));
        }

        for (name, value) in [
            ("heartbeat_interval", Some(self.heartbeat_interval)),
            ("handshake_timeout", Some(self.handshake_timeout)),
            ("prepare_timeout", Some(self.prepare_timeout)),
            ("pong_timeout", self.pong_timeout),
        ] {
            if matches!(value, Some(d) if d.is_zero()) {
                return Err(JocketError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(ReqwestExecutor::new()?),
        };
        let headers = self.headers.unwrap_or_else(|| Arc::new(NoHeaders));
        let transport_factory = self.transport_factory.unwrap_or_else(|| {
            Arc::new(DefaultTransportFactory::new(
                Arc::clone(&executor),
                Arc::clone(&headers),
                self.polling.clone(),
            ))
        });
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("jocket", url = %base_url));

        let config = ClientConfig {
            base_url,
            transports: self.transports,
            profile: self.profile,
            handshake_timeout: self.handshake_timeout,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout,
            prepare_timeout: self.prepare_timeout,
            send_open_ack: self.send_open_ack,
            polling: self.polling,
            auto_reconnect: self.auto_reconnect,
            reconnect_strategy: self
                .reconnect_strategy
                .unwrap_or_else(|| Box::new(NeverReconnect)),
            headers,
            executor,
            transport_factory,
            span,
        };

        Ok(Jocket::new(config, self.handler))
    }
}
