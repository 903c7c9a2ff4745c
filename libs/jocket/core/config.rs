use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Bounded wait for the handshake pong of each transport attempt
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between heartbeat pings once open
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Timeout of the prepare request
pub const DEFAULT_PREPARE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout of one long-poll GET
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Timeout of one polling POST
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Protocol generation spoken by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolProfile {
    /// `POST .jocket_prepare` negotiation with transport fallback
    #[default]
    Multi,
    /// `GET .jocket` session creation, polling only, server-driven timing
    Legacy,
}

impl ProtocolProfile {
    /// Whether an inbound `{"type":"ping"}` is answered with a pong
    ///
    /// Legacy servers ping the client; in the multi-transport protocol a
    /// ping from the server is ordinary application data.
    pub fn answers_server_ping(self) -> bool {
        matches!(self, ProtocolProfile::Legacy)
    }
}

/// Options of the polling transport
#[derive(Debug, Clone)]
pub struct PollingOptions {
    pub poll_timeout: Duration,
    pub send_timeout: Duration,
    /// POST a `{"type":"close"}` packet when the transport is closed
    pub send_close_packet: bool,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            send_close_packet: true,
        }
    }
}

/// Configuration for a Jocket client
///
/// Built with the type-state builder; the base URL is the only required
/// field. Owned by the client actor once the client is built.
pub struct ClientConfig {
    /// Base URL, e.g. `http://host:8080/jocket/chat/simple`
    pub(crate) base_url: Url,

    /// Transports requested in the prepare body, client-preferred order
    pub(crate) transports: Vec<TransportKind>,

    pub(crate) profile: ProtocolProfile,

    pub(crate) handshake_timeout: Duration,

    pub(crate) heartbeat_interval: Duration,

    /// Strict keepalive; `None` relies on the transport's own close signal
    pub(crate) pong_timeout: Option<Duration>,

    pub(crate) prepare_timeout: Duration,

    /// Send `{"type":"open"}` after the handshake pong
    pub(crate) send_open_ack: bool,

    pub(crate) polling: PollingOptions,

    /// Consult `reconnect_strategy` when an open session is lost
    pub(crate) auto_reconnect: bool,

    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    pub(crate) headers: Arc<dyn HeaderProvider>,

    pub(crate) executor: Arc<dyn HttpExecutor>,

    pub(crate) transport_factory: Arc<dyn TransportFactory>,

    /// Span the client actor runs in
    pub(crate) span: tracing::Span,
}
