//! Transport contract
//!
//! A transport is one concrete data channel (WebSocket or HTTP long-polling)
//! for an already prepared session. Transports report back to the client
//! through a [`TransportSink`]: a one-directional, non-owning handle that
//! tags every event with the transport instance id, so the client can discard
//! events from instances it has already torn down.

use crate::error::{JocketError, Result};
use crate::packet::Packet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Transport variants known to this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent WebSocket connection
    WebSocket,
    /// HTTP long-polling
    Polling,
}

impl TransportKind {
    /// Name used on the wire in the prepare exchange
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::WebSocket => "websocket",
            TransportKind::Polling => "polling",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportKind {
    type Err = JocketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "websocket" => Ok(TransportKind::WebSocket),
            "polling" => Ok(TransportKind::Polling),
            other => Err(JocketError::Configuration(format!(
                "Unknown transport: {}",
                other
            ))),
        }
    }
}

/// Identity of one transport instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(pub u64);

/// Events a transport reports
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport is connected and can carry packets
    Open,
    /// The transport is gone; `None` means a clean close
    Close(Option<JocketError>),
    /// A decoded inbound packet
    Packet(Packet),
}

/// An event tagged with the instance that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TransportSignal {
    pub id: TransportId,
    pub event: TransportEvent,
}

/// Event sink handed to a transport instance
///
/// Cloning is cheap; clones share the silenced flag, so once the owning
/// transport calls [`TransportSink::silence`] no clone emits anymore.
#[derive(Debug, Clone)]
pub struct TransportSink {
    id: TransportId,
    tx: UnboundedSender<TransportSignal>,
    silenced: Arc<AtomicBool>,
}

impl TransportSink {
    /// Create a sink for the transport instance `id`
    pub fn new(id: TransportId, tx: UnboundedSender<TransportSignal>) -> Self {
        Self {
            id,
            tx,
            silenced: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Identity of the transport owning this sink
    pub fn id(&self) -> TransportId {
        self.id
    }

    /// Report that the transport opened
    pub fn open(&self) {
        self.emit(TransportEvent::Open);
    }

    /// Report that the transport closed
    pub fn close(&self, error: Option<JocketError>) {
        self.emit(TransportEvent::Close(error));
    }

    /// Report an inbound packet
    pub fn packet(&self, packet: Packet) {
        self.emit(TransportEvent::Packet(packet));
    }

    /// Stop emitting; called by `Transport::close`
    pub fn silence(&self) {
        self.silenced.store(true, Ordering::Release);
    }

    /// Check if the sink was silenced
    pub fn is_silenced(&self) -> bool {
        self.silenced.load(Ordering::Acquire)
    }

    fn emit(&self, event: TransportEvent) {
        if self.is_silenced() {
            return;
        }
        // Receiver gone means the client already shut down
        let _ = self.tx.send(TransportSignal { id: self.id, event });
    }
}

/// Shared contract of all transports
///
/// Implementations must be driven from within a Tokio runtime; `open` and
/// `send_packet` spawn their I/O and never block.
pub trait Transport: Send {
    /// Which variant this is
    fn kind(&self) -> TransportKind;

    /// Begin establishing connectivity
    ///
    /// Eventually emits exactly one of `Open` or `Close` unless `close` is
    /// called first.
    fn open(&mut self);

    /// Terminate connectivity; idempotent, emits nothing afterwards
    fn close(&mut self);

    /// Best-known liveness of the underlying channel
    fn is_open(&self) -> bool;

    /// Send a packet, fire-and-forget
    fn send_packet(&mut self, packet: Packet);
}

/// Constructs transport instances by kind
///
/// The client calls this once per fallback attempt. Replace the default
/// factory to plug in custom transports or test doubles.
pub trait TransportFactory: Send + Sync {
    fn create(&self, kind: TransportKind, url: Url, sink: TransportSink) -> Box<dyn Transport>;
}
