//! # Jocket core
//!
//! The client state machine and everything it drives:
//!
//! - **client**: the actor owning session, cursor, timers and transport
//! - **builder**: type-state builder, the base URL is required at compile time
//! - **transports**: WebSocket and HTTP long-polling implementations
//! - **codec / http**: JSON envelope and the reqwest-backed executor
//! - **timer / heartbeat / pong_tracker**: abort-on-drop timers and keepalive
//!
//! ## Example
//!
//! ```rust,ignore
//! use jocket::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = jocket::builder()
//!         .url("http://localhost:8080/jocket/chat/simple")
//!         .transports([TransportKind::WebSocket, TransportKind::Polling])
//!         .heartbeat_interval(Duration::from_secs(25))
//!         .build()
//!         .await?;
//!
//!     client.open()?;
//!     client.send_packet(data_packet(serde_json::json!({"content": "hello"})));
//!
//!     while let Ok(event) = client.recv_event() {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod connection_state;
pub mod endpoints;
pub mod heartbeat;
pub mod http;
pub mod pong_tracker;
pub mod session;
pub mod timer;
pub mod transports;

// Re-export main types
pub use builder::{states, JocketBuilder};
pub use client::{Jocket, JocketEvent, Metrics};
pub use config::{ClientConfig, PollingOptions, ProtocolProfile};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use http::ReqwestExecutor;
pub use pong_tracker::PongTracker;
pub use session::{ServerTiming, Session};
pub use timer::TaskGuard;
pub use transports::{DefaultTransportFactory, PollingTransport, WebSocketTransport};

/// Create a new Jocket client builder
///
/// # Example
/// ```ignore
/// let client = jocket::builder()
///     .url("http://localhost:8080/jocket/chat/simple")
///     .auto_reconnect(true)
///     .reconnect_strategy(ExponentialBackoff::new(
///         Duration::from_secs(1),
///         Duration::from_secs(60),
///         Some(10),
///     ))
///     .build()
///     .await?;
/// ```
pub fn builder() -> JocketBuilder<builder::states::NoUrl> {
    JocketBuilder::new()
}
