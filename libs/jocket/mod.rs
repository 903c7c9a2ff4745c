//! # Jocket
//!
//! Client for the Jocket real-time messaging protocol: a prepare request
//! negotiates a session and an ordered list of transports, the client tries
//! them in order (WebSocket, HTTP long-polling) until one completes the
//! ping/pong handshake, then keeps it alive with a heartbeat.
//!
//! ## Features
//!
//! - **Single-owner actor**: one tokio task owns all connection state
//! - **Transport fallback**: server-ordered candidates, bounded handshake per attempt
//! - **Type-state builder**: the base URL is required at compile time
//! - **Lock-free observation**: atomic connection phase and metrics
//! - **Pluggable seams**: HTTP executor, transport factory, headers, reconnect policy

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use crate::core::{
    builder, client, codec, config, connection_state, endpoints, heartbeat, http, pong_tracker,
    session, timer, transports,
    builder::{states, JocketBuilder},
    client::{Jocket, JocketEvent, Metrics},
    config::{ClientConfig, PollingOptions, ProtocolProfile},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    http::ReqwestExecutor,
    transports::DefaultTransportFactory,
};

// Convenience function
pub use crate::core::builder as client_builder;
