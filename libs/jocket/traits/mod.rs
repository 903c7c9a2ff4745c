//! # Jocket Traits
//!
//! Contracts and shared types of the Jocket client:
//!
//! - **Transport / TransportFactory**: the data channel abstraction
//! - **HttpExecutor**: one HTTP request in, one decoded packet out
//! - **EventHandler**: callback surface for open/close/packet events
//! - **HeaderProvider**: extra headers for every request
//! - **ReconnectionStrategy**: the (opt-in) reconnect policy
//!
//! ## Example
//!
//! ```rust,ignore
//! use jocket::traits::*;
//!
//! struct Printer;
//!
//! impl EventHandler for Printer {
//!     fn on_packet(&mut self, packet: Packet) {
//!         println!("{:?}", packet);
//!     }
//! }
//! ```

pub mod error;
pub mod executor;
pub mod handler;
pub mod headers;
pub mod packet;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{CloseCode, CodecError, HttpError, JocketError, Result};
pub use executor::{HttpExecutor, HttpMethod, HttpRequest};
pub use handler::EventHandler;
pub use headers::{HeaderProvider, Headers, NoHeaders, StaticHeaders};
pub use packet::{control_type, data_packet, packet_type, ControlType, Packet, DATA_KEY, TYPE_KEY};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
pub use transport::{
    Transport, TransportEvent, TransportFactory, TransportId, TransportKind, TransportSignal,
    TransportSink,
};
