use crate::error::JocketError;
use crate::packet::Packet;

/// Callback surface for connection events
///
/// Register a handler on the builder to have events delivered on a dedicated
/// thread instead of pulling them from the client's event channel. Every
/// method has a no-op default; implement only what you need.
///
/// # Example
/// ```ignore
/// struct Printer;
///
/// impl EventHandler for Printer {
///     fn on_packet(&mut self, packet: Packet) {
///         println!("recv: {:?}", packet);
///     }
/// }
/// ```
pub trait EventHandler: Send + 'static {
    /// The handshake completed and the connection is open
    fn on_open(&mut self) {}

    /// The connection closed
    ///
    /// `None` means the server closed the session gracefully.
    fn on_close(&mut self, _error: Option<JocketError>) {}

    /// An application packet arrived
    fn on_packet(&mut self, _packet: Packet) {}
}
