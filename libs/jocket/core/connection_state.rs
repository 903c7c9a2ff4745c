//! Lock-free connection phase and metrics
//!
//! Written only by the client actor, readable from any thread through the
//! client handle.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Phase of the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Never opened
    Idle = 0,
    /// Prepare request in flight
    Preparing = 1,
    /// A transport was constructed and is connecting
    Connecting = 2,
    /// Transport open, handshake ping sent, waiting for pong
    AwaitingPong = 3,
    /// Handshake complete
    Open = 4,
    /// Closed; `open()` starts a fresh cycle
    Closed = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Preparing,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::AwaitingPong,
            4 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    /// Phases between `open()` and the first pong
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            ConnectionState::Preparing | ConnectionState::Connecting | ConnectionState::AwaitingPong
        )
    }

    /// Phases from which `open()` may start a new cycle
    pub fn is_inactive(self) -> bool {
        matches!(self, ConnectionState::Idle | ConnectionState::Closed)
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

/// Client counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    transport_attempts: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one transport construction
    pub fn increment_attempts(&self) {
        self.transport_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn transport_attempts(&self) -> u64 {
        self.transport_attempts.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}
