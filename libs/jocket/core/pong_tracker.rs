//! Pong tracker for the optional strict keepalive
//!
//! After the handshake, the protocol itself only relies on the transport's
//! own close signal to notice a dead connection. When a pong timeout is
//! configured the client additionally records every heartbeat ping and every
//! pong, and treats the session as lost once a ping stays unanswered for
//! longer than the timeout.

use std::time::{Duration, Instant};

/// Tracks ping/pong timestamps of one open session
///
/// Owned by the client actor; no synchronization needed.
#[derive(Debug)]
pub struct PongTracker {
    last_ping_sent: Option<Instant>,
    last_pong_received: Option<Instant>,
    timeout: Duration,
}

impl PongTracker {
    /// Create a tracker that tolerates `timeout` between ping and pong
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_ping_sent: None,
            last_pong_received: None,
            timeout,
        }
    }

    /// Record that a ping was just sent
    pub fn record_ping_sent(&mut self) {
        self.last_ping_sent = Some(Instant::now());
    }

    /// Record that a pong was just received
    pub fn record_pong_received(&mut self) {
        self.last_pong_received = Some(Instant::now());
    }

    /// Check if the connection appears healthy
    ///
    /// Healthy when no ping is outstanding, when a pong arrived after the
    /// last ping, or while the timeout since the last ping has not elapsed.
    pub fn is_healthy(&self) -> bool {
        let Some(ping) = self.last_ping_sent else {
            return true;
        };

        if self.last_pong_received.is_some_and(|pong| pong >= ping) {
            return true;
        }

        ping.elapsed() < self.timeout
    }

    /// Time since the last pong, if any arrived
    pub fn time_since_last_pong(&self) -> Option<Duration> {
        self.last_pong_received.map(|pong| pong.elapsed())
    }

    /// The configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
