//! Reconnection policy
//!
//! The client never reconnects on its own. When `auto_reconnect` is enabled
//! on the builder and an *established* session is lost (transport failure or
//! keepalive timeout after the handshake), the client asks its strategy for a
//! delay and, if one is given, starts a fresh prepare cycle after it. User
//! and server initiated closes never trigger a reconnect.

use std::time::Duration;

/// Trait for defining reconnection strategies
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before reconnection attempt number `attempt` (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - start a new session after this delay
    /// * `None` - give up; the last close stands
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Reset internal state; called once a session opens
    fn reset(&mut self);

    /// Check if attempt number `attempt` is allowed at all
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Delays doubling from `initial_delay`, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// # Arguments
    /// * `initial_delay` - delay before the first attempt
    /// * `max_delay` - upper bound for any delay
    /// * `max_attempts` - `None` for unlimited attempts
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|exp| 2u32.checked_pow(exp))
            .unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// The same delay before every attempt
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        self.should_reconnect(attempt).then_some(self.delay)
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect; the default
#[derive(Debug, Clone, Default)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
