//! Heartbeat ticker for open connections
//!
//! # Architecture
//!
//! Once the handshake completes the client spawns one ticker task:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. Send tick msg ──┼──> Client actor channel ──> {"type":"ping"} on transport
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The task never touches the transport itself; the actor owns it and sends
//! the ping when the tick arrives. The task stops when its [`TaskGuard`] is
//! dropped or the actor's channel closes.

use crate::timer::TaskGuard;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Deliver `tick` on `tx` every `interval`
///
/// The first tick fires one full interval after start. Missed ticks are
/// skipped rather than delivered in a burst.
pub async fn heartbeat_task<T>(interval: Duration, tick: T, tx: UnboundedSender<T>)
where
    T: Clone + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        ticker.tick().await;

        if tx.send(tick.clone()).is_err() {
            debug!("Heartbeat channel closed, shutting down heartbeat task");
            break;
        }
    }
}

/// Spawn a heartbeat ticker; dropping the guard stops it
pub fn spawn_heartbeat<T>(interval: Duration, tick: T, tx: UnboundedSender<T>) -> TaskGuard
where
    T: Clone + Send + 'static,
{
    TaskGuard::spawn(heartbeat_task(interval, tick, tx))
}
