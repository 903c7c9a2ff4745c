//! Session negotiated by the prepare request
//!
//! A session holds the server-assigned id and the ordered list of transports
//! the server offered, plus a cursor walking that list. The cursor starts
//! before the first candidate and only ever moves forward.

use crate::error::{JocketError, Result};
use crate::packet::Packet;
use serde_json::Value;
use std::time::Duration;

/// Upper bound on server-dictated ping interval and timeout
pub const MAX_SERVER_TIMING: Duration = Duration::from_secs(24 * 60 * 60);

/// Timing parameters dictated by a legacy server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTiming {
    pub upgradable: bool,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

/// One prepare cycle's worth of negotiated state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: String,
    candidates: Vec<String>,
    cursor: Option<usize>,
    timing: Option<ServerTiming>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            candidates,
            cursor: None,
            timing: None,
        }
    }

    /// Parse `{"sessionId": string, "transports": [string, ...]}`
    pub fn from_prepare_response(packet: &Packet) -> Result<Self> {
        let session_id = required_str(packet, "sessionId")?;

        let transports = packet
            .get("transports")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("transports", "an array of strings"))?;

        let candidates = transports
            .iter()
            .map(|t| t.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid("transports", "an array of strings"))?;

        Ok(Self::new(session_id, candidates))
    }

    /// Parse a legacy create response
    ///
    /// `{"sessionId", "upgradable", "pingInterval", "pingTimeout"}` with both
    /// durations in milliseconds. Legacy servers only speak polling.
    pub fn from_legacy_response(packet: &Packet) -> Result<Self> {
        let session_id = required_str(packet, "sessionId")?;
        let upgradable = packet
            .get("upgradable")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid("upgradable", "a boolean"))?;
        let ping_interval = required_millis(packet, "pingInterval")?;
        let ping_timeout = required_millis(packet, "pingTimeout")?;

        let mut session = Self::new(session_id, vec!["polling".to_string()]);
        session.timing = Some(ServerTiming {
            upgradable,
            ping_interval,
            ping_timeout,
        });
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Candidates in server-preferred order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Index of the candidate currently attempted
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn timing(&self) -> Option<ServerTiming> {
        self.timing
    }

    /// Move to the next candidate
    ///
    /// Returns `None` once the list is exhausted; the cursor keeps moving so
    /// no index is ever attempted twice.
    pub fn advance(&mut self) -> Option<&str> {
        let next = self.cursor.map_or(0, |i| i.saturating_add(1));
        self.cursor = Some(next);
        self.candidates.get(next).map(String::as_str)
    }
}

fn required_str(packet: &Packet, key: &str) -> Result<String> {
    packet
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "a string"))
}

/// A positive millisecond count that fits a `Duration`
fn required_millis(packet: &Packet, key: &str) -> Result<Duration> {
    let value = packet.get(key).ok_or_else(|| invalid(key, "a number"))?;
    let duration = match value.as_u64() {
        Some(ms) => Duration::from_millis(ms),
        None => value
            .as_f64()
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
            .ok_or_else(|| invalid(key, "a positive number"))?,
    };

    // Timers reject a zero period and overflow on absurd deadlines
    if duration.is_zero() || duration > MAX_SERVER_TIMING {
        return Err(invalid(key, "a positive number of at most one day"));
    }
    Ok(duration)
}

fn invalid(key: &str, expected: &str) -> JocketError {
    JocketError::Protocol(format!(
        "Invalid server response: `{}` must be {}",
        key, expected
    ))
}
