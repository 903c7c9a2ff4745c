use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Close codes carried by a Jocket close reason
///
/// Numeric values match the codes used by Jocket servers, so they can be
/// logged or compared against server-side diagnostics directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure (user initiated)
    Normal = 1000,
    /// Client navigated away; reserved, never produced by this client
    Away = 1001,
    /// Network level failure of the transport
    Abnormal = 1006,
    /// The session id parameter was missing on the server
    NoSessionParam = 3600,
    /// The session was not found on the server
    SessionNotFound = 3601,
    /// The session could not be created
    CreateFailed = 3602,
    /// Every candidate transport failed to connect
    ConnectFailed = 3603,
    /// No pong within the keepalive bound
    PingTimeout = 3604,
    /// The polling loop failed
    PollingFailed = 3605,
}

impl CloseCode {
    /// Numeric wire value of this code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a close code by its numeric value
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1000 => Some(CloseCode::Normal),
            1001 => Some(CloseCode::Away),
            1006 => Some(CloseCode::Abnormal),
            3600 => Some(CloseCode::NoSessionParam),
            3601 => Some(CloseCode::SessionNotFound),
            3602 => Some(CloseCode::CreateFailed),
            3603 => Some(CloseCode::ConnectFailed),
            3604 => Some(CloseCode::PingTimeout),
            3605 => Some(CloseCode::PollingFailed),
            _ => None,
        }
    }

    /// True for codes meaning the server lost track of the session
    pub fn is_session_missing(self) -> bool {
        matches!(self, CloseCode::NoSessionParam | CloseCode::SessionNotFound)
    }

    fn description(self) -> &'static str {
        match self {
            CloseCode::Normal => "normal closure",
            CloseCode::Away => "client went away",
            CloseCode::Abnormal => "abnormal closure",
            CloseCode::NoSessionParam => "session parameter missing",
            CloseCode::SessionNotFound => "session not found",
            CloseCode::CreateFailed => "session creation failed",
            CloseCode::ConnectFailed => "all transports failed",
            CloseCode::PingTimeout => "ping timeout",
            CloseCode::PollingFailed => "polling failed",
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// JSON envelope encode/decode failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Packet could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// Bytes are not valid JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// Valid JSON, but neither an object nor an array
    #[error("Unexpected JSON shape: expected object or array, got {0}")]
    UnexpectedShape(&'static str),
}

/// Failure of a single HTTP request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The client-side request timeout elapsed
    #[error("Request timed out")]
    RequestTimeout,

    /// The underlying network call failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived with a status other than 200
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// The response body was not a valid envelope
    #[error(transparent)]
    Decode(#[from] CodecError),
}

impl HttpError {
    /// Check if this is the benign long-poll timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::RequestTimeout)
    }
}

/// Main error type for jocket
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JocketError {
    /// HTTP request failed (prepare, poll, send)
    #[error("Network error: {0}")]
    Network(#[from] HttpError),

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    Socket(String),

    /// Malformed or unexpected server response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No pong arrived within the handshake bound
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// Connection closed with a protocol close code
    #[error("Connection closed: {0}")]
    Closed(CloseCode),

    /// Configuration error (unknown transport, invalid URL, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Channel receive error
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),
}

impl JocketError {
    /// Close code that best describes this error
    pub fn close_code(&self) -> CloseCode {
        match self {
            JocketError::Closed(code) => *code,
            JocketError::Protocol(_) | JocketError::Configuration(_) => CloseCode::CreateFailed,
            JocketError::HandshakeTimeout(_) => CloseCode::PingTimeout,
            JocketError::Network(_)
            | JocketError::Socket(_)
            | JocketError::ChannelSend(_)
            | JocketError::ChannelReceive(_) => CloseCode::Abnormal,
        }
    }
}

/// Result type for jocket operations
pub type Result<T> = std::result::Result<T, JocketError>;
