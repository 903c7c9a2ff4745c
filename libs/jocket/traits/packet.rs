use serde_json::{Map, Value};

/// A Jocket packet: one JSON object
///
/// Packets are ephemeral messages; key order carries no meaning.
pub type Packet = Map<String, Value>;

/// Reserved key carrying the control type of a packet
pub const TYPE_KEY: &str = "type";

/// Conventional key for application payloads
pub const DATA_KEY: &str = "data";

/// Control packet types reserved by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Ping,
    Pong,
    Open,
    Close,
}

impl ControlType {
    /// Wire value of the `type` field
    pub fn as_str(self) -> &'static str {
        match self {
            ControlType::Ping => "ping",
            ControlType::Pong => "pong",
            ControlType::Open => "open",
            ControlType::Close => "close",
        }
    }

    /// Parse a `type` value; unknown values are not control packets
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ping" => Some(ControlType::Ping),
            "pong" => Some(ControlType::Pong),
            "open" => Some(ControlType::Open),
            "close" => Some(ControlType::Close),
            _ => None,
        }
    }

    /// Build the control packet `{"type": <self>}`
    pub fn packet(self) -> Packet {
        let mut packet = Packet::new();
        packet.insert(TYPE_KEY.to_string(), Value::String(self.as_str().to_string()));
        packet
    }
}

/// Build an application packet `{"data": <data>}`
pub fn data_packet(data: impl Into<Value>) -> Packet {
    let mut packet = Packet::new();
    packet.insert(DATA_KEY.to_string(), data.into());
    packet
}

/// The `type` field of a packet, if it is a string
pub fn packet_type(packet: &Packet) -> Option<&str> {
    packet.get(TYPE_KEY).and_then(Value::as_str)
}

/// The control type of a packet, if it carries a reserved one
pub fn control_type(packet: &Packet) -> Option<ControlType> {
    packet_type(packet).and_then(ControlType::parse)
}
