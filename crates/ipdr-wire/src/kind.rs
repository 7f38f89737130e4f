use std::fmt;

/// Direction of travel for a message kind.
///
/// The collector is the client side; "send" means collector → exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Collector → exporter only.
    SendOnly,
    /// Exporter → collector only.
    ReceiveOnly,
    /// Either direction.
    Bidirectional,
}

/// The closed set of supported message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    FlowStart = 0x01,
    FlowStop = 0x03,
    Connect = 0x05,
    ConnectResponse = 0x06,
    Disconnect = 0x07,
    SessionStart = 0x08,
    SessionStop = 0x09,
    TemplateData = 0x10,
    FinalTemplateDataAck = 0x13,
    GetSessions = 0x14,
    GetSessionsResponse = 0x15,
    Data = 0x20,
    DataAck = 0x21,
    Error = 0x23,
    KeepAlive = 0x40,
}

impl MessageKind {
    /// Map a raw kind byte to a supported kind.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::FlowStart),
            0x03 => Some(Self::FlowStop),
            0x05 => Some(Self::Connect),
            0x06 => Some(Self::ConnectResponse),
            0x07 => Some(Self::Disconnect),
            0x08 => Some(Self::SessionStart),
            0x09 => Some(Self::SessionStop),
            0x10 => Some(Self::TemplateData),
            0x13 => Some(Self::FinalTemplateDataAck),
            0x14 => Some(Self::GetSessions),
            0x15 => Some(Self::GetSessionsResponse),
            0x20 => Some(Self::Data),
            0x21 => Some(Self::DataAck),
            0x23 => Some(Self::Error),
            0x40 => Some(Self::KeepAlive),
            _ => None,
        }
    }

    /// The raw wire byte for this kind.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Which way this kind travels.
    pub fn direction(self) -> Direction {
        match self {
            Self::FlowStart
            | Self::FlowStop
            | Self::Connect
            | Self::Disconnect
            | Self::FinalTemplateDataAck
            | Self::GetSessions
            | Self::DataAck => Direction::SendOnly,
            Self::ConnectResponse
            | Self::SessionStart
            | Self::SessionStop
            | Self::TemplateData
            | Self::GetSessionsResponse
            | Self::Data => Direction::ReceiveOnly,
            Self::Error | Self::KeepAlive => Direction::Bidirectional,
        }
    }

    /// Protocol name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::FlowStart => "FLOW_START",
            Self::FlowStop => "FLOW_STOP",
            Self::Connect => "CONNECT",
            Self::ConnectResponse => "CONNECT_RESPONSE",
            Self::Disconnect => "DISCONNECT",
            Self::SessionStart => "SESSION_START",
            Self::SessionStop => "SESSION_STOP",
            Self::TemplateData => "TEMPLATE_DATA",
            Self::FinalTemplateDataAck => "FINAL_TEMPLATE_DATA_ACK",
            Self::GetSessions => "GET_SESSIONS",
            Self::GetSessionsResponse => "GET_SESSIONS_RESPONSE",
            Self::Data => "DATA",
            Self::DataAck => "DATA_ACK",
            Self::Error => "ERROR",
            Self::KeepAlive => "KEEP_ALIVE",
        }
    }

    /// True when the collector may encode this kind.
    pub fn encodable(self) -> bool {
        self.direction() != Direction::ReceiveOnly
    }

    /// True when the collector may decode this kind.
    pub fn decodable(self) -> bool {
        self.direction() != Direction::SendOnly
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
