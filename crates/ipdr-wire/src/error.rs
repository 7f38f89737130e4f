use crate::kind::MessageKind;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame is shorter than its kind's layout requires.
    #[error("truncated frame: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// The header carries an unsupported protocol version.
    #[error("protocol version {found} not supported (expected {expected})")]
    VersionMismatch { expected: u8, found: u8 },

    /// The declared total length disagrees with the observed frame length.
    #[error("frame length mismatch: header declares {declared}, frame is {actual} bytes")]
    LengthMismatch { declared: u32, actual: usize },

    /// The kind byte does not map to a supported message kind.
    #[error("unsupported message kind 0x{0:02x}")]
    UnsupportedKind(u8),

    /// Encode was called on a receive-only kind, or decode on a send-only
    /// kind.
    #[error("{kind} cannot be {operation} by the collector")]
    WrongDirection {
        kind: MessageKind,
        operation: &'static str,
    },
}

impl WireError {
    /// True when this error must terminate the connection rather than drop
    /// the offending frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WireError::VersionMismatch { .. } | WireError::LengthMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
