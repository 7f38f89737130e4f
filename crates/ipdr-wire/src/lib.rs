//! Binary message codec for the IPDR collector protocol.
//!
//! Every message starts with an 8-byte header:
//!
//! ```text
//! ┌─────────────┬──────────┬─────────────┬───────────┬──────────────────┐
//! │ Version (1) │ Kind (1) │ Session (1) │ Flags (1) │ Length (4B BE)   │
//! └─────────────┴──────────┴─────────────┴───────────┴──────────────────┘
//! ```
//!
//! The length field is header-inclusive. All multi-byte integers are
//! big-endian; strings are a 4-byte big-endian length prefix followed by the
//! raw bytes.
//!
//! Messages form a closed set ([`Message`]) and each kind fixes its
//! direction. Encoding a receive-only kind or decoding a send-only kind is a
//! [`WireError::WrongDirection`] — directionality is a contract, not caller
//! discipline.

pub mod error;
pub mod header;
pub mod kind;
pub mod message;
pub mod strings;

pub use error::{Result, WireError};
pub use header::{Header, HEADER_SIZE, PROTOCOL_VERSION};
pub use kind::{Direction, MessageKind};
pub use message::{
    error_description, Connect, ConnectResponse, Data, DataAck, ErrorMessage, FieldDescriptor,
    FlowStart, FlowStop, GetSessions, GetSessionsResponse, KeepAlive, Message, SessionBlock,
    SessionStart, SessionStop, TemplateBlock, TemplateData, ERR_KEEPALIVE_EXPIRED,
    ERR_MSG_DECODE_ERROR, ERR_MSG_INVALID_FOR_CAPABILITIES, ERR_MSG_INVALID_FOR_STATE,
    ERR_PROCESS_TERMINATING, STRUCTURE_CAPABILITY,
};
pub use strings::{decode_string, encode_string};
