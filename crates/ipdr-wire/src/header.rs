use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::kind::MessageKind;

/// Header size: version (1) + kind (1) + session (1) + flags (1) + length (4).
pub const HEADER_SIZE: usize = 8;

/// The protocol version this collector speaks.
pub const PROTOCOL_VERSION: u8 = 2;

/// Offset of the big-endian total-length field.
const LENGTH_OFFSET: usize = 4;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub kind: u8,
    pub session_id: u8,
    pub flags: u8,
    pub length: u32,
}

impl Header {
    /// Parse the fixed header and run the pre-dispatch sanity checks:
    /// minimum size, supported version, declared length against the
    /// observed frame length.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < HEADER_SIZE {
            return Err(WireError::Truncated {
                needed: HEADER_SIZE,
                have: frame.len(),
            });
        }

        let header = Self {
            version: frame[0],
            kind: frame[1],
            session_id: frame[2],
            flags: frame[3],
            length: u32::from_be_bytes(frame[4..8].try_into().expect("slice is 4 bytes")),
        };

        if header.version != PROTOCOL_VERSION {
            return Err(WireError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: header.version,
            });
        }

        if header.length as usize != frame.len() {
            return Err(WireError::LengthMismatch {
                declared: header.length,
                actual: frame.len(),
            });
        }

        Ok(header)
    }
}

/// Append a header with a zeroed length field; the length is patched by
/// [`patch_length`] once the payload is serialized.
pub fn put_header(dst: &mut BytesMut, kind: MessageKind, session_id: u8) {
    dst.put_u8(PROTOCOL_VERSION);
    dst.put_u8(kind.as_u8());
    dst.put_u8(session_id);
    dst.put_u8(0); // flags
    dst.put_u32(0); // patched after payload serialization
}

/// Write the final encoded size into the header's length field.
pub fn patch_length(frame: &mut BytesMut) {
    let total = frame.len() as u32;
    frame[LENGTH_OFFSET..LENGTH_OFFSET + 4].copy_from_slice(&total.to_be_bytes());
}
