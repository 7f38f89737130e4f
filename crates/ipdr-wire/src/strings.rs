//! Length-prefixed string codec: 4-byte big-endian length followed by
//! exactly that many raw bytes. The length excludes the prefix itself.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Append a length-prefixed string.
pub fn encode_string(dst: &mut BytesMut, value: &str) {
    dst.put_u32(value.len() as u32);
    dst.put_slice(value.as_bytes());
}

/// Decode a length-prefixed string, returning the text and the total bytes
/// consumed (prefix included). Non-UTF-8 bytes are replaced, not rejected —
/// exporter-supplied names end up in log lines and CSV headers either way.
pub fn decode_string(src: &[u8]) -> Result<(String, usize)> {
    if src.len() < 4 {
        return Err(WireError::Truncated {
            needed: 4,
            have: src.len(),
        });
    }

    let len = u32::from_be_bytes(src[..4].try_into().expect("slice is 4 bytes")) as usize;
    let total = 4 + len;
    if src.len() < total {
        return Err(WireError::Truncated {
            needed: total,
            have: src.len(),
        });
    }

    let text = String::from_utf8_lossy(&src[4..total]).into_owned();
    Ok((text, total))
}
