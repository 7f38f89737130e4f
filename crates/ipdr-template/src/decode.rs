//! Per-field decoders. All multi-byte integers are big-endian; variable
//! fields carry a 4-byte big-endian length prefix.

use std::fmt::Write;

use crate::error::{Result, TemplateError};
use crate::types::FieldType;

/// Fixed on-wire width of a field type, or `None` for length-prefixed
/// variable types.
pub fn field_width(field_type: FieldType) -> Option<usize> {
    match field_type {
        FieldType::Boolean | FieldType::Byte | FieldType::UByte => Some(1),
        FieldType::Short | FieldType::UShort => Some(2),
        FieldType::Int
        | FieldType::UInt
        | FieldType::Float
        | FieldType::DateTime
        | FieldType::Ipv4Addr => Some(4),
        FieldType::Long
        | FieldType::ULong
        | FieldType::Double
        | FieldType::DateTimeMsec
        | FieldType::DateTimeUsec
        | FieldType::MacAddr => Some(8),
        FieldType::Ipv6Addr | FieldType::Uuid => Some(20),
        FieldType::HexBinary | FieldType::String | FieldType::IpAddr => None,
    }
}

/// Decode one field from the front of `src`, returning its text rendering
/// and the number of bytes consumed.
pub fn decode_field(field_type: FieldType, src: &[u8]) -> Result<(String, usize)> {
    match field_type {
        FieldType::Int => {
            let raw = need(src, 4)?;
            Ok((i32::from_be_bytes(arr4(raw)).to_string(), 4))
        }
        FieldType::UInt | FieldType::DateTime => {
            let raw = need(src, 4)?;
            Ok((u32::from_be_bytes(arr4(raw)).to_string(), 4))
        }
        FieldType::Long => {
            let raw = need(src, 8)?;
            Ok((i64::from_be_bytes(arr8(raw)).to_string(), 8))
        }
        FieldType::ULong | FieldType::DateTimeMsec | FieldType::DateTimeUsec => {
            let raw = need(src, 8)?;
            Ok((u64::from_be_bytes(arr8(raw)).to_string(), 8))
        }
        FieldType::Float => {
            let raw = need(src, 4)?;
            Ok((format!("{:.6}", f32::from_be_bytes(arr4(raw))), 4))
        }
        FieldType::Double => {
            let raw = need(src, 8)?;
            Ok((format!("{:.6}", f64::from_be_bytes(arr8(raw))), 8))
        }
        FieldType::Boolean => {
            let raw = need(src, 1)?;
            Ok(((if raw[0] == 0 { "false" } else { "true" }).to_string(), 1))
        }
        FieldType::Byte => {
            let raw = need(src, 1)?;
            Ok(((raw[0] as i8).to_string(), 1))
        }
        FieldType::UByte => {
            let raw = need(src, 1)?;
            Ok((raw[0].to_string(), 1))
        }
        FieldType::Short => {
            let raw = need(src, 2)?;
            Ok((i16::from_be_bytes([raw[0], raw[1]]).to_string(), 2))
        }
        FieldType::UShort => {
            let raw = need(src, 2)?;
            Ok((u16::from_be_bytes([raw[0], raw[1]]).to_string(), 2))
        }
        FieldType::Ipv4Addr => {
            let raw = need(src, 4)?;
            Ok((render_ipv4(raw), 4))
        }
        FieldType::Ipv6Addr => {
            // 4-byte prefix, then the 16 address bytes.
            let raw = need(src, 20)?;
            Ok((render_ipv6(&raw[4..20]), 20))
        }
        FieldType::Uuid => {
            // 4-byte prefix, then the 16 value bytes.
            let raw = need(src, 20)?;
            Ok((render_uuid(&raw[4..20]), 20))
        }
        FieldType::MacAddr => {
            // 2-byte prefix, then the 6 address bytes.
            let raw = need(src, 8)?;
            Ok((render_mac(&raw[2..8]), 8))
        }
        FieldType::HexBinary => {
            let (raw, consumed) = need_prefixed(src)?;
            Ok((render_hex(raw), consumed))
        }
        FieldType::String => {
            let (raw, consumed) = need_prefixed(src)?;
            Ok((String::from_utf8_lossy(raw).into_owned(), consumed))
        }
        FieldType::IpAddr => {
            let (raw, consumed) = need_prefixed(src)?;
            let text = match raw.len() {
                4 => render_ipv4(raw),
                16 => render_ipv6(raw),
                _ => render_hex(raw),
            };
            Ok((text, consumed))
        }
    }
}

fn need(src: &[u8], n: usize) -> Result<&[u8]> {
    if src.len() < n {
        return Err(TemplateError::RecordExhausted {
            needed: n,
            have: src.len(),
        });
    }
    Ok(&src[..n])
}

fn need_prefixed(src: &[u8]) -> Result<(&[u8], usize)> {
    let prefix = need(src, 4)?;
    let len = u32::from_be_bytes(arr4(prefix)) as usize;
    let total = 4 + len;
    if src.len() < total {
        return Err(TemplateError::RecordExhausted {
            needed: total,
            have: src.len(),
        });
    }
    Ok((&src[4..total], total))
}

fn arr4(src: &[u8]) -> [u8; 4] {
    src[..4].try_into().expect("slice is 4 bytes")
}

fn arr8(src: &[u8]) -> [u8; 8] {
    src[..8].try_into().expect("slice is 8 bytes")
}

fn render_ipv4(octets: &[u8]) -> String {
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

fn render_ipv6(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(39);
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        let group = u16::from_be_bytes([pair[0], pair[1]]);
        let _ = write!(out, "{group:02x}");
    }
    out
}

fn render_uuid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn render_mac(bytes: &[u8]) -> String {
    format!(
        "{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}

fn render_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 3);
    out.push('[');
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out.push(']');
    out
}
