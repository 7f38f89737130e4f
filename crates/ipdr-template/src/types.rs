use crate::error::{Result, TemplateError};

/// The supported field types, keyed by the numeric identifiers templates
/// carry on the wire.
///
/// The low byte encodes the base width class; the high bits distinguish
/// derived types (timestamps, addresses) that share a base encoding but
/// render differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    HexBinary,
    String,
    Boolean,
    Byte,
    UByte,
    Short,
    UShort,
    DateTime,
    DateTimeMsec,
    DateTimeUsec,
    Ipv4Addr,
    Ipv6Addr,
    IpAddr,
    Uuid,
    MacAddr,
}

impl FieldType {
    /// Map a wire type identifier to a supported type.
    pub fn from_u32(id: u32) -> Result<Self> {
        match id {
            0x21 => Ok(Self::Int),
            0x22 => Ok(Self::UInt),
            0x23 => Ok(Self::Long),
            0x24 => Ok(Self::ULong),
            0x25 => Ok(Self::Float),
            0x26 => Ok(Self::Double),
            0x27 => Ok(Self::HexBinary),
            0x28 => Ok(Self::String),
            0x29 => Ok(Self::Boolean),
            0x2a => Ok(Self::Byte),
            0x2b => Ok(Self::UByte),
            0x2c => Ok(Self::Short),
            0x2d => Ok(Self::UShort),
            0x122 => Ok(Self::DateTime),
            0x224 => Ok(Self::DateTimeMsec),
            0x322 => Ok(Self::Ipv4Addr),
            0x427 => Ok(Self::Ipv6Addr),
            0x527 => Ok(Self::Uuid),
            0x623 => Ok(Self::DateTimeUsec),
            0x723 => Ok(Self::MacAddr),
            0x827 => Ok(Self::IpAddr),
            other => Err(TemplateError::UnknownFieldType(other)),
        }
    }
}
