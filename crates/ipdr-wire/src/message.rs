use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::header::{patch_length, put_header, Header, HEADER_SIZE};
use crate::kind::{Direction, MessageKind};
use crate::strings::{decode_string, encode_string};

/// Capability bit for template-structured data, the only mode this
/// collector speaks.
pub const STRUCTURE_CAPABILITY: u32 = 2;

/// ERROR code: peer silence exceeded the keepalive window.
pub const ERR_KEEPALIVE_EXPIRED: u16 = 0;
/// ERROR code: message not valid for the negotiated capabilities.
pub const ERR_MSG_INVALID_FOR_CAPABILITIES: u16 = 1;
/// ERROR code: message not valid in the current protocol state.
pub const ERR_MSG_INVALID_FOR_STATE: u16 = 2;
/// ERROR code: message failed to decode.
pub const ERR_MSG_DECODE_ERROR: u16 = 3;
/// ERROR code: the sending process is terminating.
pub const ERR_PROCESS_TERMINATING: u16 = 4;

/// Canonical description for a predefined ERROR code.
pub fn error_description(code: u16) -> Option<&'static str> {
    match code {
        ERR_KEEPALIVE_EXPIRED => Some("KeepAlive expired"),
        ERR_MSG_INVALID_FOR_CAPABILITIES => Some("Message invalid for capabilities"),
        ERR_MSG_INVALID_FOR_STATE => Some("Message invalid for state"),
        ERR_MSG_DECODE_ERROR => Some("Message decode error"),
        ERR_PROCESS_TERMINATING => Some("Process terminating"),
        _ => None,
    }
}

/// CONNECT — collector introduces itself and requests a keepalive interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub session_id: u8,
    /// Collector address as a big-endian packed IPv4.
    pub initiator_address: u32,
    pub initiator_port: u16,
    pub capabilities: u32,
    pub keepalive_interval: u32,
    pub vendor_id: String,
}

/// CONNECT_RESPONSE — exporter's negotiated capabilities and keepalive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub session_id: u8,
    pub capabilities: u32,
    pub keepalive_interval: u32,
    pub vendor_id: String,
}

/// FLOW_STOP — collector stops a record flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStop {
    pub session_id: u8,
    pub reason_code: u16,
    pub reason_info: String,
}

/// SESSION_START — exporter activates a session and carries ack policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub session_id: u8,
    pub exporter_boot_time: u32,
    pub first_record_sequence: u64,
    pub dropped_record_count: u64,
    pub primary: u8,
    pub ack_time_interval: u32,
    pub ack_sequence_interval: u32,
    pub document_id: [u8; 16],
}

/// SESSION_STOP — exporter deactivates a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStop {
    pub session_id: u8,
    pub reason_code: u16,
    pub reason_info: String,
}

/// One field of a template: how a record column decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub type_id: u32,
    pub field_id: u32,
    pub name: String,
    pub enabled: bool,
}

/// One template: the ordered field layout of a session's DATA records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBlock {
    pub template_id: u16,
    pub schema_name: String,
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
}

/// TEMPLATE_DATA — exporter declares the templates for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    pub session_id: u8,
    pub config_id: u16,
    pub flags: u8,
    pub templates: Vec<TemplateBlock>,
}

/// GET_SESSIONS — collector asks which sessions the exporter offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSessions {
    pub session_id: u8,
    pub request_id: u16,
}

/// One advertised session in a GET_SESSIONS_RESPONSE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBlock {
    pub session_id: u8,
    pub reserved: u8,
    pub name: String,
    pub description: String,
    pub ack_time_interval: u32,
    pub ack_sequence_interval: u32,
}

/// GET_SESSIONS_RESPONSE — the exporter's session catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSessionsResponse {
    pub session_id: u8,
    pub request_id: u16,
    pub block_length: u32,
    pub sessions: Vec<SessionBlock>,
}

/// DATA — one template-described record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub session_id: u8,
    pub template_id: u16,
    pub config_id: u16,
    pub flags: u8,
    pub sequence: u64,
    pub record: Bytes,
}

/// DATA_ACK — collector acknowledges records up to a sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAck {
    pub session_id: u8,
    pub config_id: u16,
    pub sequence: u64,
}

/// ERROR — protocol-level error report, either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub session_id: u8,
    pub timestamp: u32,
    pub code: u16,
    pub description: String,
}

impl ErrorMessage {
    /// Build an ERROR for a predefined code with its canonical description
    /// and the current time.
    pub fn with_code(code: u16) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self {
            session_id: 0,
            timestamp,
            code,
            description: error_description(code).unwrap_or_default().to_string(),
        }
    }
}

/// KEEP_ALIVE — liveness probe, either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub session_id: u8,
}

/// FLOW_START — collector opens a record flow for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStart {
    pub session_id: u8,
}

/// The closed set of protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    FlowStart(FlowStart),
    FlowStop(FlowStop),
    Connect(Connect),
    ConnectResponse(ConnectResponse),
    Disconnect { session_id: u8 },
    SessionStart(SessionStart),
    SessionStop(SessionStop),
    TemplateData(TemplateData),
    FinalTemplateDataAck { session_id: u8 },
    GetSessions(GetSessions),
    GetSessionsResponse(GetSessionsResponse),
    Data(Data),
    DataAck(DataAck),
    Error(ErrorMessage),
    KeepAlive(KeepAlive),
}

impl Message {
    /// The wire kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::FlowStart(_) => MessageKind::FlowStart,
            Message::FlowStop(_) => MessageKind::FlowStop,
            Message::Connect(_) => MessageKind::Connect,
            Message::ConnectResponse(_) => MessageKind::ConnectResponse,
            Message::Disconnect { .. } => MessageKind::Disconnect,
            Message::SessionStart(_) => MessageKind::SessionStart,
            Message::SessionStop(_) => MessageKind::SessionStop,
            Message::TemplateData(_) => MessageKind::TemplateData,
            Message::FinalTemplateDataAck { .. } => MessageKind::FinalTemplateDataAck,
            Message::GetSessions(_) => MessageKind::GetSessions,
            Message::GetSessionsResponse(_) => MessageKind::GetSessionsResponse,
            Message::Data(_) => MessageKind::Data,
            Message::DataAck(_) => MessageKind::DataAck,
            Message::Error(_) => MessageKind::Error,
            Message::KeepAlive(_) => MessageKind::KeepAlive,
        }
    }

    /// The header session id this message carries.
    pub fn session_id(&self) -> u8 {
        match self {
            Message::FlowStart(m) => m.session_id,
            Message::FlowStop(m) => m.session_id,
            Message::Connect(m) => m.session_id,
            Message::ConnectResponse(m) => m.session_id,
            Message::Disconnect { session_id } => *session_id,
            Message::SessionStart(m) => m.session_id,
            Message::SessionStop(m) => m.session_id,
            Message::TemplateData(m) => m.session_id,
            Message::FinalTemplateDataAck { session_id } => *session_id,
            Message::GetSessions(m) => m.session_id,
            Message::GetSessionsResponse(m) => m.session_id,
            Message::Data(m) => m.session_id,
            Message::DataAck(m) => m.session_id,
            Message::Error(m) => m.session_id,
            Message::KeepAlive(m) => m.session_id,
        }
    }

    /// Short human-readable description for log lines.
    pub fn describe(&self) -> String {
        match self {
            Message::Data(m) => {
                format!("DATA - session: {}, seq: {}", m.session_id, m.sequence)
            }
            Message::DataAck(m) => {
                format!("DATA_ACK - session: {}, seq: {}", m.session_id, m.sequence)
            }
            Message::Error(m) => format!(
                "ERROR - {}, time: {}, code: {}",
                m.description, m.timestamp, m.code
            ),
            other => format!("{} - session: {}", other.kind(), other.session_id()),
        }
    }

    /// Encode this message into one complete frame.
    ///
    /// Fails with [`WireError::WrongDirection`] for receive-only kinds.
    pub fn encode(&self) -> Result<Bytes> {
        let kind = self.kind();
        if kind.direction() == Direction::ReceiveOnly {
            return Err(WireError::WrongDirection {
                kind,
                operation: "encoded",
            });
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + 32);
        put_header(&mut buf, kind, self.session_id());

        match self {
            Message::Connect(m) => {
                buf.put_u32(m.initiator_address);
                buf.put_u16(m.initiator_port);
                buf.put_u32(m.capabilities);
                buf.put_u32(m.keepalive_interval);
                encode_string(&mut buf, &m.vendor_id);
            }
            Message::FlowStop(m) => {
                buf.put_u16(m.reason_code);
                encode_string(&mut buf, &m.reason_info);
            }
            Message::GetSessions(m) => {
                buf.put_u16(m.request_id);
            }
            Message::DataAck(m) => {
                buf.put_u16(m.config_id);
                buf.put_u64(m.sequence);
            }
            Message::Error(m) => {
                buf.put_u32(m.timestamp);
                buf.put_u16(m.code);
                encode_string(&mut buf, &m.description);
            }
            Message::FlowStart(_)
            | Message::Disconnect { .. }
            | Message::FinalTemplateDataAck { .. }
            | Message::KeepAlive(_) => {}
            // Receive-only kinds were rejected above.
            Message::ConnectResponse(_)
            | Message::SessionStart(_)
            | Message::SessionStop(_)
            | Message::TemplateData(_)
            | Message::GetSessionsResponse(_)
            | Message::Data(_) => unreachable!("receive-only kind passed direction check"),
        }

        patch_length(&mut buf);
        Ok(buf.freeze())
    }

    /// Decode one complete frame.
    ///
    /// Runs the header sanity checks, then dispatches on the kind byte.
    /// Fails with [`WireError::WrongDirection`] for send-only kinds and
    /// [`WireError::UnsupportedKind`] for kind bytes outside the closed set.
    pub fn decode(frame: &[u8]) -> Result<Message> {
        let header = Header::decode(frame)?;
        let kind =
            MessageKind::from_u8(header.kind).ok_or(WireError::UnsupportedKind(header.kind))?;
        if kind.direction() == Direction::SendOnly {
            return Err(WireError::WrongDirection {
                kind,
                operation: "decoded",
            });
        }

        let mut r = Cursor::new(frame, HEADER_SIZE);
        let session_id = header.session_id;

        let message = match kind {
            MessageKind::ConnectResponse => {
                let capabilities = r.u32()?;
                let keepalive_interval = r.u32()?;
                let (vendor_id, _) = r.string()?;
                Message::ConnectResponse(ConnectResponse {
                    session_id,
                    capabilities,
                    keepalive_interval,
                    vendor_id,
                })
            }
            MessageKind::SessionStart => {
                let exporter_boot_time = r.u32()?;
                let first_record_sequence = r.u64()?;
                let dropped_record_count = r.u64()?;
                let primary = r.u8()?;
                let ack_time_interval = r.u32()?;
                let ack_sequence_interval = r.u32()?;
                let document_id = r
                    .take(16)?
                    .try_into()
                    .expect("take(16) yields 16 bytes");
                Message::SessionStart(SessionStart {
                    session_id,
                    exporter_boot_time,
                    first_record_sequence,
                    dropped_record_count,
                    primary,
                    ack_time_interval,
                    ack_sequence_interval,
                    document_id,
                })
            }
            MessageKind::SessionStop => {
                let reason_code = r.u16()?;
                let (reason_info, _) = r.string()?;
                Message::SessionStop(SessionStop {
                    session_id,
                    reason_code,
                    reason_info,
                })
            }
            MessageKind::TemplateData => {
                let config_id = r.u16()?;
                let flags = r.u8()?;
                let template_count = r.u32()?;
                let mut templates = Vec::with_capacity(template_count.min(64) as usize);
                for _ in 0..template_count {
                    templates.push(decode_template_block(&mut r)?);
                }
                Message::TemplateData(TemplateData {
                    session_id,
                    config_id,
                    flags,
                    templates,
                })
            }
            MessageKind::GetSessionsResponse => {
                let request_id = r.u16()?;
                let block_length = r.u32()?;
                let mut sessions = Vec::new();
                while r.remaining() > 0 {
                    sessions.push(decode_session_block(&mut r)?);
                }
                Message::GetSessionsResponse(GetSessionsResponse {
                    session_id,
                    request_id,
                    block_length,
                    sessions,
                })
            }
            MessageKind::Data => {
                let template_id = r.u16()?;
                let config_id = r.u16()?;
                let flags = r.u8()?;
                let sequence = r.u64()?;
                let record = Bytes::copy_from_slice(r.rest());
                Message::Data(Data {
                    session_id,
                    template_id,
                    config_id,
                    flags,
                    sequence,
                    record,
                })
            }
            MessageKind::Error => {
                let timestamp = r.u32()?;
                let code = r.u16()?;
                let (description, _) = r.string()?;
                Message::Error(ErrorMessage {
                    session_id,
                    timestamp,
                    code,
                    description,
                })
            }
            MessageKind::KeepAlive => Message::KeepAlive(KeepAlive { session_id }),
            // Send-only kinds were rejected above.
            MessageKind::FlowStart
            | MessageKind::FlowStop
            | MessageKind::Connect
            | MessageKind::Disconnect
            | MessageKind::FinalTemplateDataAck
            | MessageKind::GetSessions
            | MessageKind::DataAck => unreachable!("send-only kind passed direction check"),
        };

        Ok(message)
    }
}

fn decode_template_block(r: &mut Cursor<'_>) -> Result<TemplateBlock> {
    let template_id = r.u16()?;
    let (schema_name, _) = r.string()?;
    let (type_name, _) = r.string()?;
    let field_count = r.u32()?;
    let mut fields = Vec::with_capacity(field_count.min(256) as usize);
    for _ in 0..field_count {
        let type_id = r.u32()?;
        let field_id = r.u32()?;
        let (name, _) = r.string()?;
        let enabled = r.u8()? != 0;
        fields.push(FieldDescriptor {
            type_id,
            field_id,
            name,
            enabled,
        });
    }
    Ok(TemplateBlock {
        template_id,
        schema_name,
        type_name,
        fields,
    })
}

fn decode_session_block(r: &mut Cursor<'_>) -> Result<SessionBlock> {
    let session_id = r.u8()?;
    let reserved = r.u8()?;
    let (name, _) = r.string()?;
    let (description, _) = r.string()?;
    let ack_time_interval = r.u32()?;
    let ack_sequence_interval = r.u32()?;
    Ok(SessionBlock {
        session_id,
        reserved,
        name,
        description,
        ack_time_interval,
        ack_sequence_interval,
    })
}

/// Bounds-checked forward reader over a frame.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                needed: self.pos + n,
                have: self.buf.len(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(
            self.take(2)?.try_into().expect("slice is 2 bytes"),
        ))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(
            self.take(4)?.try_into().expect("slice is 4 bytes"),
        ))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(
            self.take(8)?.try_into().expect("slice is 8 bytes"),
        ))
    }

    fn string(&mut self) -> Result<(String, usize)> {
        let (text, consumed) = decode_string(self.rest())?;
        self.pos += consumed;
        Ok((text, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an exporter-direction frame by hand: header with patched
    /// length, then the payload bytes.
    fn exporter_frame(kind: u8, session_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.put_u8(2);
        out.put_u8(kind);
        out.put_u8(session_id);
        out.put_u8(0);
        out.put_u32((HEADER_SIZE + payload.len()) as u32);
        out.put_slice(payload);
        out
    }

    fn put_string(dst: &mut Vec<u8>, s: &str) {
        dst.put_u32(s.len() as u32);
        dst.put_slice(s.as_bytes());
    }

    #[test]
    fn keepalive_roundtrip() {
        let msg = Message::KeepAlive(KeepAlive { session_id: 7 });
        let wire = msg.encode().unwrap();
        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(Message::decode(&wire).unwrap(), msg);
    }

    #[test]
    fn error_roundtrip() {
        let msg = Message::Error(ErrorMessage {
            session_id: 0,
            timestamp: 1_700_000_000,
            code: ERR_KEEPALIVE_EXPIRED,
            description: "KeepAlive expired".to_string(),
        });
        let wire = msg.encode().unwrap();
        assert_eq!(Message::decode(&wire).unwrap(), msg);
    }

    #[test]
    fn encoded_length_field_matches_frame_length() {
        let messages = [
            Message::FlowStart(FlowStart { session_id: 1 }),
            Message::FlowStop(FlowStop {
                session_id: 1,
                reason_code: 0,
                reason_info: "collector session teardown".to_string(),
            }),
            Message::Connect(Connect {
                session_id: 0,
                initiator_address: 0x0a000001,
                initiator_port: 4737,
                capabilities: 2,
                keepalive_interval: 300,
                vendor_id: "rust-collector".to_string(),
            }),
            Message::Disconnect { session_id: 0 },
            Message::FinalTemplateDataAck { session_id: 3 },
            Message::GetSessions(GetSessions {
                session_id: 0,
                request_id: 0,
            }),
            Message::DataAck(DataAck {
                session_id: 3,
                config_id: 9,
                sequence: 42,
            }),
            Message::Error(ErrorMessage::with_code(ERR_PROCESS_TERMINATING)),
            Message::KeepAlive(KeepAlive { session_id: 0 }),
        ];

        for msg in messages {
            let wire = msg.encode().unwrap();
            let declared = u32::from_be_bytes(wire[4..8].try_into().unwrap());
            assert_eq!(declared as usize, wire.len(), "{}", msg.kind());
        }
    }

    #[test]
    fn encoding_receive_only_kind_fails() {
        let msg = Message::Data(Data {
            session_id: 1,
            template_id: 1,
            config_id: 1,
            flags: 0,
            sequence: 1,
            record: Bytes::new(),
        });
        let err = msg.encode().unwrap_err();
        assert!(matches!(
            err,
            WireError::WrongDirection {
                kind: MessageKind::Data,
                operation: "encoded"
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn decoding_send_only_kind_fails() {
        let wire = Message::GetSessions(GetSessions {
            session_id: 0,
            request_id: 1,
        })
        .encode()
        .unwrap();
        let err = Message::decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            WireError::WrongDirection {
                kind: MessageKind::GetSessions,
                operation: "decoded"
            }
        ));
    }

    #[test]
    fn unsupported_kind_rejected() {
        let wire = exporter_frame(0x16, 0, b""); // GET_TEMPLATES, not supported
        let err = Message::decode(&wire).unwrap_err();
        assert!(matches!(err, WireError::UnsupportedKind(0x16)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn decode_connect_response() {
        let mut payload = Vec::new();
        payload.put_u32(2);
        payload.put_u32(300);
        put_string(&mut payload, "exporter-v1");
        let wire = exporter_frame(0x06, 0, &payload);

        let msg = Message::decode(&wire).unwrap();
        let Message::ConnectResponse(resp) = msg else {
            panic!("expected CONNECT_RESPONSE");
        };
        assert_eq!(resp.capabilities, 2);
        assert_eq!(resp.keepalive_interval, 300);
        assert_eq!(resp.vendor_id, "exporter-v1");
    }

    #[test]
    fn decode_session_start() {
        let mut payload = Vec::new();
        payload.put_u32(1_600_000_000); // boot time
        payload.put_u64(10); // first sequence
        payload.put_u64(0); // dropped
        payload.put_u8(1); // primary
        payload.put_u32(5); // ack time interval
        payload.put_u32(10); // ack sequence interval
        payload.put_slice(&[0xAB; 16]); // document id
        let wire = exporter_frame(0x08, 3, &payload);

        let msg = Message::decode(&wire).unwrap();
        let Message::SessionStart(start) = msg else {
            panic!("expected SESSION_START");
        };
        assert_eq!(start.session_id, 3);
        assert_eq!(start.first_record_sequence, 10);
        assert_eq!(start.ack_time_interval, 5);
        assert_eq!(start.ack_sequence_interval, 10);
        assert_eq!(start.document_id, [0xAB; 16]);
    }

    #[test]
    fn decode_template_data() {
        let mut payload = Vec::new();
        payload.put_u16(7); // config id
        payload.put_u8(0); // flags
        payload.put_u32(1); // template count
        payload.put_u16(42); // template id
        put_string(&mut payload, "ipdr:cable"); // schema name
        put_string(&mut payload, "usage"); // type name
        payload.put_u32(2); // field count
        payload.put_u32(0x22); // UINT
        payload.put_u32(1);
        put_string(&mut payload, "octets");
        payload.put_u8(1);
        payload.put_u32(0x322); // IPV4ADDR
        payload.put_u32(2);
        put_string(&mut payload, "subscriber");
        payload.put_u8(0);
        let wire = exporter_frame(0x10, 3, &payload);

        let msg = Message::decode(&wire).unwrap();
        let Message::TemplateData(td) = msg else {
            panic!("expected TEMPLATE_DATA");
        };
        assert_eq!(td.config_id, 7);
        assert_eq!(td.templates.len(), 1);
        let t = &td.templates[0];
        assert_eq!(t.template_id, 42);
        assert_eq!(t.schema_name, "ipdr:cable");
        assert_eq!(t.type_name, "usage");
        assert_eq!(t.fields.len(), 2);
        assert_eq!(t.fields[0].name, "octets");
        assert!(t.fields[0].enabled);
        assert_eq!(t.fields[1].type_id, 0x322);
        assert!(!t.fields[1].enabled);
    }

    #[test]
    fn decode_get_sessions_response() {
        let mut payload = Vec::new();
        payload.put_u16(0); // request id
        payload.put_u32(0); // block length
        payload.put_u8(1); // session id
        payload.put_u8(0); // reserved
        put_string(&mut payload, "usage");
        put_string(&mut payload, "hourly usage records");
        payload.put_u32(60);
        payload.put_u32(1000);
        let wire = exporter_frame(0x15, 0, &payload);

        let msg = Message::decode(&wire).unwrap();
        let Message::GetSessionsResponse(resp) = msg else {
            panic!("expected GET_SESSIONS_RESPONSE");
        };
        assert_eq!(resp.sessions.len(), 1);
        assert_eq!(resp.sessions[0].session_id, 1);
        assert_eq!(resp.sessions[0].name, "usage");
        assert_eq!(resp.sessions[0].ack_sequence_interval, 1000);
    }

    #[test]
    fn decode_data_takes_rest_of_frame() {
        let mut payload = Vec::new();
        payload.put_u16(42); // template id
        payload.put_u16(7); // config id
        payload.put_u8(0); // flags
        payload.put_u64(99); // sequence
        payload.put_slice(&[0, 0, 0, 0, 0, 0, 0, 5]); // record
        let wire = exporter_frame(0x20, 3, &payload);

        let msg = Message::decode(&wire).unwrap();
        let Message::Data(data) = msg else {
            panic!("expected DATA");
        };
        assert_eq!(data.template_id, 42);
        assert_eq!(data.sequence, 99);
        assert_eq!(data.record.len(), 8);
    }

    #[test]
    fn truncated_payload_is_transient() {
        let wire = exporter_frame(0x08, 3, &[0, 0, 0, 1]); // SESSION_START needs 45 payload bytes
        let err = Message::decode(&wire).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn error_with_code_fills_canonical_description() {
        let msg = ErrorMessage::with_code(ERR_KEEPALIVE_EXPIRED);
        assert_eq!(msg.description, "KeepAlive expired");
        assert_eq!(msg.code, ERR_KEEPALIVE_EXPIRED);

        let unknown = ErrorMessage::with_code(999);
        assert_eq!(unknown.description, "");
    }

    #[test]
    fn describe_formats() {
        let msg = Message::KeepAlive(KeepAlive { session_id: 0 });
        assert_eq!(msg.describe(), "KEEP_ALIVE - session: 0");

        let data = Message::Data(Data {
            session_id: 3,
            template_id: 1,
            config_id: 1,
            flags: 0,
            sequence: 17,
            record: Bytes::new(),
        });
        assert_eq!(data.describe(), "DATA - session: 3, seq: 17");
    }
}
