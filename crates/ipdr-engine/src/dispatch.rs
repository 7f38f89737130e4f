use std::sync::Mutex;
use std::time::Instant;

use ipdr_wire::{
    Connect, ErrorMessage, FlowStart, FlowStop, GetSessions, Message, ERR_MSG_DECODE_ERROR,
    ERR_MSG_INVALID_FOR_STATE,
};
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::error::{EngineError, Result};
use crate::liveness::Liveness;
use crate::lock;
use crate::registry::SessionRegistry;

/// Reason sent with the FLOW_STOP that answers a session stop.
const FLOW_STOP_INFO: &str = "collector session teardown";

/// Where the link stands in connection setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No CONNECT sent yet.
    Init,
    /// CONNECT sent, response outstanding.
    AwaitingConnectResponse,
    /// Connection parameters agreed; sessions may flow.
    Negotiated,
}

/// Drives the protocol state machine: takes decoded inbound frames,
/// mutates the registry and liveness timers, and yields the messages to
/// send in response, in order.
pub struct Dispatcher {
    state: LinkState,
    config: CollectorConfig,
    next_request_id: u16,
}

impl Dispatcher {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            state: LinkState::Init,
            config,
            next_request_id: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The opening CONNECT. Moves the link out of [`LinkState::Init`].
    pub fn connect_message(&mut self) -> Message {
        self.state = LinkState::AwaitingConnectResponse;
        Message::Connect(Connect {
            session_id: 0,
            initiator_address: u32::from(self.config.local_address),
            initiator_port: self.config.local_port,
            capabilities: ipdr_wire::STRUCTURE_CAPABILITY,
            keepalive_interval: self.config.keepalive_interval,
            vendor_id: self.config.vendor_id.clone(),
        })
    }

    /// Handle one complete inbound frame. Returns the ordered replies.
    ///
    /// Fatal codec errors (version or length disagreement) propagate and
    /// must tear the link down; anything else is answered or logged and
    /// the link keeps running.
    pub fn handle_frame(
        &mut self,
        frame: &[u8],
        now: Instant,
        registry: &Mutex<SessionRegistry>,
        liveness: &Mutex<Liveness>,
    ) -> Result<Vec<Message>> {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(error) if error.is_fatal() => return Err(error.into()),
            Err(error) => {
                warn!(%error, "dropping undecodable frame");
                return Ok(vec![Message::Error(ErrorMessage::with_code(
                    ERR_MSG_DECODE_ERROR,
                ))]);
            }
        };

        lock(liveness).observe_receive(now);
        debug!(message = %message.describe(), "received");

        if self.state != LinkState::Negotiated
            && !matches!(message, Message::ConnectResponse(_) | Message::Error(_))
        {
            warn!(
                message = %message.describe(),
                state = ?self.state,
                "message arrived before negotiation completed"
            );
            return Ok(vec![Message::Error(ErrorMessage::with_code(
                ERR_MSG_INVALID_FOR_STATE,
            ))]);
        }

        match message {
            Message::ConnectResponse(response) => {
                if self.state != LinkState::AwaitingConnectResponse {
                    warn!("unexpected connect response, ignoring");
                    return Ok(vec![Message::Error(ErrorMessage::with_code(
                        ERR_MSG_INVALID_FOR_STATE,
                    ))]);
                }
                info!(
                    vendor = %response.vendor_id,
                    keepalive = response.keepalive_interval,
                    capabilities = response.capabilities,
                    "connection negotiated"
                );
                lock(liveness).negotiate(response.keepalive_interval, now);
                self.state = LinkState::Negotiated;

                let request_id = self.next_request_id;
                self.next_request_id = self.next_request_id.wrapping_add(1);
                Ok(vec![Message::GetSessions(GetSessions {
                    session_id: 0,
                    request_id,
                })])
            }
            Message::GetSessionsResponse(response) => {
                let offered = lock(registry).adopt_catalogue(&response, now);
                Ok(offered
                    .into_iter()
                    .map(|session_id| Message::FlowStart(FlowStart { session_id }))
                    .collect())
            }
            Message::TemplateData(data) => {
                let session_id = data.session_id;
                lock(registry).register_templates(&data, now);
                Ok(vec![Message::FinalTemplateDataAck { session_id }])
            }
            Message::SessionStart(start) => {
                lock(registry).activate(&start, now);
                Ok(Vec::new())
            }
            Message::SessionStop(stop) => {
                let session_id = stop.session_id;
                info!(
                    session = session_id,
                    reason = stop.reason_code,
                    info = %stop.reason_info,
                    "exporter stopped session"
                );
                lock(registry).deactivate(session_id);
                Ok(vec![Message::FlowStop(FlowStop {
                    session_id,
                    reason_code: 0,
                    reason_info: FLOW_STOP_INFO.to_string(),
                })])
            }
            Message::Data(data) => {
                let ack = lock(registry).apply_record(&data, now);
                Ok(ack.into_iter().map(Message::DataAck).collect())
            }
            Message::KeepAlive(_) => Ok(Vec::new()),
            Message::Error(error) => {
                warn!(
                    code = error.code,
                    description = %error.description,
                    timestamp = error.timestamp,
                    "exporter reported error"
                );
                Ok(Vec::new())
            }
            // Send-only kinds are rejected by the decoder.
            other => Err(EngineError::Protocol(format!(
                "unroutable message: {}",
                other.describe()
            ))),
        }
    }

    /// The parting keepalive courtesy: a DISCONNECT for graceful shutdown.
    pub fn disconnect_message(&self) -> Message {
        Message::Disconnect { session_id: 0 }
    }
}
