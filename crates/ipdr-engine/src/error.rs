/// Errors that can occur while running a collection link.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] ipdr_frame::FrameError),

    /// Message codec error.
    #[error("wire error: {0}")]
    Wire(#[from] ipdr_wire::WireError),

    /// I/O error on the link or a record sink.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The exporter violated the protocol state machine.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The peer stopped answering keepalives.
    #[error("keepalive expired after {0} seconds of silence")]
    KeepaliveExpired(u64),

    /// An internal channel closed while the link was still running.
    #[error("internal channel closed: {0}")]
    ChannelClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
