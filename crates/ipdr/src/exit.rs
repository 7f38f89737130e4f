use std::fmt;
use std::io;

use ipdr_engine::EngineError;
use ipdr_frame::FrameError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PROTOCOL_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn engine_error(context: &str, err: EngineError) -> CliError {
    match err {
        EngineError::Frame(err) => frame_error(context, err),
        EngineError::Io(err) => io_error(context, err),
        EngineError::Wire(err) => CliError::new(PROTOCOL_ERROR, format!("{context}: {err}")),
        EngineError::Protocol(message) => CliError::new(
            PROTOCOL_ERROR,
            format!("{context}: protocol violation: {message}"),
        ),
        EngineError::KeepaliveExpired(secs) => CliError::new(
            TIMEOUT,
            format!("{context}: keepalive expired after {secs} seconds of silence"),
        ),
        EngineError::ChannelClosed(what) => CliError::new(
            INTERNAL,
            format!("{context}: internal channel closed: {what}"),
        ),
    }
}
