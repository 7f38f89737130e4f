/// Errors that can occur during frame reassembly.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared total length is smaller than the fixed header.
    #[error("declared frame length {declared} smaller than header ({header} bytes)")]
    LengthUnderflow { declared: u32, header: usize },

    /// The declared total length exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
