use bytes::{Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Fixed message header size: version (1) + kind (1) + session (1) +
/// flags (1) + total length (4).
pub const HEADER_SIZE: usize = 8;

/// Offset of the big-endian u32 total-length field within the header.
pub const LENGTH_OFFSET: usize = 4;

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Configuration for frame reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum total frame size in bytes. Default: 16 MiB.
    ///
    /// The length field is attacker-controlled input; without this bound a
    /// corrupt frame could grow the accumulator without limit.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}

/// Splits one complete frame off the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn split_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let declared = u32::from_be_bytes(
        src[LENGTH_OFFSET..LENGTH_OFFSET + 4]
            .try_into()
            .expect("slice is 4 bytes"),
    );

    // A length below the header size would never drain the accumulator.
    if (declared as usize) < HEADER_SIZE {
        return Err(FrameError::LengthUnderflow {
            declared,
            header: HEADER_SIZE,
        });
    }

    let total = declared as usize;
    if total > max_frame_size {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: max_frame_size,
        });
    }

    if src.len() < total {
        return Ok(None); // Need more data
    }

    Ok(Some(src.split_to(total).freeze()))
}

/// Push-based frame accumulator.
///
/// Feed raw chunks with [`push`](Self::push), then drain complete frames with
/// [`next_frame`](Self::next_frame) until it returns `Ok(None)`. A single
/// chunk may complete several frames; a frame may span many chunks.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append a raw chunk to the accumulator.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        split_frame(&mut self.buf, self.config.max_frame_size)
    }

    /// Bytes currently buffered without forming a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
