//! Length-delimited frame reassembly for the IPDR collector protocol.
//!
//! IPDR messages carry their total length inside the 8-byte message header
//! (big-endian u32 at offset 4, header-inclusive). TCP delivers chunks
//! unaligned to message boundaries, so this crate turns an arbitrarily
//! chunked byte stream back into complete frames:
//!
//! - [`FrameAssembler`] — push-based accumulator for the dispatcher loop
//! - [`FrameReader`] — blocking reader over any `Read`
//! - [`FrameWriter`] — blocking writer over any `Write`
//!
//! No partial reads, no buffer management in user code.

pub mod assembler;
pub mod error;
pub mod reader;
pub mod writer;

pub use assembler::{FrameAssembler, FrameConfig, DEFAULT_MAX_FRAME, HEADER_SIZE, LENGTH_OFFSET};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
