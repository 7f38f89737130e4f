//! Template-driven record decoding.
//!
//! An exporter describes its records with templates: an ordered list of
//! typed, named fields. This crate maps the numeric type identifiers those
//! templates carry onto decoders, and renders a raw record payload into one
//! line of comma-separated text suitable for a CSV body.
//!
//! Everything here is pure: no I/O, no clocks. Feed it bytes, get strings.

mod decode;
mod error;
mod render;
mod types;

pub use decode::{decode_field, field_width};
pub use error::{Result, TemplateError};
pub use render::{header_line, render_record};
pub use types::FieldType;
