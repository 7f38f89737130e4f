/// Errors raised while decoding a record against its template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The numeric type identifier is not in the supported set.
    #[error("unknown field type identifier 0x{0:x}")]
    UnknownFieldType(u32),

    /// The record ran out of bytes before the template's fields did.
    #[error("record exhausted: next field needs {needed} bytes, {have} remain")]
    RecordExhausted { needed: usize, have: usize },
}

pub type Result<T> = std::result::Result<T, TemplateError>;
