use ipdr_wire::TemplateBlock;

use crate::decode::decode_field;
use crate::error::{Result, TemplateError};
use crate::types::FieldType;

/// The CSV header line for a template: every declared field name,
/// comma-joined, newline-terminated.
pub fn header_line(template: &TemplateBlock) -> String {
    let mut out = String::new();
    for field in &template.fields {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&field.name);
    }
    out.push('\n');
    out
}

/// Render one record payload against its template as a CSV body line.
///
/// The payload opens with a 4-byte preamble that carries no field data;
/// every declared field follows back to back in declaration order, so
/// each one must consume its bytes whether or not it is marked enabled.
/// A record that runs out of bytes early yields the values decoded so
/// far; an unknown field type is an error.
pub fn render_record(template: &TemplateBlock, record: &[u8]) -> Result<String> {
    let mut rest = record.get(4..).unwrap_or_default();
    let mut out = String::new();
    let mut first = true;
    for field in &template.fields {
        let field_type = FieldType::from_u32(field.type_id)?;
        let (text, consumed) = match decode_field(field_type, rest) {
            Ok(decoded) => decoded,
            Err(TemplateError::RecordExhausted { .. }) => break,
            Err(err) => return Err(err),
        };
        rest = &rest[consumed..];
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&text);
    }
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use ipdr_wire::FieldDescriptor;

    use super::*;

    fn usage_template() -> TemplateBlock {
        TemplateBlock {
            template_id: 42,
            schema_name: "ipdr:cable".to_string(),
            type_name: "usage".to_string(),
            fields: vec![
                FieldDescriptor {
                    type_id: 0x322, // IPV4ADDR
                    field_id: 1,
                    name: "subscriber".to_string(),
                    enabled: true,
                },
                FieldDescriptor {
                    type_id: 0x24, // ULONG
                    field_id: 2,
                    name: "octets".to_string(),
                    enabled: true,
                },
                FieldDescriptor {
                    type_id: 0x28, // STRING
                    field_id: 3,
                    name: "service".to_string(),
                    enabled: false,
                },
            ],
        }
    }

    #[test]
    fn header_lists_every_declared_field() {
        assert_eq!(header_line(&usage_template()), "subscriber,octets,service\n");
    }

    #[test]
    fn record_line() {
        let mut record = vec![0u8; 4]; // preamble
        record.extend_from_slice(&[10, 0, 0, 1]);
        record.extend_from_slice(&1024u64.to_be_bytes());
        record.extend_from_slice(&[0, 0, 0, 4]); // service string
        record.extend_from_slice(b"gold");

        let line = render_record(&usage_template(), &record).unwrap();
        assert_eq!(line, "10.0.0.1,1024,gold\n");
    }

    #[test]
    fn disabled_field_still_consumes_its_bytes() {
        let template = TemplateBlock {
            template_id: 1,
            schema_name: "ipdr:test".to_string(),
            type_name: "usage".to_string(),
            fields: [(1, true), (2, false), (3, true)]
                .into_iter()
                .map(|(id, enabled)| FieldDescriptor {
                    type_id: 0x22, // UINT
                    field_id: id,
                    name: format!("f{id}"),
                    enabled,
                })
                .collect(),
        };
        let mut record = vec![0u8; 4];
        for value in [1u32, 2, 3] {
            record.extend_from_slice(&value.to_be_bytes());
        }

        // The middle field's bytes must not bleed into the third column.
        let line = render_record(&template, &record).unwrap();
        assert_eq!(line, "1,2,3\n");
    }

    #[test]
    fn short_preamble_yields_empty_line() {
        let line = render_record(&usage_template(), &[0, 0]).unwrap();
        assert_eq!(line, "\n");
    }

    #[test]
    fn truncated_record_yields_decoded_prefix() {
        let mut record = vec![0u8; 4];
        record.extend_from_slice(&[10, 0, 0, 1]);
        record.extend_from_slice(&[0, 0]); // octets cut short

        let line = render_record(&usage_template(), &record).unwrap();
        assert_eq!(line, "10.0.0.1\n");
    }

    #[test]
    fn unknown_type_rejected() {
        let mut template = usage_template();
        template.fields[0].type_id = 0x9999;
        let record = vec![0u8; 16];

        let err = render_record(&template, &record).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownFieldType(0x9999)));
    }
}
