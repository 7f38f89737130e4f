use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Local;
use ipdr_template::header_line;
use ipdr_wire::TemplateBlock;
use tracing::info;

/// Destination for rendered record lines. One sink per (session, template)
/// pair, opened when the session activates and closed when it stops.
pub trait RecordSink: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Opens sinks for a session's templates at activation time.
pub trait SinkFactory: Send {
    fn open(&mut self, session_id: u8, template: &TemplateBlock) -> io::Result<Box<dyn RecordSink>>;
}

/// Writes each (session, template) pair to its own CSV file under a base
/// directory. The header line goes out at open time.
#[derive(Debug, Clone)]
pub struct CsvFileFactory {
    output_dir: PathBuf,
}

impl CsvFileFactory {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl SinkFactory for CsvFileFactory {
    fn open(&mut self, session_id: u8, template: &TemplateBlock) -> io::Result<Box<dyn RecordSink>> {
        let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
        let name = format!(
            "IPDR_RECORD_{stamp}_S{session_id}_T{tid}_{type_name}.csv",
            tid = template.template_id,
            type_name = template.type_name,
        );
        let path = self.output_dir.join(name);

        std::fs::create_dir_all(&self.output_dir)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(header_line(template).as_bytes())?;
        info!(path = %path.display(), session = session_id, "opened record file");

        Ok(Box::new(CsvFileSink { writer }))
    }
}

struct CsvFileSink {
    writer: BufWriter<File>,
}

impl RecordSink for CsvFileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory sink for tests and dry runs. Every opened sink appends to the
/// same shared line buffer, prefixed with its session and template ids.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkFactory {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn open(&mut self, session_id: u8, template: &TemplateBlock) -> io::Result<Box<dyn RecordSink>> {
        Ok(Box::new(MemorySink {
            prefix: format!("S{session_id}/T{}: ", template.template_id),
            lines: Arc::clone(&self.lines),
        }))
    }
}

struct MemorySink {
    prefix: String,
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}{}", self.prefix, line.trim_end()));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ipdr_wire::FieldDescriptor;

    use super::*;

    fn template() -> TemplateBlock {
        TemplateBlock {
            template_id: 9,
            schema_name: "ipdr:test".to_string(),
            type_name: "usage".to_string(),
            fields: vec![FieldDescriptor {
                type_id: 0x22,
                field_id: 1,
                name: "octets".to_string(),
                enabled: true,
            }],
        }
    }

    #[test]
    fn memory_factory_collects_lines() {
        let mut factory = MemorySinkFactory::new();
        let mut sink = factory.open(3, &template()).unwrap();
        sink.write_line("42\n").unwrap();
        sink.write_line("43\n").unwrap();

        assert_eq!(factory.lines(), vec!["S3/T9: 42", "S3/T9: 43"]);
    }

    #[test]
    fn csv_factory_writes_header() {
        let dir = std::env::temp_dir().join(format!("ipdr-sink-test-{}", std::process::id()));
        let mut factory = CsvFileFactory::new(&dir);
        let mut sink = factory.open(1, &template()).unwrap();
        sink.write_line("7\n").unwrap();
        sink.flush().unwrap();

        let entry = std::fs::read_dir(&dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let name = entry.file_name().into_string().unwrap();
        assert!(name.starts_with("IPDR_RECORD_"), "{name}");
        assert!(name.ends_with("_S1_T9_usage.csv"), "{name}");

        let body = std::fs::read_to_string(entry.path()).unwrap();
        assert_eq!(body, "octets\n7\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
