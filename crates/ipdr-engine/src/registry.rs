use std::collections::HashMap;
use std::time::{Duration, Instant};

use ipdr_wire::{Data, DataAck, GetSessionsResponse, SessionStart, TemplateBlock, TemplateData};
use tracing::{debug, info, warn};

use crate::sink::{RecordSink, SinkFactory};

/// Tracks every session the collector subscribes to: its templates, its
/// record sinks, its activation state, and the acknowledgement policy the
/// exporter announced for it.
///
/// Lifecycle per session: registered (templates known, inactive) on
/// TEMPLATE_DATA, activated (sinks opened) on SESSION_START, deactivated
/// (sinks closed, row retained) on SESSION_STOP. A later SESSION_START
/// reactivates without the templates being re-sent.
pub struct SessionRegistry {
    sessions: HashMap<u8, Session>,
    subscribed: Vec<u8>,
    factory: Box<dyn SinkFactory>,
}

struct Session {
    id: u8,
    active: bool,
    config_id: u16,
    templates: HashMap<u16, TemplateBlock>,
    sinks: HashMap<u16, Box<dyn RecordSink>>,
    /// Seconds between time-based acks; zero disables them.
    ack_time_interval: Duration,
    /// Records between count-based acks; zero disables them.
    ack_sequence_interval: u64,
    records_since_ack: u64,
    last_sequence: u64,
    last_ack_at: Instant,
    document_id: [u8; 16],
}

impl Session {
    fn new(id: u8, now: Instant) -> Self {
        Self {
            id,
            active: false,
            config_id: 0,
            templates: HashMap::new(),
            sinks: HashMap::new(),
            ack_time_interval: Duration::ZERO,
            ack_sequence_interval: 0,
            records_since_ack: 0,
            last_sequence: 0,
            last_ack_at: now,
            document_id: [0; 16],
        }
    }

    fn ack(&mut self, now: Instant) -> DataAck {
        self.records_since_ack = 0;
        self.last_ack_at = now;
        for sink in self.sinks.values_mut() {
            if let Err(error) = sink.flush() {
                warn!(session = self.id, %error, "record sink flush failed");
            }
        }
        DataAck {
            session_id: self.id,
            config_id: self.config_id,
            sequence: self.last_sequence,
        }
    }
}

impl SessionRegistry {
    pub fn new(subscribed: Vec<u8>, factory: Box<dyn SinkFactory>) -> Self {
        Self {
            sessions: HashMap::new(),
            subscribed,
            factory,
        }
    }

    fn subscribed(&self, session_id: u8) -> bool {
        self.subscribed.contains(&session_id)
    }

    /// Fold the exporter's session catalogue into the registry. Returns the
    /// ids of subscribed sessions the exporter actually offers, in the
    /// order advertised; each needs a flow opened.
    pub fn adopt_catalogue(&mut self, response: &GetSessionsResponse, now: Instant) -> Vec<u8> {
        let mut offered = Vec::new();
        for block in &response.sessions {
            if !self.subscribed(block.session_id) {
                debug!(
                    session = block.session_id,
                    name = %block.name,
                    "exporter offers session outside subscription, skipping"
                );
                continue;
            }
            let session = self
                .sessions
                .entry(block.session_id)
                .or_insert_with(|| Session::new(block.session_id, now));
            session.ack_time_interval = Duration::from_secs(u64::from(block.ack_time_interval));
            session.ack_sequence_interval = u64::from(block.ack_sequence_interval);
            info!(
                session = block.session_id,
                name = %block.name,
                ack_time = block.ack_time_interval,
                ack_seq = block.ack_sequence_interval,
                "subscribing to advertised session"
            );
            offered.push(block.session_id);
        }
        offered
    }

    /// Store a session's templates, replacing any earlier set. Does not
    /// activate; sinks open on activation.
    pub fn register_templates(&mut self, data: &TemplateData, now: Instant) {
        if !self.subscribed(data.session_id) {
            warn!(
                session = data.session_id,
                "templates announced for unsubscribed session, ignoring"
            );
            return;
        }

        let session = self
            .sessions
            .entry(data.session_id)
            .or_insert_with(|| Session::new(data.session_id, now));
        session.config_id = data.config_id;
        session.templates.clear();

        for template in &data.templates {
            info!(
                session = data.session_id,
                template = template.template_id,
                type_name = %template.type_name,
                fields = template.fields.len(),
                "registered template"
            );
            session
                .templates
                .insert(template.template_id, template.clone());
        }
    }

    /// Activate a session: open one sink per registered template and adopt
    /// the ack policy carried with the start announcement. A sink that
    /// fails to open is logged; records for that template are dropped
    /// until the next activation.
    pub fn activate(&mut self, start: &SessionStart, now: Instant) {
        let Some(session) = self.sessions.get_mut(&start.session_id) else {
            warn!(
                session = start.session_id,
                "session start for untracked session, ignoring"
            );
            return;
        };

        for template in session.templates.values() {
            match self.factory.open(start.session_id, template) {
                Ok(sink) => {
                    session.sinks.insert(template.template_id, sink);
                }
                Err(error) => {
                    warn!(
                        session = start.session_id,
                        template = template.template_id,
                        %error,
                        "record sink failed to open, records for this template will be dropped"
                    );
                }
            }
        }

        session.active = true;
        session.last_sequence = start.first_record_sequence;
        session.records_since_ack = 0;
        session.last_ack_at = now;
        session.document_id = start.document_id;
        if start.ack_time_interval > 0 {
            session.ack_time_interval = Duration::from_secs(u64::from(start.ack_time_interval));
        }
        if start.ack_sequence_interval > 0 {
            session.ack_sequence_interval = u64::from(start.ack_sequence_interval);
        }
        info!(
            session = start.session_id,
            first_sequence = start.first_record_sequence,
            dropped = start.dropped_record_count,
            primary = start.primary == 1,
            "session started"
        );
    }

    /// Deactivate a session, closing its sinks. The row persists so a
    /// later SESSION_START can reactivate it. Returns true when the
    /// session was tracked, meaning a flow teardown should be sent.
    pub fn deactivate(&mut self, session_id: u8) -> bool {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            warn!(session = session_id, "session stop for untracked session");
            return false;
        };
        session.active = false;
        for (_, mut sink) in session.sinks.drain() {
            if let Err(error) = sink.flush() {
                warn!(session = session_id, %error, "record sink flush failed");
            }
        }
        info!(session = session_id, "session stopped");
        true
    }

    /// Render and persist one record. Returns a count-triggered ack when
    /// the session's sequence interval is reached. A record that cannot be
    /// rendered or written is logged and dropped; the counters advance
    /// either way.
    pub fn apply_record(&mut self, data: &Data, now: Instant) -> Option<DataAck> {
        let Some(session) = self.sessions.get_mut(&data.session_id) else {
            warn!(session = data.session_id, "record for untracked session, dropping");
            return None;
        };
        if !session.active {
            warn!(session = data.session_id, "record for inactive session, dropping");
            return None;
        }

        session.config_id = data.config_id;
        session.last_sequence = data.sequence;
        session.records_since_ack += 1;

        if let Some(template) = session.templates.get(&data.template_id) {
            match ipdr_template::render_record(template, &data.record) {
                Ok(line) => {
                    if let Some(sink) = session.sinks.get_mut(&data.template_id) {
                        if let Err(error) = sink.write_line(&line) {
                            warn!(
                                session = data.session_id,
                                sequence = data.sequence,
                                %error,
                                "record sink write failed, record dropped"
                            );
                        }
                    }
                    debug!(
                        session = data.session_id,
                        sequence = data.sequence,
                        "record applied"
                    );
                }
                Err(error) => {
                    warn!(
                        session = data.session_id,
                        sequence = data.sequence,
                        %error,
                        "record failed to render, not materialized"
                    );
                }
            }
        } else {
            warn!(
                session = data.session_id,
                template = data.template_id,
                "record references unknown template, not materialized"
            );
        }

        if session.ack_sequence_interval > 0
            && session.records_since_ack >= session.ack_sequence_interval
        {
            return Some(session.ack(now));
        }
        None
    }

    /// Time-based acks for sessions whose ack interval elapsed with
    /// unacknowledged records outstanding.
    pub fn acks_due(&mut self, now: Instant) -> Vec<DataAck> {
        let mut due = Vec::new();
        for session in self.sessions.values_mut() {
            if session.active
                && session.records_since_ack > 0
                && session.ack_time_interval > Duration::ZERO
                && now.duration_since(session.last_ack_at) >= session.ack_time_interval
            {
                due.push(session.ack(now));
            }
        }
        due
    }

    /// Flush every open sink; called on shutdown.
    pub fn flush_all(&mut self) {
        for session in self.sessions.values_mut() {
            for sink in session.sinks.values_mut() {
                if let Err(error) = sink.flush() {
                    warn!(session = session.id, %error, "record sink flush failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use ipdr_wire::{FieldDescriptor, SessionBlock};

    use super::*;
    use crate::sink::MemorySinkFactory;

    fn catalogue(session_id: u8, ack_time: u32, ack_seq: u32) -> GetSessionsResponse {
        GetSessionsResponse {
            session_id: 0,
            request_id: 0,
            block_length: 0,
            sessions: vec![SessionBlock {
                session_id,
                reserved: 0,
                name: "usage".to_string(),
                description: "test session".to_string(),
                ack_time_interval: ack_time,
                ack_sequence_interval: ack_seq,
            }],
        }
    }

    fn templates(session_id: u8) -> TemplateData {
        TemplateData {
            session_id,
            config_id: 7,
            flags: 0,
            templates: vec![TemplateBlock {
                template_id: 42,
                schema_name: "ipdr:test".to_string(),
                type_name: "usage".to_string(),
                fields: vec![FieldDescriptor {
                    type_id: 0x22, // UINT
                    field_id: 1,
                    name: "octets".to_string(),
                    enabled: true,
                }],
            }],
        }
    }

    fn start(session_id: u8) -> SessionStart {
        SessionStart {
            session_id,
            exporter_boot_time: 0,
            first_record_sequence: 1,
            dropped_record_count: 0,
            primary: 1,
            ack_time_interval: 0,
            ack_sequence_interval: 0,
            document_id: [0; 16],
        }
    }

    fn record(session_id: u8, sequence: u64, value: u32) -> Data {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&value.to_be_bytes());
        Data {
            session_id,
            template_id: 42,
            config_id: 7,
            flags: 0,
            sequence,
            record: Bytes::from(payload),
        }
    }

    fn registry(factory: &MemorySinkFactory, ack_time: u32, ack_seq: u32) -> SessionRegistry {
        let now = Instant::now();
        let mut registry = SessionRegistry::new(vec![3], Box::new(factory.clone()));
        let offered = registry.adopt_catalogue(&catalogue(3, ack_time, ack_seq), now);
        assert_eq!(offered, vec![3]);
        registry.register_templates(&templates(3), now);
        registry.activate(&start(3), now);
        registry
    }

    #[test]
    fn unsubscribed_sessions_skipped() {
        let factory = MemorySinkFactory::new();
        let mut registry = SessionRegistry::new(vec![1], Box::new(factory));
        let offered = registry.adopt_catalogue(&catalogue(3, 0, 0), Instant::now());
        assert!(offered.is_empty());
    }

    #[test]
    fn records_flow_to_sink() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 0);

        let ack = registry.apply_record(&record(3, 1, 1024), Instant::now());
        assert!(ack.is_none());
        assert_eq!(factory.lines(), vec!["S3/T42: 1024"]);
    }

    #[test]
    fn count_threshold_triggers_ack() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 2);
        let now = Instant::now();

        assert!(registry.apply_record(&record(3, 1, 1), now).is_none());
        let ack = registry
            .apply_record(&record(3, 2, 2), now)
            .expect("second record must trigger ack");
        assert_eq!(ack.session_id, 3);
        assert_eq!(ack.config_id, 7);
        assert_eq!(ack.sequence, 2);

        // Counter reset: the next record starts a new window.
        assert!(registry.apply_record(&record(3, 3, 3), now).is_none());
    }

    #[test]
    fn time_threshold_triggers_ack() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 5, 0);
        let now = Instant::now();

        assert!(registry.apply_record(&record(3, 9, 1), now).is_none());
        assert!(registry.acks_due(now + Duration::from_secs(4)).is_empty());

        let due = registry.acks_due(now + Duration::from_secs(5));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].sequence, 9);
        assert_eq!(due[0].config_id, 7);

        // Nothing outstanding afterwards.
        assert!(registry.acks_due(now + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn inactive_and_unknown_sessions_drop_records() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 0);
        let now = Instant::now();

        assert!(registry.apply_record(&record(9, 1, 1), now).is_none());

        assert!(registry.deactivate(3));
        assert!(registry.apply_record(&record(3, 1, 1), now).is_none());
        assert!(factory.lines().is_empty());
    }

    #[test]
    fn stop_then_start_reopens_sinks() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 0);
        let now = Instant::now();

        registry.apply_record(&record(3, 1, 1), now);
        assert!(registry.deactivate(3));

        // Templates survive deactivation; a new start reopens the sinks.
        registry.activate(&start(3), now);
        registry.apply_record(&record(3, 2, 2), now);
        assert_eq!(factory.lines(), vec!["S3/T42: 1", "S3/T42: 2"]);
    }

    #[test]
    fn deactivate_untracked_session_is_a_noop() {
        let factory = MemorySinkFactory::new();
        let mut registry = SessionRegistry::new(vec![3], Box::new(factory));
        assert!(!registry.deactivate(5));
    }

    #[test]
    fn session_start_overrides_ack_policy() {
        let factory = MemorySinkFactory::new();
        let now = Instant::now();
        let mut registry = SessionRegistry::new(vec![3], Box::new(factory.clone()));
        registry.adopt_catalogue(&catalogue(3, 60, 1000), now);
        registry.register_templates(&templates(3), now);

        let mut announce = start(3);
        announce.ack_sequence_interval = 1;
        registry.activate(&announce, now);

        let ack = registry.apply_record(&record(3, 1, 1), now);
        assert!(ack.is_some());
    }

    #[test]
    fn unknown_template_counts_but_does_not_materialize() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 2);
        let now = Instant::now();

        let mut stray = record(3, 1, 1);
        stray.template_id = 99;
        assert!(registry.apply_record(&stray, now).is_none());
        assert!(factory.lines().is_empty());

        // The stray record still advanced the unacked count.
        let ack = registry.apply_record(&record(3, 2, 2), now);
        assert!(ack.is_some());
    }

    #[test]
    fn truncated_record_materializes_decoded_prefix() {
        let factory = MemorySinkFactory::new();
        let mut registry = registry(&factory, 0, 0);

        let mut bad = record(3, 1, 1);
        bad.record = Bytes::from_static(&[0, 0]); // preamble cut short
        assert!(registry.apply_record(&bad, Instant::now()).is_none());
        assert_eq!(factory.lines(), vec!["S3/T42: "]);
    }

    #[test]
    fn unrenderable_record_is_dropped_not_fatal() {
        let factory = MemorySinkFactory::new();
        let now = Instant::now();
        let mut registry = SessionRegistry::new(vec![3], Box::new(factory.clone()));
        registry.adopt_catalogue(&catalogue(3, 0, 0), now);

        let mut bad_templates = templates(3);
        bad_templates.templates[0].fields[0].type_id = 0x9999;
        registry.register_templates(&bad_templates, now);
        registry.activate(&start(3), now);

        assert!(registry.apply_record(&record(3, 1, 1), now).is_none());
        assert!(factory.lines().is_empty());
    }

    #[test]
    fn re_registration_replaces_the_template_set() {
        let factory = MemorySinkFactory::new();
        let now = Instant::now();
        let mut registry = SessionRegistry::new(vec![3], Box::new(factory.clone()));
        registry.adopt_catalogue(&catalogue(3, 0, 0), now);
        registry.register_templates(&templates(3), now);

        // A re-sent TEMPLATE_DATA carries a different template; the old
        // one must no longer resolve.
        let mut resent = templates(3);
        resent.templates[0].template_id = 43;
        registry.register_templates(&resent, now);
        registry.activate(&start(3), now);

        registry.apply_record(&record(3, 1, 7), now);
        assert!(factory.lines().is_empty(), "template 42 should be gone");

        let mut fresh = record(3, 2, 7);
        fresh.template_id = 43;
        registry.apply_record(&fresh, now);
        assert_eq!(factory.lines(), vec!["S3/T43: 7"]);
    }

    #[test]
    fn sink_write_failure_drops_record_only() {
        struct FailingSink;
        impl RecordSink for FailingSink {
            fn write_line(&mut self, _line: &str) -> io::Result<()> {
                Err(io::Error::other("no space left"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        struct FailingSinkFactory;
        impl SinkFactory for FailingSinkFactory {
            fn open(
                &mut self,
                _session_id: u8,
                _template: &TemplateBlock,
            ) -> io::Result<Box<dyn RecordSink>> {
                Ok(Box::new(FailingSink))
            }
        }

        let now = Instant::now();
        let mut registry = SessionRegistry::new(vec![3], Box::new(FailingSinkFactory));
        registry.adopt_catalogue(&catalogue(3, 0, 2), now);
        registry.register_templates(&templates(3), now);
        registry.activate(&start(3), now);

        // The failed write is logged; counters and acks still advance.
        assert!(registry.apply_record(&record(3, 1, 1), now).is_none());
        let ack = registry.apply_record(&record(3, 2, 2), now);
        assert_eq!(ack.map(|a| a.sequence), Some(2));
    }
}
