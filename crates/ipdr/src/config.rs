use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Wire protocol version this build speaks; the config must agree.
const SUPPORTED_VERSION: u8 = ipdr_wire::PROTOCOL_VERSION;

/// On-disk configuration: who we are and which exporter to collect from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub collector: CollectorSection,
    pub exporter: ExporterSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CollectorSection {
    /// Address announced to the exporter in the CONNECT message.
    pub address: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default = "default_version")]
    pub version: u8,
    /// Directory record CSV files are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Tear the link down after a receive-side keepalive expiry instead
    /// of rearming the timer.
    #[serde(default)]
    pub close_on_keepalive_timeout: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExporterSection {
    /// Exporter hostname or address.
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Keepalive interval to request, in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u32,
    /// TCP connect timeout, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Sessions to subscribe to.
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SessionEntry {
    pub id: u8,
    /// Label for logs and `check` output; not sent on the wire.
    #[serde(default)]
    pub name: String,
}

fn default_port() -> u16 {
    4737
}

fn default_vendor() -> String {
    "ipdr-collector".to_string()
}

fn default_version() -> u8 {
    SUPPORTED_VERSION
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_keep_alive() -> u32 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

impl FileConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| io_error(&format!("reading {}", path.display()), e))?;
        let config: FileConfig = serde_json::from_str(&text).map_err(|e| {
            CliError::new(DATA_INVALID, format!("parsing {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        let issues = self.issues();
        if issues.is_empty() {
            return Ok(());
        }
        Err(CliError::new(
            DATA_INVALID,
            format!("invalid configuration: {}", issues.join("; ")),
        ))
    }

    /// Every problem with this configuration, in document order.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.collector.version != SUPPORTED_VERSION {
            issues.push(format!(
                "collector.version must be {SUPPORTED_VERSION}, got {}",
                self.collector.version
            ));
        }
        if self.collector.vendor.is_empty() {
            issues.push("collector.vendor must not be empty".to_string());
        }
        if self.exporter.address.is_empty() {
            issues.push("exporter.address must not be empty".to_string());
        }
        if self.exporter.sessions.is_empty() {
            issues.push("exporter.sessions must name at least one session".to_string());
        }
        issues
    }

    /// The engine-level settings this configuration describes.
    pub fn collector_config(&self) -> ipdr_engine::CollectorConfig {
        ipdr_engine::CollectorConfig {
            local_address: self.collector.address,
            local_port: self.collector.port,
            vendor_id: self.collector.vendor.clone(),
            keepalive_interval: self.exporter.keep_alive,
            session_ids: self.exporter.sessions.iter().map(|s| s.id).collect(),
            close_on_keepalive_timeout: self.collector.close_on_keepalive_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> &'static str {
        r#"{
            "collector": { "address": "10.0.0.2" },
            "exporter": { "address": "exporter.example.net", "sessions": [{ "id": 3 }] }
        }"#
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: FileConfig = serde_json::from_str(minimal()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.collector.port, 4737);
        assert_eq!(config.collector.vendor, "ipdr-collector");
        assert_eq!(config.collector.version, 2);
        assert!(!config.collector.close_on_keepalive_timeout);
        assert_eq!(config.exporter.keep_alive, 300);
        assert_eq!(config.exporter.connect_timeout, 10);
    }

    #[test]
    fn kebab_case_keys() {
        let config: FileConfig = serde_json::from_str(
            r#"{
                "collector": {
                    "address": "10.0.0.2",
                    "output-dir": "/var/lib/ipdr",
                    "close-on-keepalive-timeout": true
                },
                "exporter": {
                    "address": "10.0.0.1",
                    "keep-alive": 60,
                    "connect-timeout": 5,
                    "sessions": [{ "id": 3, "name": "usage" }, { "id": 4 }]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.collector.output_dir, PathBuf::from("/var/lib/ipdr"));
        assert!(config.collector.close_on_keepalive_timeout);
        assert_eq!(config.exporter.keep_alive, 60);
        let ids: Vec<u8> = config.exporter.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(config.exporter.sessions[0].name, "usage");
        assert_eq!(config.exporter.sessions[1].name, "");
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = serde_json::from_str::<FileConfig>(
            r#"{
                "collector": { "address": "10.0.0.2", "bogus": 1 },
                "exporter": { "address": "x", "sessions": [{ "id": 1 }] }
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_version_flagged() {
        let mut config: FileConfig = serde_json::from_str(minimal()).unwrap();
        config.collector.version = 1;
        let issues = config.issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("collector.version"));
    }

    #[test]
    fn empty_sessions_flagged() {
        let mut config: FileConfig = serde_json::from_str(minimal()).unwrap();
        config.exporter.sessions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn engine_config_mapping() {
        let config: FileConfig = serde_json::from_str(minimal()).unwrap();
        let engine = config.collector_config();
        assert_eq!(engine.local_address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(engine.session_ids, vec![3]);
        assert_eq!(engine.keepalive_interval, 300);
    }
}
