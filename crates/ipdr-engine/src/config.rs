use std::net::Ipv4Addr;

/// Settings for one collection link.
///
/// The address and port identify the collector itself; they are announced
/// to the exporter during connection setup, not bound locally.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Collector IPv4 address announced in the CONNECT message.
    pub local_address: Ipv4Addr,
    /// Collector port announced in the CONNECT message.
    pub local_port: u16,
    /// Vendor string announced in the CONNECT message.
    pub vendor_id: String,
    /// Keepalive interval requested from the exporter, in seconds.
    pub keepalive_interval: u32,
    /// Sessions this collector subscribes to. Sessions the exporter
    /// advertises but this list omits are left untouched.
    pub session_ids: Vec<u8>,
    /// When set, a receive-side keepalive expiry tears the link down after
    /// the ERROR notification instead of rearming the timer.
    pub close_on_keepalive_timeout: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            local_address: Ipv4Addr::LOCALHOST,
            local_port: 4737,
            vendor_id: "ipdr-collector".to_string(),
            keepalive_interval: 300,
            session_ids: Vec::new(),
            close_on_keepalive_timeout: false,
        }
    }
}
