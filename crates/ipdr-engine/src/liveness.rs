use std::time::{Duration, Instant};

/// Margin applied around the negotiated keepalive interval: we send a
/// little early and tolerate a little silence beyond it.
const KEEPALIVE_MARGIN: Duration = Duration::from_secs(2);

/// Keepalive bookkeeping for one link.
///
/// Disarmed until the exporter's response fixes the interval. The send
/// side runs [`KEEPALIVE_MARGIN`] ahead of the negotiated interval (when
/// the interval is long enough to afford it) so our probe lands before
/// the exporter's own timer expires; the receive side grants the same
/// margin beyond the interval before declaring the peer silent.
#[derive(Debug)]
pub struct Liveness {
    send_interval: Option<Duration>,
    next_send: Instant,
    receive_window: Option<Duration>,
    last_received: Instant,
}

impl Liveness {
    pub fn new(now: Instant) -> Self {
        Self {
            send_interval: None,
            next_send: now,
            receive_window: None,
            last_received: now,
        }
    }

    /// Arm both timers from the negotiated interval in seconds. Zero
    /// disables keepalives entirely.
    pub fn negotiate(&mut self, keepalive_secs: u32, now: Instant) {
        if keepalive_secs == 0 {
            self.send_interval = None;
            self.receive_window = None;
            return;
        }
        let interval = Duration::from_secs(u64::from(keepalive_secs));
        // Intervals too short to absorb the margin keep their full period.
        let send = if keepalive_secs >= 5 {
            interval - KEEPALIVE_MARGIN
        } else {
            interval
        };
        self.send_interval = Some(send);
        self.next_send = now + send;
        self.receive_window = Some(interval + KEEPALIVE_MARGIN);
        self.last_received = now;
    }

    /// Note traffic from the peer; any inbound message counts.
    pub fn observe_receive(&mut self, now: Instant) {
        self.last_received = now;
    }

    /// Note traffic to the peer; any outbound message defers the next
    /// keepalive probe.
    pub fn observe_send(&mut self, now: Instant) {
        if let Some(interval) = self.send_interval {
            self.next_send = now + interval;
        }
    }

    /// True when a keepalive probe should go out now. Advances the send
    /// timer, so each due interval reports once.
    pub fn keepalive_due(&mut self, now: Instant) -> bool {
        let Some(interval) = self.send_interval else {
            return false;
        };
        if now < self.next_send {
            return false;
        }
        self.next_send = now + interval;
        true
    }

    /// True when the peer has been silent past the receive window. Rearms
    /// the window, so each expiry reports once.
    pub fn receive_timed_out(&mut self, now: Instant) -> bool {
        let Some(window) = self.receive_window else {
            return false;
        };
        if now.duration_since(self.last_received) < window {
            return false;
        }
        self.last_received = now;
        true
    }

    /// Seconds of tolerated silence, for logging the expiry.
    pub fn silence_budget_secs(&self) -> u64 {
        self.receive_window.map(|w| w.as_secs()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_until_negotiated() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        assert!(!liveness.keepalive_due(now + Duration::from_secs(3600)));
        assert!(!liveness.receive_timed_out(now + Duration::from_secs(3600)));
    }

    #[test]
    fn zero_interval_disables_keepalives() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(0, now);
        assert!(!liveness.keepalive_due(now + Duration::from_secs(3600)));
        assert!(!liveness.receive_timed_out(now + Duration::from_secs(3600)));
    }

    #[test]
    fn send_runs_ahead_of_long_intervals() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(10, now);

        assert!(!liveness.keepalive_due(now + Duration::from_secs(7)));
        assert!(liveness.keepalive_due(now + Duration::from_secs(8)));
        // Timer advanced: not due again until another interval passes.
        assert!(!liveness.keepalive_due(now + Duration::from_secs(9)));
        assert!(liveness.keepalive_due(now + Duration::from_secs(16)));
    }

    #[test]
    fn short_intervals_keep_full_period() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(3, now);

        assert!(!liveness.keepalive_due(now + Duration::from_secs(2)));
        assert!(liveness.keepalive_due(now + Duration::from_secs(3)));
    }

    #[test]
    fn receive_timeout_fires_once_then_rearms() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(10, now);

        assert!(!liveness.receive_timed_out(now + Duration::from_secs(11)));
        let expiry = now + Duration::from_secs(12);
        assert!(liveness.receive_timed_out(expiry));
        // Rearmed from the expiry point.
        assert!(!liveness.receive_timed_out(expiry + Duration::from_secs(11)));
        assert!(liveness.receive_timed_out(expiry + Duration::from_secs(12)));
    }

    #[test]
    fn outbound_traffic_defers_the_probe() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(10, now);

        liveness.observe_send(now + Duration::from_secs(7));
        assert!(!liveness.keepalive_due(now + Duration::from_secs(14)));
        assert!(liveness.keepalive_due(now + Duration::from_secs(15)));
    }

    #[test]
    fn inbound_traffic_defers_the_timeout() {
        let now = Instant::now();
        let mut liveness = Liveness::new(now);
        liveness.negotiate(10, now);

        liveness.observe_receive(now + Duration::from_secs(11));
        assert!(!liveness.receive_timed_out(now + Duration::from_secs(20)));
        assert!(liveness.receive_timed_out(now + Duration::from_secs(23)));
    }
}
