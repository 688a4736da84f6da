use std::time::Duration;

use strand_model::gateway::payload::Resume;
use tokio::time::Instant;

/// Resumable state of one shard's handshake.
///
/// Created from the ready payload; carried across reconnects until the
/// remote declares it invalid or a fatal close ends the shard.
#[derive(Clone, Debug)]
pub(crate) struct Session {
    pub id: Box<str>,
    /// Sequence number of the last frame seen, advanced before routing so a
    /// failed event cannot cost resumability.
    pub seq: u64,
    pub resume_gateway_url: Box<str>,
}

impl Session {
    pub fn new(id: String, resume_gateway_url: String) -> Self {
        Self {
            id: id.into_boxed_str(),
            seq: 0,
            resume_gateway_url: resume_gateway_url.into_boxed_str(),
        }
    }

    pub fn resume_payload(&self, token: &str) -> Resume {
        Resume::new(token.to_owned(), self.id.to_string(), self.seq)
    }
}

/// Heartbeat round-trip bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct Latency {
    sent_at: Option<Instant>,
    recent: Option<Duration>,
    acked: bool,
}

impl Latency {
    pub fn new() -> Self {
        Self {
            sent_at: None,
            recent: None,
            // no heartbeat is outstanding before the first one is sent
            acked: true,
        }
    }

    pub fn record_sent(&mut self) {
        self.sent_at = Some(Instant::now());
        self.acked = false;
    }

    pub fn record_ack(&mut self) {
        self.acked = true;

        if let Some(sent_at) = self.sent_at {
            self.recent = Some(sent_at.elapsed());
        }
    }

    /// Whether the previous heartbeat was acknowledged.
    pub fn acked(&self) -> bool {
        self.acked
    }

    pub fn recent(&self) -> Option<Duration> {
        self.recent
    }
}

#[cfg(test)]
mod tests {
    use super::{Latency, Session};

    #[test]
    fn resume_references_last_seen_sequence() {
        let mut session = Session::new("abc".to_owned(), "wss://example".to_owned());
        session.seq = 7;

        let payload = session.resume_payload("token");
        assert_eq!(payload.d.seq, 7);
        assert_eq!(payload.d.session_id, "abc");
    }

    #[test]
    fn missed_ack_is_visible() {
        let mut latency = Latency::new();
        assert!(latency.acked());

        latency.record_sent();
        assert!(!latency.acked());

        latency.record_ack();
        assert!(latency.acked());
        assert!(latency.recent().is_some());
    }
}
