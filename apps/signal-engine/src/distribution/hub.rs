//! Broadcast fan-out for published signal results.
//!
//! Two lossy broadcast groups: `open` for everyone, `gated` for entitled
//! subscribers. Slow receivers lag and observe drops; the hub never blocks
//! the publisher.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// One published filter result.
#[derive(Debug, Clone, Serialize)]
pub struct SignalEnvelope {
    /// Filter code the rows belong to.
    pub filter_code: String,
    /// Display-ready rows.
    pub rows: Vec<Vec<Value>>,
}

/// The two-group signal fan-out.
pub struct SignalHub {
    open: broadcast::Sender<SignalEnvelope>,
    gated: broadcast::Sender<SignalEnvelope>,
}

impl SignalHub {
    /// Create a hub with the given per-group channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (open, _) = broadcast::channel(capacity);
        let (gated, _) = broadcast::channel(capacity);
        Self { open, gated }
    }

    /// Subscribe to the open group.
    #[must_use]
    pub fn subscribe_open(&self) -> broadcast::Receiver<SignalEnvelope> {
        self.open.subscribe()
    }

    /// Subscribe to the gated group.
    #[must_use]
    pub fn subscribe_gated(&self) -> broadcast::Receiver<SignalEnvelope> {
        self.gated.subscribe()
    }

    /// Publish to the open group; returns receivers reached.
    pub fn publish_open(&self, envelope: SignalEnvelope) -> usize {
        self.open.send(envelope).unwrap_or(0)
    }

    /// Publish to the gated group; returns receivers reached.
    pub fn publish_gated(&self, envelope: SignalEnvelope) -> usize {
        self.gated.send(envelope).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope() -> SignalEnvelope {
        SignalEnvelope {
            filter_code: "ceiling_queue".to_string(),
            rows: vec![vec![json!("FOO"), json!("5,000")]],
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_envelopes() {
        let hub = SignalHub::new(8);
        let mut open = hub.subscribe_open();

        assert_eq!(hub.publish_open(envelope()), 1);
        let received = open.recv().await.unwrap();
        assert_eq!(received.filter_code, "ceiling_queue");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_reaches_nobody() {
        let hub = SignalHub::new(8);
        assert_eq!(hub.publish_gated(envelope()), 0);
    }

    #[tokio::test]
    async fn groups_are_independent() {
        let hub = SignalHub::new(8);
        let mut gated = hub.subscribe_gated();

        hub.publish_open(envelope());
        assert!(gated.try_recv().is_err());

        hub.publish_gated(envelope());
        assert!(gated.try_recv().is_ok());
    }
}
