//! Single-use entitlement tickets for out-of-band subscription handshakes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use crate::error::PublishError;
use crate::storage::KeyValueStore;

/// Issues and redeems short-lived single-use tickets.
///
/// A ticket is an opaque token whose stored value records whether the
/// holder is entitled to the gated group. Redemption is read-and-delete, so
/// a ticket can be consumed exactly once; unredeemed tickets expire.
pub struct TicketGate {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl TicketGate {
    /// Create a gate over the key-value store.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(token: &str) -> String {
        format!("ticket:{token}")
    }

    /// Issue a fresh ticket carrying the holder's entitlement.
    pub async fn issue(&self, entitled: bool) -> Result<String, PublishError> {
        let token = Uuid::new_v4().to_string();
        self.kv
            .set(&Self::key(&token), json!(entitled), Some(self.ttl))
            .await?;
        Ok(token)
    }

    /// Redeem a ticket. Returns the stored entitlement, or `None` when the
    /// ticket is unknown, already consumed, or expired.
    pub async fn consume(&self, token: &str) -> Result<Option<bool>, PublishError> {
        Ok(self
            .kv
            .take(&Self::key(token))
            .await?
            .and_then(|v| v.as_bool()))
    }
}
