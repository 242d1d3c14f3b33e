//! The distribution gateway: cache, entitle, and broadcast filter results.
//!
//! Results are cached per filter code so late subscribers can fetch the
//! current table, and broadcast through the hub for live listeners. Caches
//! roll over at the first publish of a new day.

use std::sync::Arc;

use chrono::Local;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::PublishError;
use crate::storage::{FilterRepository, KeyValueStore};

use super::hub::{SignalEnvelope, SignalHub};

/// The one filter whose results accumulate across the day instead of being
/// replaced, with a repeat counter per (name, side).
const ACCUMULATING_FILTER: &str = "unusual_money_flow";

/// Columns compared for exact-duplicate suppression in the accumulating
/// filter; the cached rows carry one extra counter column.
const ACCUMULATING_WIDTH: usize = 8;

/// Publishes filter results to the cache and the broadcast groups.
pub struct DistributionGateway {
    filters: Arc<dyn FilterRepository>,
    kv: Arc<dyn KeyValueStore>,
    hub: Arc<SignalHub>,
}

impl DistributionGateway {
    /// Wire the gateway to its collaborators.
    #[must_use]
    pub fn new(
        filters: Arc<dyn FilterRepository>,
        kv: Arc<dyn KeyValueStore>,
        hub: Arc<SignalHub>,
    ) -> Self {
        Self { filters, kv, hub }
    }

    /// Publish one filter's formatted rows.
    ///
    /// Empty results and unknown or disabled filters are logged no-ops.
    /// Broadcasting to zero receivers is not an error. Returns the number
    /// of rows in the published table.
    pub async fn publish(&self, code: &str, rows: Vec<Vec<Value>>) -> Result<usize, PublishError> {
        self.touch(code).await?;

        if rows.is_empty() {
            debug!(filter = code, "no matches, nothing to publish");
            return Ok(0);
        }
        let Some(entitlement) = self.filters.entitlement(code).await? else {
            warn!(filter = code, "unknown or disabled filter, dropping result");
            return Ok(0);
        };

        let rows = if code == ACCUMULATING_FILTER {
            self.merge_accumulating(code, rows).await?
        } else {
            rows
        };
        self.kv.set(code, json!(rows), None).await?;

        let envelope = SignalEnvelope {
            filter_code: code.to_string(),
            rows: rows.clone(),
        };
        let reached = self.hub.publish_open(envelope.clone());
        if reached == 0 {
            debug!(filter = code, "no open subscribers");
        }
        if !entitlement.is_free {
            self.hub.publish_gated(envelope);
        }
        Ok(rows.len())
    }

    /// Fetch the cached table for a filter code.
    pub async fn cached(&self, code: &str) -> Result<Vec<Vec<Value>>, PublishError> {
        let value = self.kv.get(code).await?;
        Ok(value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    /// Roll the cache over on the first publish of a new day.
    async fn touch(&self, code: &str) -> Result<(), PublishError> {
        let today = Local::now().date_naive().to_string();
        let marker_key = format!("{code}_last_touched");
        let marker = self.kv.get(&marker_key).await?;
        if marker.as_ref().and_then(Value::as_str) != Some(today.as_str()) {
            self.kv.delete(code).await?;
            self.kv.set(&marker_key, json!(today), None).await?;
        }
        Ok(())
    }

    /// Merge new rows into the day's accumulated table, newest first.
    ///
    /// Rows already present (same leading cells) are dropped; genuinely new
    /// rows get a counter of one more than the highest counter among cached
    /// rows with the same name and side.
    async fn merge_accumulating(
        &self,
        code: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<Vec<Vec<Value>>, PublishError> {
        let cached = self.cached(code).await?;

        let mut merged = Vec::with_capacity(rows.len() + cached.len());
        for mut row in rows {
            let width = row.len().min(ACCUMULATING_WIDTH);
            let duplicate = cached
                .iter()
                .any(|old| old.len() > width && old[..width] == row[..width]);
            if duplicate {
                continue;
            }
            let counter = cached
                .iter()
                .filter(|old| old.get(1) == row.get(1) && old.get(2) == row.get(2))
                .filter_map(|old| old.get(ACCUMULATING_WIDTH).and_then(Value::as_i64))
                .max()
                .map_or(1, |c| (c + 1).max(1));
            row.push(json!(counter));
            merged.push(row);
        }
        merged.extend(cached);
        merged.sort_by(|a, b| {
            let ka = a.first().and_then(Value::as_str).unwrap_or("");
            let kb = b.first().and_then(Value::as_str).unwrap_or("");
            kb.cmp(ka)
        });
        Ok(merged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::domain::filter::standard_catalog;
    use crate::storage::memory::{InMemoryFilterRepository, InMemoryKeyValueStore};

    use super::*;

    fn gateway() -> (DistributionGateway, Arc<SignalHub>, Arc<InMemoryKeyValueStore>) {
        let (categories, definitions) = standard_catalog();
        let filters = Arc::new(InMemoryFilterRepository::seeded(categories, definitions));
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let hub = Arc::new(SignalHub::new(16));
        let gateway = DistributionGateway::new(filters, kv.clone(), hub.clone());
        (gateway, hub, kv)
    }

    fn unusual_row(name: &str, side: &str) -> Vec<Value> {
        vec![
            json!("11:05:09"),
            json!(name),
            json!(side),
            json!("2.5 B"),
            json!("1.2 B"),
            json!("0.4 B"),
            json!("3"),
            json!("5,000"),
        ]
    }

    #[tokio::test]
    async fn empty_results_publish_nothing() {
        let (gateway, hub, _) = gateway();
        gateway
            .publish("ceiling_queue", vec![vec![json!("FOO")]])
            .await
            .unwrap();
        let mut open = hub.subscribe_open();

        let published = gateway.publish("ceiling_queue", Vec::new()).await.unwrap();

        assert_eq!(published, 0);
        assert!(open.try_recv().is_err());
        // the cached table from the previous round is untouched
        let cached = gateway.cached("ceiling_queue").await.unwrap();
        assert_eq!(cached, vec![vec![json!("FOO")]]);
    }

    #[tokio::test]
    async fn unknown_and_disabled_filters_are_dropped() {
        let (categories, definitions) = standard_catalog();
        let filters = Arc::new(InMemoryFilterRepository::seeded(categories, definitions));
        filters.set_enabled("swing_break", false);
        let gateway = DistributionGateway::new(
            filters,
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(SignalHub::new(16)),
        );

        let rows = vec![vec![json!("FOO")]];
        assert_eq!(gateway.publish("no_such_filter", rows.clone()).await.unwrap(), 0);
        assert_eq!(gateway.publish("swing_break", rows).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn plain_filters_replace_the_cached_table() {
        let (gateway, _, _) = gateway();

        gateway
            .publish("ceiling_queue", vec![vec![json!("FOO")]])
            .await
            .unwrap();
        gateway
            .publish("ceiling_queue", vec![vec![json!("BAR")]])
            .await
            .unwrap();

        let cached = gateway.cached("ceiling_queue").await.unwrap();
        assert_eq!(cached, vec![vec![json!("BAR")]]);
    }

    #[tokio::test]
    async fn free_filters_broadcast_on_the_open_group_only() {
        let (gateway, hub, _) = gateway();
        let mut open = hub.subscribe_open();
        let mut gated = hub.subscribe_gated();

        gateway
            .publish("ceiling_queue", vec![vec![json!("FOO")]])
            .await
            .unwrap();

        assert!(open.try_recv().is_ok());
        assert!(gated.try_recv().is_err());
    }

    #[tokio::test]
    async fn gated_filters_broadcast_on_both_groups() {
        let (gateway, hub, _) = gateway();
        let mut open = hub.subscribe_open();
        let mut gated = hub.subscribe_gated();

        gateway
            .publish("swing_break", vec![vec![json!("FOO")]])
            .await
            .unwrap();

        assert!(open.try_recv().is_ok());
        assert_eq!(gated.try_recv().unwrap().filter_code, "swing_break");
    }

    #[tokio::test]
    async fn accumulating_filter_counts_repeats_and_drops_duplicates() {
        let (gateway, _, _) = gateway();

        let first = gateway
            .publish("unusual_money_flow", vec![unusual_row("FOO", "buy")])
            .await
            .unwrap();
        assert_eq!(first, 1);

        // exact duplicate: dropped, table unchanged
        let second = gateway
            .publish("unusual_money_flow", vec![unusual_row("FOO", "buy")])
            .await
            .unwrap();
        assert_eq!(second, 1);

        // same name and side but a different tick: counter increments
        let mut changed = unusual_row("FOO", "buy");
        changed[0] = json!("11:06:10");
        let third = gateway
            .publish("unusual_money_flow", vec![changed])
            .await
            .unwrap();
        assert_eq!(third, 2);

        let cached = gateway.cached("unusual_money_flow").await.unwrap();
        assert_eq!(cached[0][0], json!("11:06:10"));
        assert_eq!(cached[0][8], json!(2));
        assert_eq!(cached[1][8], json!(1));
    }

    #[tokio::test]
    async fn accumulated_rows_stay_newest_first() {
        let (gateway, _, _) = gateway();

        let mut early = unusual_row("FOO", "buy");
        early[0] = json!("09:59:00");
        let mut late = unusual_row("BAR", "sell");
        late[0] = json!("10:05:00");

        // rows arrive oldest first within the round
        gateway
            .publish("unusual_money_flow", vec![early, late])
            .await
            .unwrap();

        let mut next = unusual_row("FOO", "buy");
        next[0] = json!("10:12:00");
        gateway
            .publish("unusual_money_flow", vec![next])
            .await
            .unwrap();

        let cached = gateway.cached("unusual_money_flow").await.unwrap();
        let clocks: Vec<_> = cached.iter().map(|row| row[0].clone()).collect();
        assert_eq!(
            clocks,
            vec![json!("10:12:00"), json!("10:05:00"), json!("09:59:00")]
        );
    }

    #[tokio::test]
    async fn a_new_day_clears_the_cached_table() {
        let (gateway, _, kv) = gateway();

        kv.set("unusual_money_flow", json!([["stale"]]), None)
            .await
            .unwrap();
        kv.set(
            "unusual_money_flow_last_touched",
            json!("2020-01-01"),
            None,
        )
        .await
        .unwrap();

        gateway
            .publish("unusual_money_flow", vec![unusual_row("FOO", "buy")])
            .await
            .unwrap();

        let cached = gateway.cached("unusual_money_flow").await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0][1], json!("FOO"));
    }
}
