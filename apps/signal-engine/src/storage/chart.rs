//! Per-symbol chart blob maintenance.
//!
//! Each symbol owns one JSON document in the key-value store, keyed
//! `chart:{symbol_id}` and organized into named sections. Ingestion patches
//! the `sections` section on every accepted tick; the nightly compactor
//! rewrites `daily` and clears `sections` for the next trading day.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{KeyValueStore, StorageError};

/// Section holding live intraday panels.
pub const SECTION_LIVE: &str = "sections";
/// Section holding the daily price/volume series.
pub const SECTION_DAILY: &str = "daily";

/// Key within the live section whose value grows by appending points
/// instead of being replaced.
const APPEND_KEY: &str = "money_entry_graph";

/// Upper bound on appendable graph points kept per symbol.
const GRAPH_CAP: usize = 512;

/// Maintains the per-symbol chart documents.
#[derive(Clone)]
pub struct ChartStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ChartStore {
    /// Create a store over the given key-value backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(symbol_id: &str) -> String {
        format!("chart:{symbol_id}")
    }

    /// Fetch a symbol's full chart document.
    pub async fn fetch(&self, symbol_id: &str) -> Result<Option<Value>, StorageError> {
        self.kv.get(&Self::key(symbol_id)).await
    }

    /// Merge `patch` into one section of a symbol's chart document.
    ///
    /// With `clear` set the section is replaced by the patch wholesale.
    /// Otherwise patch keys overwrite section keys, except the
    /// `money_entry_graph` key whose patch value is appended as one more
    /// point, capped to the most recent [`GRAPH_CAP`] entries.
    pub async fn update(
        &self,
        symbol_id: &str,
        section: &str,
        patch: Map<String, Value>,
        clear: bool,
    ) -> Result<(), StorageError> {
        let key = Self::key(symbol_id);
        let mut blob = match self.kv.get(&key).await? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let merged = if clear {
            Value::Object(patch)
        } else {
            let mut current = match blob.remove(section) {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            for (name, value) in patch {
                if name == APPEND_KEY {
                    let mut points = match current.remove(&name) {
                        Some(Value::Array(points)) => points,
                        _ => Vec::new(),
                    };
                    points.push(value);
                    if points.len() > GRAPH_CAP {
                        let overflow = points.len() - GRAPH_CAP;
                        points.drain(..overflow);
                    }
                    current.insert(name, Value::Array(points));
                } else {
                    current.insert(name, value);
                }
            }
            Value::Object(current)
        };

        blob.insert(section.to_string(), merged);
        self.kv.set(&key, Value::Object(blob), None).await
    }
}
