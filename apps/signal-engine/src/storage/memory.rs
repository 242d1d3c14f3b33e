//! In-memory implementations of the storage ports.
//!
//! Suitable for tests and development. Not for production use.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::{
    DailyBaseline, FilterCategory, FilterDefinition, FilterEntitlement, HistoryRecord, Snapshot,
    Symbol, SymbolId,
};

use super::{
    BaselineRepository, FilterRepository, HistoryRepository, KeyValueStore, SnapshotRepository,
    StorageError, SymbolRepository,
};

/// In-memory symbol repository.
#[derive(Debug, Default)]
pub struct InMemorySymbolRepository {
    symbols: RwLock<HashMap<SymbolId, Symbol>>,
}

impl InMemorySymbolRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}

#[async_trait]
impl SymbolRepository for InMemorySymbolRepository {
    async fn insert_many(&self, symbols: Vec<Symbol>) -> Result<usize, StorageError> {
        let mut map = self.symbols.write();
        let mut inserted = 0;
        for symbol in symbols {
            if !map.contains_key(&symbol.id) {
                map.insert(symbol.id.clone(), symbol);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get(&self, id: &str) -> Result<Option<Symbol>, StorageError> {
        Ok(self.symbols.read().get(id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<Symbol>, StorageError> {
        let mut out: Vec<Symbol> = self
            .symbols
            .read()
            .values()
            .filter(|s| s.is_enable)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_ingestible(&self) -> Result<Vec<Symbol>, StorageError> {
        let mut out: Vec<Symbol> = self
            .symbols
            .read()
            .values()
            .filter(|s| s.is_ingestible())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_disallowed(&self) -> Result<Vec<Symbol>, StorageError> {
        let mut out: Vec<Symbol> = self
            .symbols
            .read()
            .values()
            .filter(|s| s.script.is_some() && !s.is_allowed)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn update_reference(
        &self,
        id: &str,
        script: Option<u32>,
        group_name: &str,
        market: &str,
    ) -> Result<(), StorageError> {
        if let Some(symbol) = self.symbols.write().get_mut(id) {
            symbol.script = script;
            symbol.group_name = group_name.to_string();
            symbol.market = market.to_string();
        }
        Ok(())
    }

    async fn set_allowed(&self, id: &str, allowed: bool) -> Result<(), StorageError> {
        if let Some(symbol) = self.symbols.write().get_mut(id) {
            symbol.is_allowed = allowed;
        }
        Ok(())
    }

    async fn allow_all(&self) -> Result<usize, StorageError> {
        let mut flipped = 0;
        for symbol in self.symbols.write().values_mut() {
            if !symbol.is_allowed {
                symbol.is_allowed = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

/// In-memory baseline repository.
#[derive(Debug, Default)]
pub struct InMemoryBaselineRepository {
    baselines: RwLock<Vec<DailyBaseline>>,
}

impl InMemoryBaselineRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaselineRepository for InMemoryBaselineRepository {
    async fn insert(&self, baseline: DailyBaseline) -> Result<(), StorageError> {
        let mut rows = self.baselines.write();
        let exists = rows
            .iter()
            .any(|b| b.symbol_id == baseline.symbol_id && b.day == baseline.day);
        if !exists {
            rows.push(baseline);
        }
        Ok(())
    }

    async fn for_day(
        &self,
        symbol_id: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyBaseline>, StorageError> {
        Ok(self
            .baselines
            .read()
            .iter()
            .find(|b| b.symbol_id == symbol_id && b.day == day)
            .cloned())
    }

    async fn symbols_for_day(&self, day: NaiveDate) -> Result<Vec<SymbolId>, StorageError> {
        Ok(self
            .baselines
            .read()
            .iter()
            .filter(|b| b.day == day)
            .map(|b| b.symbol_id.clone())
            .collect())
    }
}

/// In-memory snapshot repository with auto-incrementing ids.
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    inner: RwLock<SnapshotRows>,
}

#[derive(Debug, Default)]
struct SnapshotRows {
    rows: Vec<Snapshot>,
    next_id: u64,
}

impl InMemorySnapshotRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn insert(&self, mut snapshot: Snapshot) -> Result<u64, StorageError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        snapshot.id = inner.next_id;
        let id = snapshot.id;
        inner.rows.push(snapshot);
        Ok(id)
    }

    async fn latest_per_symbol(&self) -> Result<Vec<Snapshot>, StorageError> {
        let inner = self.inner.read();
        let mut latest: HashMap<&str, &Snapshot> = HashMap::new();
        for row in &inner.rows {
            let entry = latest.entry(row.symbol_id.as_str()).or_insert(row);
            if row.id > entry.id {
                *entry = row;
            }
        }
        let mut out: Vec<Snapshot> = latest.values().map(|s| (*s).clone()).collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    async fn last_two(&self, symbol_id: &str) -> Result<Vec<Snapshot>, StorageError> {
        let inner = self.inner.read();
        let mut rows: Vec<&Snapshot> = inner
            .rows
            .iter()
            .filter(|s| s.symbol_id == symbol_id)
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows.into_iter().take(2).cloned().collect())
    }

    async fn symbols_active_since(
        &self,
        since: DateTime<Utc>,
        min_count: usize,
    ) -> Result<Vec<SymbolId>, StorageError> {
        let inner = self.inner.read();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &inner.rows {
            if row.created_time >= since {
                *counts.entry(row.symbol_id.as_str()).or_default() += 1;
            }
        }
        let mut out: Vec<SymbolId> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(id, _)| id.to_string())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn symbols_with_min_count(
        &self,
        min_count: usize,
    ) -> Result<Vec<SymbolId>, StorageError> {
        let inner = self.inner.read();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &inner.rows {
            *counts.entry(row.symbol_id.as_str()).or_default() += 1;
        }
        let mut out: Vec<SymbolId> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(id, _)| id.to_string())
            .collect();
        out.sort();
        Ok(out)
    }

    async fn session_partitions(
        &self,
        cutoff: NaiveTime,
    ) -> Result<HashMap<SymbolId, Vec<u64>>, StorageError> {
        let inner = self.inner.read();
        // (max id at/before cutoff, max id after cutoff) per symbol
        let mut brackets: HashMap<&str, (Option<u64>, Option<u64>)> = HashMap::new();
        for row in &inner.rows {
            let entry = brackets.entry(row.symbol_id.as_str()).or_default();
            let slot = if row.checksum_time <= cutoff {
                &mut entry.0
            } else {
                &mut entry.1
            };
            if slot.is_none_or(|id| row.id > id) {
                *slot = Some(row.id);
            }
        }
        Ok(brackets
            .into_iter()
            .map(|(symbol_id, (before, after))| {
                let mut ids: Vec<u64> = [before, after].into_iter().flatten().collect();
                ids.sort_unstable();
                (symbol_id.to_string(), ids)
            })
            .collect())
    }

    async fn by_ids_ordered(&self, ids: &[u64]) -> Result<Vec<Snapshot>, StorageError> {
        let inner = self.inner.read();
        let mut out: Vec<Snapshot> = inner
            .rows
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    async fn delete_all(&self) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let deleted = inner.rows.len();
        inner.rows.clear();
        Ok(deleted)
    }
}

/// In-memory history repository with auto-incrementing ids.
#[derive(Debug, Default)]
pub struct InMemoryHistoryRepository {
    inner: RwLock<HistoryRows>,
}

#[derive(Debug, Default)]
struct HistoryRows {
    rows: Vec<HistoryRecord>,
    next_id: u64,
}

impl InMemoryHistoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn insert_many(&self, records: Vec<HistoryRecord>) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let mut inserted = 0;
        for mut record in records {
            let conflict = inner
                .rows
                .iter()
                .any(|r| r.symbol_id == record.symbol_id && r.stat_date == record.stat_date);
            if conflict {
                continue;
            }
            inner.next_id += 1;
            record.id = inner.next_id;
            inner.rows.push(record);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn latest_per_symbol(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let inner = self.inner.read();
        let mut latest: HashMap<&str, &HistoryRecord> = HashMap::new();
        for row in &inner.rows {
            let entry = latest.entry(row.symbol_id.as_str()).or_insert(row);
            if row.id > entry.id {
                *entry = row;
            }
        }
        let mut out: Vec<HistoryRecord> = latest.values().map(|r| (*r).clone()).collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    async fn price_band_since(
        &self,
        since: NaiveDate,
    ) -> Result<HashMap<SymbolId, (i64, i64)>, StorageError> {
        let inner = self.inner.read();
        let mut bands: HashMap<&str, (i64, i64)> = HashMap::new();
        for row in &inner.rows {
            if row.stat_date < since {
                continue;
            }
            let entry = bands
                .entry(row.symbol_id.as_str())
                .or_insert((row.pl, row.pl));
            entry.0 = entry.0.min(row.pl);
            entry.1 = entry.1.max(row.pl);
        }
        Ok(bands
            .into_iter()
            .filter(|(_, (min, max))| max > min)
            .map(|(id, band)| (id.to_string(), band))
            .collect())
    }

    async fn series_since(
        &self,
        since: NaiveDate,
    ) -> Result<HashMap<SymbolId, Vec<(NaiveDate, i64, i64)>>, StorageError> {
        let inner = self.inner.read();
        let mut series: HashMap<SymbolId, Vec<(NaiveDate, i64, i64)>> = HashMap::new();
        for row in &inner.rows {
            if row.stat_date >= since {
                series
                    .entry(row.symbol_id.clone())
                    .or_default()
                    .push((row.stat_date, row.pc, row.tvol));
            }
        }
        for points in series.values_mut() {
            points.sort_by_key(|(date, _, _)| *date);
        }
        Ok(series)
    }
}

/// In-memory filter catalog.
#[derive(Debug, Default)]
pub struct InMemoryFilterRepository {
    categories: RwLock<Vec<FilterCategory>>,
    definitions: RwLock<Vec<FilterDefinition>>,
}

impl InMemoryFilterRepository {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog seeded with categories and definitions.
    #[must_use]
    pub fn seeded(categories: Vec<FilterCategory>, definitions: Vec<FilterDefinition>) -> Self {
        Self {
            categories: RwLock::new(categories),
            definitions: RwLock::new(definitions),
        }
    }

    /// Flip a filter's enable flag (test/admin helper).
    pub fn set_enabled(&self, code: &str, enabled: bool) {
        for definition in self.definitions.write().iter_mut() {
            if definition.code == code {
                definition.is_enable = enabled;
            }
        }
    }
}

#[async_trait]
impl FilterRepository for InMemoryFilterRepository {
    async fn entitlement(&self, code: &str) -> Result<Option<FilterEntitlement>, StorageError> {
        let definitions = self.definitions.read();
        let Some(definition) = definitions.iter().find(|d| d.code == code && d.is_enable) else {
            return Ok(None);
        };
        let categories = self.categories.read();
        Ok(categories
            .iter()
            .find(|c| c.id == definition.category_id && c.is_enable)
            .map(|c| FilterEntitlement { is_free: c.is_free }))
    }
}

/// In-memory key-value store with per-key expiry.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, KvEntry>>,
}

#[derive(Debug, Clone)]
struct KvEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl InMemoryKeyValueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        self.entries.write().insert(
            key.to_string(),
            KvEntry {
                value,
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self.entries.write().remove(key);
        Ok(removed.is_some_and(|e| !e.is_expired()))
    }

    async fn take(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let removed = self.entries.write().remove(key);
        Ok(removed.filter(|e| !e.is_expired()).map(|e| e.value))
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let mut entries = self.entries.write();
        let live = entries.get(key).is_some_and(|e| !e.is_expired());
        if live {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            KvEntry {
                value,
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(true)
    }
}
