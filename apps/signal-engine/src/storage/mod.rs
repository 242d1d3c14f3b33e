//! Storage ports.
//!
//! Persistence technology is an external collaborator: components depend on
//! these traits, not on a concrete store. The crate ships in-memory
//! implementations (see [`memory`]) used by tests and development; a
//! relational/key-value binding plugs in behind the same ports.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    DailyBaseline, FilterEntitlement, HistoryRecord, Snapshot, Symbol, SymbolId,
};

pub mod chart;
pub mod memory;

pub use chart::ChartStore;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-level failure (connection, query, serialization).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Symbol repository.
#[async_trait]
pub trait SymbolRepository: Send + Sync {
    /// Insert newly discovered symbols, ignoring id conflicts.
    /// Returns the number actually inserted.
    async fn insert_many(&self, symbols: Vec<Symbol>) -> Result<usize, StorageError>;

    /// Fetch a symbol by id.
    async fn get(&self, id: &str) -> Result<Option<Symbol>, StorageError>;

    /// All administratively enabled symbols.
    async fn list_enabled(&self) -> Result<Vec<Symbol>, StorageError>;

    /// Symbols eligible for live ingestion (enabled, allowed, script set).
    async fn list_ingestible(&self) -> Result<Vec<Symbol>, StorageError>;

    /// Symbols with a script code that are currently disallowed.
    async fn list_disallowed(&self) -> Result<Vec<Symbol>, StorageError>;

    /// Refresh script code, sector, and market from reference data.
    async fn update_reference(
        &self,
        id: &str,
        script: Option<u32>,
        group_name: &str,
        market: &str,
    ) -> Result<(), StorageError>;

    /// Flip the allowed flag.
    async fn set_allowed(&self, id: &str, allowed: bool) -> Result<(), StorageError>;

    /// Re-enable every disallowed symbol. Returns the number flipped.
    async fn allow_all(&self) -> Result<usize, StorageError>;
}

/// Daily baseline repository.
#[async_trait]
pub trait BaselineRepository: Send + Sync {
    /// Insert one baseline row; at most one exists per (symbol, day).
    async fn insert(&self, baseline: DailyBaseline) -> Result<(), StorageError>;

    /// The baseline for a symbol on a given day, if bootstrapped.
    async fn for_day(
        &self,
        symbol_id: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyBaseline>, StorageError>;

    /// Symbols that already have a baseline for the given day.
    async fn symbols_for_day(&self, day: NaiveDate) -> Result<Vec<SymbolId>, StorageError>;
}

/// Intraday snapshot repository.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Append a snapshot, returning its assigned id.
    async fn insert(&self, snapshot: Snapshot) -> Result<u64, StorageError>;

    /// The most recent snapshot per symbol.
    async fn latest_per_symbol(&self) -> Result<Vec<Snapshot>, StorageError>;

    /// The last two snapshots for a symbol, newest first.
    async fn last_two(&self, symbol_id: &str) -> Result<Vec<Snapshot>, StorageError>;

    /// Symbols with at least `min_count` snapshots created since `since`.
    async fn symbols_active_since(
        &self,
        since: DateTime<Utc>,
        min_count: usize,
    ) -> Result<Vec<SymbolId>, StorageError>;

    /// Symbols with at least `min_count` snapshots overall.
    async fn symbols_with_min_count(&self, min_count: usize)
        -> Result<Vec<SymbolId>, StorageError>;

    /// Per symbol, the highest snapshot id at or before the cutoff time and
    /// the highest id after it (the open/close session partitions).
    async fn session_partitions(
        &self,
        cutoff: NaiveTime,
    ) -> Result<HashMap<SymbolId, Vec<u64>>, StorageError>;

    /// Fetch snapshots by id, ordered by id ascending.
    async fn by_ids_ordered(&self, ids: &[u64]) -> Result<Vec<Snapshot>, StorageError>;

    /// Delete every snapshot row. Returns the number deleted.
    async fn delete_all(&self) -> Result<usize, StorageError>;
}

/// History repository.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Bulk-insert records; (symbol, day) conflicts are ignored.
    /// Returns the number actually inserted.
    async fn insert_many(&self, records: Vec<HistoryRecord>) -> Result<usize, StorageError>;

    /// The most recent history record per symbol.
    async fn latest_per_symbol(&self) -> Result<Vec<HistoryRecord>, StorageError>;

    /// Per symbol, the (min, max) of `pl` over records on or after `since`,
    /// restricted to symbols where max > min.
    async fn price_band_since(
        &self,
        since: NaiveDate,
    ) -> Result<HashMap<SymbolId, (i64, i64)>, StorageError>;

    /// Per symbol, (date, pc, tvol) points on or after `since`, date-ordered.
    async fn series_since(
        &self,
        since: NaiveDate,
    ) -> Result<HashMap<SymbolId, Vec<(NaiveDate, i64, i64)>>, StorageError>;
}

/// Filter-definition repository, read-only to the engine and gateway.
#[async_trait]
pub trait FilterRepository: Send + Sync {
    /// Entitlement for an enabled filter in an enabled category, or `None`
    /// when the code is unknown or disabled.
    async fn entitlement(&self, code: &str) -> Result<Option<FilterEntitlement>, StorageError>;
}

/// Key-value store with per-key TTLs.
///
/// Backs the dedup hash markers, chart blobs, cached filter results, the
/// distribution day-touch markers, tickets, and scheduler leases.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store a value, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>)
        -> Result<(), StorageError>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Atomic read-and-delete; the single-use ticket primitive.
    async fn take(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store only when the key is absent. Returns whether the write won;
    /// the lease primitive for single-instance sweeps.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;
}
