//! End-of-day compaction of intraday snapshots into history records.
//!
//! Each symbol's day collapses to at most two selected snapshots: the last
//! one at or before the session cutoff (the opening bracket) and the last
//! one after it (the closing bracket). Scalars come from the first selected
//! snapshot; the two order books bracket the session. After compaction the
//! intraday table is purged wholesale and disallowed symbols get a fresh
//! start for the next day.

use std::sync::Arc;

use chrono::{Duration, Local};
use serde_json::{Map, json};
use tracing::info;

use crate::config::CompactionSettings;
use crate::domain::HistoryRecord;
use crate::error::IngestError;
use crate::storage::chart::{SECTION_DAILY, SECTION_LIVE};
use crate::storage::{ChartStore, HistoryRepository, SnapshotRepository, SymbolRepository};

/// Counters from one compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// History records written (conflicts excluded).
    pub records_inserted: usize,
    /// Intraday snapshots purged.
    pub snapshots_deleted: usize,
    /// Disallowed symbols re-enabled for the next day.
    pub symbols_reallowed: usize,
}

/// Runs the end-of-day compaction.
pub struct HistoryCompactor {
    snapshots: Arc<dyn SnapshotRepository>,
    history: Arc<dyn HistoryRepository>,
    symbols: Arc<dyn SymbolRepository>,
    charts: ChartStore,
    settings: CompactionSettings,
}

impl HistoryCompactor {
    /// Wire the compactor to its collaborators.
    #[must_use]
    pub fn new(
        snapshots: Arc<dyn SnapshotRepository>,
        history: Arc<dyn HistoryRepository>,
        symbols: Arc<dyn SymbolRepository>,
        charts: ChartStore,
        settings: CompactionSettings,
    ) -> Self {
        Self {
            snapshots,
            history,
            symbols,
            charts,
            settings,
        }
    }

    /// Compact the day. Re-running after a partial failure is safe: history
    /// inserts ignore (symbol, day) conflicts and the purge is idempotent.
    pub async fn run(&self) -> Result<CompactionReport, IngestError> {
        let partitions = self.snapshots.session_partitions(self.settings.cutoff).await?;

        let mut records = Vec::with_capacity(partitions.len());
        for ids in partitions.values() {
            let selected = self.snapshots.by_ids_ordered(ids).await?;
            let Some(first) = selected.first() else {
                continue;
            };
            let mut record = HistoryRecord::from_snapshot(first);
            if let [.., last] = selected.as_slice() {
                if selected.len() > 1 {
                    record.closing_book = last.book;
                }
            }
            records.push(record);
        }

        let records_inserted = self.history.insert_many(records).await?;
        let snapshots_deleted = self.snapshots.delete_all().await?;
        let symbols_reallowed = self.symbols.allow_all().await?;
        self.rebuild_charts().await?;

        let report = CompactionReport {
            records_inserted,
            snapshots_deleted,
            symbols_reallowed,
        };
        info!(
            inserted = report.records_inserted,
            deleted = report.snapshots_deleted,
            reallowed = report.symbols_reallowed,
            "compaction finished"
        );
        Ok(report)
    }

    /// Rewrite each symbol's daily price/volume series over the rolling
    /// window and clear the live section for the next day.
    async fn rebuild_charts(&self) -> Result<(), IngestError> {
        let since =
            Local::now().date_naive() - Duration::days(self.settings.history_window_days);
        let series = self.history.series_since(since).await?;
        for (symbol_id, points) in series {
            let graph: Vec<_> = points
                .into_iter()
                .map(|(date, pc, tvol)| json!([date.to_string(), pc, tvol]))
                .collect();
            let mut daily = Map::new();
            daily.insert("price_volume_graph".to_string(), json!(graph));
            self.charts
                .update(&symbol_id, SECTION_DAILY, daily, false)
                .await?;
            self.charts
                .update(&symbol_id, SECTION_LIVE, Map::new(), true)
                .await?;
        }
        Ok(())
    }
}
