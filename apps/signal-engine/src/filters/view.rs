//! The shared point-in-time view filters evaluate against.
//!
//! Built once per filter round so every rule sees the same market state,
//! then handed to the rules as plain data.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};

use crate::domain::{Snapshot, SymbolId};
use crate::error::IngestError;
use crate::storage::{HistoryRepository, SnapshotRepository, SymbolRepository};

/// How far back a symbol must have ticked to count as recently active.
const RECENT_WINDOW_MINUTES: i64 = 5;
/// Minimum ticks inside the recent window.
const RECENT_MIN_TICKS: usize = 2;
/// Lookback for the low-band price positioning.
const BAND_DAYS: i64 = 30;

/// A symbol's latest snapshot joined with its display fields.
#[derive(Debug, Clone)]
pub struct LatestStat {
    /// Owning symbol.
    pub symbol_id: SymbolId,
    /// Ticker name.
    pub name: String,
    /// Sector name.
    pub group_name: String,
    /// The latest snapshot.
    pub stat: Snapshot,
}

/// Point-in-time inputs for one filter round.
pub struct FilterContext {
    /// Latest snapshot per enabled symbol.
    pub latest: Vec<LatestStat>,
    /// Last two snapshots (newer, older) for symbols that have both.
    pub last_pairs: HashMap<SymbolId, (Snapshot, Snapshot)>,
    /// Symbols with fresh ticks inside the recent window.
    pub recent_active: HashSet<SymbolId>,
    /// Symbols whose last history record closed at the ceiling.
    pub yesterday_limit_up: HashSet<SymbolId>,
    /// Per symbol (min, max) of `pl` over the band lookback, where max > min.
    pub band_30d: HashMap<SymbolId, (i64, i64)>,
    /// Evaluation timestamp.
    pub now: DateTime<Utc>,
    names: HashMap<SymbolId, String>,
}

impl FilterContext {
    /// Assemble the view from the stores.
    pub async fn build(
        symbols: &Arc<dyn SymbolRepository>,
        snapshots: &Arc<dyn SnapshotRepository>,
        history: &Arc<dyn HistoryRepository>,
    ) -> Result<Self, IngestError> {
        let now = Utc::now();

        let enabled: HashMap<SymbolId, _> = symbols
            .list_enabled()
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let names: HashMap<SymbolId, String> = enabled
            .values()
            .map(|s| (s.id.clone(), s.name.clone()))
            .collect();

        let latest = snapshots
            .latest_per_symbol()
            .await?
            .into_iter()
            .filter_map(|stat| {
                let symbol = enabled.get(&stat.symbol_id)?;
                Some(LatestStat {
                    symbol_id: symbol.id.clone(),
                    name: symbol.name.clone(),
                    group_name: symbol.group_name.clone(),
                    stat,
                })
            })
            .collect();

        let mut last_pairs = HashMap::new();
        for symbol_id in snapshots.symbols_with_min_count(2).await? {
            let two = snapshots.last_two(&symbol_id).await?;
            if let [newer, older] = two.as_slice() {
                last_pairs.insert(symbol_id, (newer.clone(), older.clone()));
            }
        }

        let recent_active = snapshots
            .symbols_active_since(now - Duration::minutes(RECENT_WINDOW_MINUTES), RECENT_MIN_TICKS)
            .await?
            .into_iter()
            .collect();

        let yesterday_limit_up = history
            .latest_per_symbol()
            .await?
            .into_iter()
            .filter(|record| record.pl == record.tmax)
            .map(|record| record.symbol_id)
            .collect();

        let band_since = Local::now().date_naive() - Duration::days(BAND_DAYS);
        let band_30d = history.price_band_since(band_since).await?;

        Ok(Self {
            latest,
            last_pairs,
            recent_active,
            yesterday_limit_up,
            band_30d,
            now,
            names,
        })
    }

    /// Ticker name for a symbol, when known.
    #[must_use]
    pub fn name_of(&self, symbol_id: &str) -> Option<&str> {
        self.names.get(symbol_id).map(String::as_str)
    }

    /// Build a context directly from parts (test seam).
    #[must_use]
    pub fn from_parts(
        latest: Vec<LatestStat>,
        last_pairs: HashMap<SymbolId, (Snapshot, Snapshot)>,
        recent_active: HashSet<SymbolId>,
        yesterday_limit_up: HashSet<SymbolId>,
        band_30d: HashMap<SymbolId, (i64, i64)>,
    ) -> Self {
        let names = latest
            .iter()
            .map(|l| (l.symbol_id.clone(), l.name.clone()))
            .collect();
        Self {
            latest,
            last_pairs,
            recent_active,
            yesterday_limit_up,
            band_30d,
            now: Utc::now(),
            names,
        }
    }
}
