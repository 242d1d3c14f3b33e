//! Once-per-day reference data a symbol's snapshots depend on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::SymbolId;

/// Daily baseline for a symbol: price limits, share counts, and trailing
/// averages fetched from the symbol's reference page before market open.
///
/// Exactly one row exists per (symbol, trading day); immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBaseline {
    /// Owning symbol.
    pub symbol_id: SymbolId,
    /// Trading day this baseline covers.
    pub day: NaiveDate,
    /// Daily price ceiling.
    pub tmax: i64,
    /// Daily price floor.
    pub tmin: i64,
    /// Outstanding share count.
    pub stock_number: i64,
    /// Base volume reported by the source.
    pub base_volume: i64,
    /// Floating-share ratio.
    pub floating_stock: f64,
    /// 5-day average transaction volume.
    pub total_transaction_average: f64,
    /// Trailing estimated EPS.
    pub eps: i64,
    /// Sector price/earnings ratio, when reported.
    pub sector_pe: Option<f64>,
}
