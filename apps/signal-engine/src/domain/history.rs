//! End-of-day compacted records, one per (symbol, trading day).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{OrderBook, Snapshot};
use super::symbol::SymbolId;

/// Compacted record of a symbol's full trading day.
///
/// Scalar fields are copied from the chronologically-first selected snapshot
/// of the day; `opening_book`/`closing_book` bracket the order book at the
/// session boundary. Unique per (symbol, day); duplicate inserts are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic row id assigned by the store (0 before insertion).
    pub id: u64,
    /// Owning symbol.
    pub symbol_id: SymbolId,
    /// Trading day.
    pub stat_date: NaiveDate,
    /// Record creation time.
    pub created_time: DateTime<Utc>,

    /// Trade status at the selected snapshot.
    pub status: String,
    /// Last traded price.
    pub pl: i64,
    /// Closing price.
    pub pc: i64,
    /// First price.
    pub pf: i64,
    /// Previous close.
    pub py: i64,
    /// Day high.
    pub pmax: i64,
    /// Day low.
    pub pmin: i64,
    /// Trade count.
    pub tno: i64,
    /// Traded volume.
    pub tvol: i64,
    /// Traded value.
    pub tval: i64,
    /// Individual buy volume.
    pub buy_i_volume: i64,
    /// Institutional buy volume.
    pub buy_n_volume: i64,
    /// Individual sell volume.
    pub sell_i_volume: i64,
    /// Institutional sell volume.
    pub sell_n_volume: i64,
    /// Individual buyer count.
    pub buy_counti: i64,
    /// Institutional buyer count.
    pub buy_countn: i64,
    /// Individual seller count.
    pub sell_counti: i64,
    /// Institutional seller count.
    pub sell_countn: i64,
    /// Market value.
    pub mv: i64,
    /// Last-price change.
    pub plc: i64,
    /// Last-price change percentage.
    pub plp: f64,
    /// Close-price change.
    pub pcc: i64,
    /// Close-price change percentage.
    pub pcp: f64,
    /// Daily ceiling.
    pub tmax: i64,
    /// Daily floor.
    pub tmin: i64,
    /// Floating-share ratio.
    pub floating_stock: f64,
    /// 5-day average volume.
    pub total_transaction_average: f64,

    /// Order book captured from the opening partition's latest snapshot.
    pub opening_book: OrderBook,
    /// Order book captured from the closing partition's latest snapshot;
    /// left at `OrderBook::default()` on single-snapshot days.
    pub closing_book: OrderBook,
}

impl HistoryRecord {
    /// Build a record from the day's first selected snapshot.
    ///
    /// `closing_book` starts unset; the compactor fills it when a closing
    /// partition exists.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            id: 0,
            symbol_id: snapshot.symbol_id.clone(),
            stat_date: snapshot.created_time.date_naive(),
            created_time: Utc::now(),
            status: snapshot.status.clone(),
            pl: snapshot.pl,
            pc: snapshot.pc,
            pf: snapshot.pf,
            py: snapshot.py,
            pmax: snapshot.pmax,
            pmin: snapshot.pmin,
            tno: snapshot.tno,
            tvol: snapshot.tvol,
            tval: snapshot.tval,
            buy_i_volume: snapshot.buy_i_volume,
            buy_n_volume: snapshot.buy_n_volume,
            sell_i_volume: snapshot.sell_i_volume,
            sell_n_volume: snapshot.sell_n_volume,
            buy_counti: snapshot.buy_counti,
            buy_countn: snapshot.buy_countn,
            sell_counti: snapshot.sell_counti,
            sell_countn: snapshot.sell_countn,
            mv: snapshot.mv,
            plc: snapshot.plc,
            plp: snapshot.plp,
            pcc: snapshot.pcc,
            pcp: snapshot.pcp,
            tmax: snapshot.tmax,
            tmin: snapshot.tmin,
            floating_stock: snapshot.floating_stock,
            total_transaction_average: snapshot.total_transaction_average,
            opening_book: snapshot.book,
            closing_book: OrderBook::default(),
        }
    }
}
