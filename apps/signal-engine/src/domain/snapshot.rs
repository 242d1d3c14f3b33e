//! Intraday snapshots: one ingested tick of live trading data per symbol.
//!
//! Field names follow the source's wire vocabulary: `pl` last price, `pc`
//! close price, `pf` first price, `py` previous close, `pmax`/`pmin` day
//! high/low, `tno`/`tvol`/`tval` trade count/volume/value, `zd/qd/pd` bid
//! order-count/quantity/price and `po/qo/zo` the ask mirror, `_i`/`_n`
//! suffixes for individual (retail) vs. institutional participants.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::symbol::SymbolId;

/// One depth level of the order book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Bid order count.
    pub zd: i64,
    /// Bid quantity.
    pub qd: i64,
    /// Bid price.
    pub pd: i64,
    /// Ask price.
    pub po: i64,
    /// Ask quantity.
    pub qo: i64,
    /// Ask order count.
    pub zo: i64,
}

/// Three levels of best bid/ask.
///
/// `Default` is the documented "unset" value used when a trading day has no
/// closing bracket (single-snapshot days).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Depth levels, best first.
    pub levels: [BookLevel; 3],
}

impl OrderBook {
    /// Whether every level is zero (the unset marker).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|l| *l == BookLevel::default())
    }
}

/// One ingested tick of live trading data for a symbol.
///
/// Immutable once created; the ordered per-symbol sequence within a day is
/// the intraday series, purged wholesale by the history compactor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic row id assigned by the store (0 before insertion).
    pub id: u64,
    /// Owning symbol.
    pub symbol_id: SymbolId,
    /// Arrival time.
    pub created_time: DateTime<Utc>,
    /// Source-reported checksum time for this tick.
    pub checksum_time: NaiveTime,
    /// Trade status code (`A` normal, `AR` normal-with-restriction, others
    /// halted/invalid).
    pub status: String,

    /// Last traded price.
    pub pl: i64,
    /// Closing (weighted) price.
    pub pc: i64,
    /// First price of the day.
    pub pf: i64,
    /// Previous day's close.
    pub py: i64,
    /// Day high.
    pub pmax: i64,
    /// Day low.
    pub pmin: i64,
    /// Trade count.
    pub tno: i64,
    /// Total traded volume.
    pub tvol: i64,
    /// Total traded value.
    pub tval: i64,

    /// Individual (retail) buy volume.
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

    /// Market value: `pc` x outstanding shares.
    pub mv: i64,
    /// Last-price change vs. previous close.
    pub plc: i64,
    /// Last-price change percentage, rounded to 2 decimals.
    pub plp: f64,
    /// Close-price change vs. previous close.
    pub pcc: i64,
    /// Close-price change percentage, rounded to 2 decimals.
    pub pcp: f64,

    /// Daily ceiling, copied from the active baseline.
    pub tmax: i64,
    /// Daily floor, copied from the active baseline.
    pub tmin: i64,
    /// Outstanding shares, copied from the active baseline.
    pub stock_number: i64,
    /// Base volume, copied from the active baseline.
    pub base_volume: i64,
    /// Floating-share ratio, copied from the active baseline.
    pub floating_stock: f64,
    /// 5-day average volume, copied from the active baseline.
    pub total_transaction_average: f64,

    /// Best bid/ask, three levels.
    pub book: OrderBook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_book_is_empty() {
        assert!(OrderBook::default().is_empty());

        let mut book = OrderBook::default();
        book.levels[0].qd = 10;
        assert!(!book.is_empty());
    }
}
