//! Ingestion pipeline: discovery, daily bootstrap, live ticks, compaction.

pub mod baseline;
pub mod compactor;
pub mod discovery;
pub mod snapshot;

pub use baseline::DailyBootstrapper;
pub use compactor::{CompactionReport, HistoryCompactor};
pub use discovery::SymbolDiscovery;
pub use snapshot::{IngestOutcome, SnapshotIngestor};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub mod test_support {
    //! Fixture builders shared across unit tests.

    use chrono::{NaiveDate, NaiveTime, Utc};

    use crate::domain::{DailyBaseline, OrderBook, Snapshot};

    /// A plausible accepted snapshot with every price pinned to `pl`.
    #[must_use]
    pub fn snapshot(symbol_id: &str, pl: i64) -> Snapshot {
        Snapshot {
            id: 0,
            symbol_id: symbol_id.to_string(),
            created_time: Utc::now(),
            checksum_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            status: "A".to_string(),
            pl,
            pc: pl,
            pf: pl,
            py: pl,
            pmax: pl,
            pmin: pl,
            tno: 100,
            tvol: 1_000_000,
            tval: pl * 1_000_000,
            buy_i_volume: 600_000,
            buy_n_volume: 400_000,
            sell_i_volume: 500_000,
            sell_n_volume: 500_000,
            buy_counti: 100,
            buy_countn: 5,
            sell_counti: 80,
            sell_countn: 4,
            mv: 0,
            plc: 0,
            plp: 0.0,
            pcc: 0,
            pcp: 0.0,
            tmax: pl * 105 / 100,
            tmin: pl * 95 / 100,
            stock_number: 1_000_000_000,
            base_volume: 1_000_000,
            floating_stock: 20.0,
            total_transaction_average: 800_000.0,
            book: OrderBook::default(),
        }
    }

    /// A plausible baseline for `day`.
    #[must_use]
    pub fn baseline(symbol_id: &str, day: NaiveDate) -> DailyBaseline {
        DailyBaseline {
            symbol_id: symbol_id.to_string(),
            day,
            tmax: 5200,
            tmin: 4700,
            stock_number: 1_000_000_000,
            base_volume: 1_000_000,
            floating_stock: 20.0,
            total_transaction_average: 800_000.0,
            eps: 100,
            sector_pe: Some(7.5),
        }
    }
}
