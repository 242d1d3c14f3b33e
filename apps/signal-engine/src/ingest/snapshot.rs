//! Live-tick ingestion: fetch, gate, persist, and chart-push one symbol.

use std::sync::Arc;

use chrono::{Local, NaiveTime, Utc};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::IngestSettings;
use crate::domain::{BookLevel, DailyBaseline, OrderBook, Snapshot, Symbol};
use crate::error::IngestError;
use crate::numfmt::{billions, group_int, millions, round2};
use crate::source::field_map::{FieldValue, SECTION_PARTICIPANT, split_sections};
use crate::source::{FieldMapper, SourceClient};
use crate::storage::chart::SECTION_LIVE;
use crate::storage::{
    BaselineRepository, ChartStore, KeyValueStore, SnapshotRepository, SymbolRepository,
};

/// Statuses under which a symbol trades and its ticks are ingested.
const TRADABLE_STATUSES: [&str; 2] = ["A", "AR"];

/// Per-symbol result of one ingestion attempt.
///
/// Everything except a transport or storage failure is an outcome: sweeps
/// log and move on instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Tick accepted and persisted.
    Accepted {
        /// Row id of the stored snapshot.
        snapshot_id: u64,
    },
    /// No baseline bootstrapped for the symbol today.
    MissingBaseline,
    /// Payload shape did not match the positional contract.
    Unparsable,
    /// Content hash matched the previous tick.
    Duplicate,
    /// Symbol is not in a tradable status; it was flagged disallowed.
    Disallowed,
    /// Required fields were empty, zero, or past the quality cutoff.
    Incomplete,
    /// Tick is older than the latest stored snapshot.
    OutOfOrder,
}

/// Ingests live ticks for one symbol at a time.
pub struct SnapshotIngestor {
    client: SourceClient,
    mapper: FieldMapper,
    symbols: Arc<dyn SymbolRepository>,
    baselines: Arc<dyn BaselineRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    kv: Arc<dyn KeyValueStore>,
    charts: ChartStore,
    settings: IngestSettings,
}

impl SnapshotIngestor {
    /// Wire the ingestor to its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: SourceClient,
        symbols: Arc<dyn SymbolRepository>,
        baselines: Arc<dyn BaselineRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        kv: Arc<dyn KeyValueStore>,
        charts: ChartStore,
        settings: IngestSettings,
    ) -> Self {
        Self {
            client,
            mapper: FieldMapper::new(),
            symbols,
            baselines,
            snapshots,
            kv,
            charts,
            settings,
        }
    }

    /// Ingest one tick for `symbol`.
    ///
    /// Transport errors propagate so the caller can count retry attempts;
    /// every data-level rejection is an [`IngestOutcome`].
    pub async fn ingest(&self, symbol: &Symbol) -> Result<IngestOutcome, IngestError> {
        let today = Local::now().date_naive();
        let Some(baseline) = self.baselines.for_day(&symbol.id, today).await? else {
            debug!(symbol = %symbol.id, "no baseline for today, skipping");
            return Ok(IngestOutcome::MissingBaseline);
        };
        let Some(script) = symbol.script else {
            return Ok(IngestOutcome::Incomplete);
        };

        let payload = self.client.live_snapshot(&symbol.id, script).await?;
        let sections = split_sections(&payload);
        let Some(header) = sections.first().map(|s| s.split(',').collect::<Vec<_>>()) else {
            return Ok(IngestOutcome::Unparsable);
        };
        if header.len() < 11 {
            warn!(symbol = %symbol.id, "payload header too short");
            return Ok(IngestOutcome::Unparsable);
        }

        // Content-hash dedup against the previous tick.
        let hash = dedup_hash(&header);
        let hash_key = format!("tickhash:{}", symbol.id);
        let previous = self.kv.get(&hash_key).await?;
        if previous.as_ref().and_then(Value::as_str) == Some(hash.as_str()) {
            return Ok(IngestOutcome::Duplicate);
        }

        let fields = self.mapper.map(&payload);
        let Some(status) = fields.get("status").and_then(FieldValue::as_text) else {
            return Ok(IngestOutcome::Unparsable);
        };
        if !TRADABLE_STATUSES.contains(&status) {
            warn!(symbol = %symbol.id, status, "symbol not tradable, disallowing");
            self.symbols.set_allowed(&symbol.id, false).await?;
            return Ok(IngestOutcome::Disallowed);
        }

        // Late in the session an empty or zeroed payload means the source is
        // serving stale pages, not that the symbol is quiet.
        let after_cutoff = Local::now().time() > self.settings.quality_cutoff;
        let participant_empty = sections
            .get(SECTION_PARTICIPANT)
            .is_none_or(|s| s.trim().is_empty());
        if after_cutoff && (header_incomplete(&header) || participant_empty) {
            return Ok(IngestOutcome::Incomplete);
        }

        let int = |name: &str| fields.get(name).and_then(FieldValue::as_i64).unwrap_or(0);
        let buy_i_volume = int("buy_i_volume");
        if buy_i_volume == 0 {
            return Ok(IngestOutcome::Incomplete);
        }
        let py = int("py");
        if py == 0 {
            return Ok(IngestOutcome::Incomplete);
        }

        let Some(checksum_time) = fields
            .get("checksum_time")
            .and_then(FieldValue::as_text)
            .and_then(|raw| NaiveTime::parse_from_str(raw, "%H:%M:%S").ok())
        else {
            return Ok(IngestOutcome::Unparsable);
        };
        if let Some(latest) = self.snapshots.last_two(&symbol.id).await?.first() {
            if latest.checksum_time > checksum_time {
                debug!(symbol = %symbol.id, "stale tick, skipping");
                return Ok(IngestOutcome::OutOfOrder);
            }
        }

        let snapshot = build_snapshot(symbol, &baseline, checksum_time, status, &fields);
        let snapshot_id = self.snapshots.insert(snapshot.clone()).await?;
        self.kv
            .set(&hash_key, json!(hash), Some(self.settings.dedup_ttl))
            .await?;
        self.push_chart(&snapshot).await?;

        Ok(IngestOutcome::Accepted { snapshot_id })
    }

    /// Patch the symbol's live chart section from an accepted snapshot.
    #[allow(clippy::cast_precision_loss)]
    async fn push_chart(&self, snapshot: &Snapshot) -> Result<(), IngestError> {
        let table: Vec<Vec<String>> = snapshot
            .book
            .levels
            .iter()
            .map(|level| {
                vec![
                    group_int(level.zd),
                    group_int(level.qd),
                    group_int(level.pd),
                    group_int(level.po),
                    group_int(level.qo),
                    group_int(level.zo),
                ]
            })
            .collect();

        let per_capita = |volume: i64, count: i64| -> Option<f64> {
            (count > 0).then(|| (volume * snapshot.pc) as f64 / count as f64)
        };
        let buy_per_i = per_capita(snapshot.buy_i_volume, snapshot.buy_counti);
        let sell_per_i = per_capita(snapshot.sell_i_volume, snapshot.sell_counti);
        let buy_per_n = per_capita(snapshot.buy_n_volume, snapshot.buy_countn);
        let sell_per_n = per_capita(snapshot.sell_n_volume, snapshot.sell_countn);
        let power = |buy: Option<f64>, sell: Option<f64>| -> Option<f64> {
            match (buy, sell) {
                (Some(b), Some(s)) if s > 0.0 => Some(round2(b / s)),
                _ => None,
            }
        };

        let as_millions = |v: Option<f64>| v.map_or(Value::Null, |v| json!(millions(v)));
        let money = json!({
            "buy_per_i": as_millions(buy_per_i),
            "sell_per_i": as_millions(sell_per_i),
            "i_buyer_seller_pow": power(buy_per_i, sell_per_i).map_or(Value::Null, |v| json!(v)),
            "buy_per_n": as_millions(buy_per_n),
            "sell_per_n": as_millions(sell_per_n),
            "n_buyer_seller_pow": power(buy_per_n, sell_per_n).map_or(Value::Null, |v| json!(v)),
        });

        let point = json!([
            snapshot.created_time.timestamp_millis(),
            round2(buy_per_i.unwrap_or(0.0) / 1e6),
            round2(sell_per_i.unwrap_or(0.0) / 1e6),
            power(buy_per_i, sell_per_i).unwrap_or(0.0),
        ]);

        let mut patch = Map::new();
        patch.insert("order_status_table".to_string(), json!(table));
        patch.insert("money_entry_data".to_string(), money);
        patch.insert("money_entry_graph".to_string(), point);
        patch.insert(
            "base_volume".to_string(),
            json!(millions(snapshot.base_volume as f64)),
        );
        patch.insert("tvol".to_string(), json!(billions(snapshot.tvol as f64)));
        patch.insert("tval".to_string(), json!(billions(snapshot.tval as f64)));
        patch.insert("mv".to_string(), json!(billions(snapshot.mv as f64)));
        patch.insert(
            "stock_number".to_string(),
            json!(billions(snapshot.stock_number as f64)),
        );
        self.charts
            .update(&snapshot.symbol_id, SECTION_LIVE, patch, false)
            .await?;
        Ok(())
    }
}

/// Content hash over the fields that change when a tick carries new data.
fn dedup_hash(header: &[&str]) -> String {
    let input = format!("{};{};{};{}", header[0], header[2], header[5], header[10]);
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Whether any of the first ten header fields is empty or a literal zero.
fn header_incomplete(header: &[&str]) -> bool {
    header
        .iter()
        .take(10)
        .any(|t| t.trim().is_empty() || t.trim() == "0")
}

/// Assemble a snapshot from decoded fields plus the day's baseline.
fn build_snapshot(
    symbol: &Symbol,
    baseline: &DailyBaseline,
    checksum_time: NaiveTime,
    status: &str,
    fields: &std::collections::HashMap<&'static str, FieldValue>,
) -> Snapshot {
    let int = |name: &str| fields.get(name).and_then(FieldValue::as_i64).unwrap_or(0);

    let pl = int("pl");
    let pc = int("pc");
    let py = int("py");
    let plc = pl - py;
    let pcc = pc - py;
    #[allow(clippy::cast_precision_loss)]
    let pct = |delta: i64| round2(delta as f64 / py as f64 * 100.0);

    let mut book = OrderBook::default();
    const BOOK_FIELDS: [[&str; 6]; 3] = [
        ["zd1", "qd1", "pd1", "po1", "qo1", "zo1"],
        ["zd2", "qd2", "pd2", "po2", "qo2", "zo2"],
        ["zd3", "qd3", "pd3", "po3", "qo3", "zo3"],
    ];
    for (level, names) in book.levels.iter_mut().zip(BOOK_FIELDS) {
        *level = BookLevel {
            zd: int(names[0]),
            qd: int(names[1]),
            pd: int(names[2]),
            po: int(names[3]),
            qo: int(names[4]),
            zo: int(names[5]),
        };
    }

    Snapshot {
        id: 0,
        symbol_id: symbol.id.clone(),
        created_time: Utc::now(),
        checksum_time,
        status: status.to_string(),
        pl,
        pc,
        pf: int("pf"),
        py,
        pmax: int("pmax"),
        pmin: int("pmin"),
        tno: int("tno"),
        tvol: int("tvol"),
        tval: int("tval"),
        buy_i_volume: int("buy_i_volume"),
        buy_n_volume: int("buy_n_volume"),
        sell_i_volume: int("sell_i_volume"),
        sell_n_volume: int("sell_n_volume"),
        buy_counti: int("buy_counti"),
        buy_countn: int("buy_countn"),
        sell_counti: int("sell_counti"),
        sell_countn: int("sell_countn"),
        mv: pc * baseline.stock_number,
        plc,
        plp: pct(plc),
        pcc,
        pcp: pct(pcc),
        tmax: baseline.tmax,
        tmin: baseline.tmin,
        stock_number: baseline.stock_number,
        base_volume: baseline.base_volume,
        floating_stock: baseline.floating_stock,
        total_transaction_average: baseline.total_transaction_average,
        book,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn dedup_hash_tracks_content_fields_only() {
        let a = vec![
            "12:29:38", "A", "5000", "4980", "4900", "4950", "5100", "4850", "1200", "3400000",
            "16900000000",
        ];
        let mut b = a.clone();
        b[3] = "9999"; // pc is not part of the hash
        assert_eq!(dedup_hash(&a), dedup_hash(&b));

        let mut c = a.clone();
        c[2] = "5001";
        assert_ne!(dedup_hash(&a), dedup_hash(&c));
    }

    #[test]
    fn header_incompleteness_flags_zeros_and_blanks() {
        let complete = vec!["12:00:00", "A", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
        assert!(!header_incomplete(&complete));

        let mut zeroed = complete.clone();
        zeroed[9] = "0";
        assert!(header_incomplete(&zeroed));

        // the total-value field past the first ten is not part of the check
        let mut blank_tail = complete.clone();
        blank_tail[10] = "";
        assert!(!header_incomplete(&blank_tail));

        let mut blank = complete.clone();
        blank[4] = " ";
        assert!(header_incomplete(&blank));
    }

    #[test]
    fn derived_fields_follow_the_baseline() {
        let symbol = Symbol::discovered("a1", "FOO", "Foo Industries");
        let baseline = DailyBaseline {
            symbol_id: "a1".into(),
            day: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            tmax: 5200,
            tmin: 4700,
            stock_number: 1_000_000,
            base_volume: 50_000,
            floating_stock: 18.5,
            total_transaction_average: 800_000.0,
            eps: 100,
            sector_pe: None,
        };
        let mapper = FieldMapper::new();
        let fields = mapper.map("12:29:38,A,5000,4980,4900,4950,5100,4850,1200,3400000,169;;;;");
        let time = NaiveTime::from_hms_opt(12, 29, 38).unwrap();

        let snapshot = build_snapshot(&symbol, &baseline, time, "A", &fields);

        assert_eq!(snapshot.pl, 5000);
        assert_eq!(snapshot.plc, 50);
        assert!((snapshot.plp - 1.01).abs() < f64::EPSILON);
        assert_eq!(snapshot.mv, 4980 * 1_000_000);
        assert_eq!(snapshot.tmax, 5200);
        assert_eq!(snapshot.stock_number, 1_000_000);
    }
}
