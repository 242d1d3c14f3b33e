//! The filter rules: pure functions from the shared view to raw signal rows.
//!
//! Rules never format; they select and score. Monetary comparisons use raw
//! values so display rounding cannot change which symbols match.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use super::view::FilterContext;
use super::{SignalRow, SignalValue};

/// Baseline money threshold; scaled per rule where noted.
pub const MONEY_THRESHOLD: f64 = 1e2;

/// Ranked rules emit at most this many rows.
const TOP_N: usize = 15;

type Scored = Vec<(f64, SignalRow)>;

fn top_rows(mut scored: Scored, descending: bool) -> Vec<SignalRow> {
    scored.sort_by(|a, b| {
        if descending {
            b.0.total_cmp(&a.0)
        } else {
            a.0.total_cmp(&b.0)
        }
    });
    scored.truncate(TOP_N);
    scored.into_iter().map(|(_, row)| row).collect()
}

/// Value traded per participant, when the count is positive.
fn per_capita(volume: i64, price: i64, count: i64) -> Option<f64> {
    (count > 0).then(|| (volume * price) as f64 / count as f64)
}

/// Buyers queue: last price pinned into the top of the band.
///
/// A symbol qualifies when the last price sits at or inside the ceiling but
/// above the 80% mark between previous close and ceiling.
pub fn ceiling_queue(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            let threshold = 0.2 * s.py as f64 + 0.8 * s.tmax as f64;
            (s.pl <= s.tmax && (s.pl as f64) > threshold).then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Float(s.plp),
                    SignalValue::Int(s.pc),
                ]
            })
        })
        .collect()
}

/// Sellers queue: the floor mirror of [`ceiling_queue`].
pub fn floor_queue(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            let threshold = 0.2 * s.py as f64 + 0.8 * s.tmin as f64;
            (s.pl >= s.tmin && (s.pl as f64) < threshold).then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Float(s.plp),
                    SignalValue::Int(s.pc),
                ]
            })
        })
        .collect()
}

/// Top symbols by traded volume relative to their 5-day average.
pub fn volume_surge(ctx: &FilterContext) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.total_transaction_average <= 0.0 {
                return None;
            }
            let ratio = s.tvol as f64 / s.total_transaction_average;
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Float(s.plp),
                SignalValue::Int(s.tvol),
                SignalValue::Float(ratio),
            ];
            Some((ratio, row))
        })
        .collect();
    top_rows(scored, true)
}

fn per_trade_rows(ctx: &FilterContext, descending: bool) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.buy_i_volume <= 0 || s.sell_i_volume <= 0 {
                return None;
            }
            let kharid = per_capita(s.buy_i_volume, s.pc, s.buy_counti)?;
            let foroush = per_capita(s.sell_i_volume, s.pc, s.sell_counti)?;
            if foroush <= 0.0 {
                return None;
            }
            let ratio = kharid / foroush;
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Float(kharid),
                SignalValue::Float(foroush),
                SignalValue::Float(ratio),
            ];
            Some((ratio, row))
        })
        .collect();
    top_rows(scored, descending)
}

/// Largest ratios of retail buy value per buyer to sell value per seller.
pub fn per_trade_ratio_high(ctx: &FilterContext) -> Vec<SignalRow> {
    per_trade_rows(ctx, true)
}

/// Smallest such ratios.
pub fn per_trade_ratio_low(ctx: &FilterContext) -> Vec<SignalRow> {
    per_trade_rows(ctx, false)
}

/// Institutions absorbing heavy retail selling.
pub fn inst_accumulation(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.tvol <= 0 {
                return None;
            }
            let inst_buy = s.buy_n_volume as f64 / s.tvol as f64;
            let retail_sell = s.sell_i_volume as f64 / s.tvol as f64;
            (inst_buy > 0.5 && retail_sell > 0.7).then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Int(s.sell_i_volume),
                    SignalValue::Int(s.buy_n_volume),
                ]
            })
        })
        .collect()
}

/// Retail absorbing heavy institutional selling.
pub fn retail_accumulation(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.tvol <= 0 {
                return None;
            }
            let inst_sell = s.sell_n_volume as f64 / s.tvol as f64;
            let retail_buy = s.buy_i_volume as f64 / s.tvol as f64;
            (inst_sell > 0.5 && retail_buy > 0.7).then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Int(s.buy_i_volume),
                    SignalValue::Int(s.sell_n_volume),
                ]
            })
        })
        .collect()
}

/// Heaviest bid queues among symbols pinned at the ceiling.
pub fn top_demand(ctx: &FilterContext) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.pl != s.tmax {
                return None;
            }
            let value = s.pl * s.book.levels[0].qd;
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Int(value),
                SignalValue::Int(s.pc),
            ];
            Some((value as f64, row))
        })
        .collect();
    top_rows(scored, true)
}

/// Heaviest ask queues among symbols pinned at the floor.
pub fn top_supply(ctx: &FilterContext) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.pl != s.tmin {
                return None;
            }
            let value = s.pl * s.book.levels[0].qo;
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Int(value),
                SignalValue::Int(s.pc),
            ];
            Some((value as f64, row))
        })
        .collect();
    top_rows(scored, true)
}

/// Symbols with the highest retail buy value per buyer.
pub fn retail_buy_power(ctx: &FilterContext) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            let kharid = per_capita(s.buy_i_volume, s.pc, s.buy_counti)?;
            let foroush = per_capita(s.sell_i_volume, s.pc, s.sell_counti)?;
            if foroush <= 0.0 {
                return None;
            }
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Float(s.plp),
                SignalValue::Float(kharid),
                SignalValue::Int(s.buy_counti),
                SignalValue::Float(kharid / foroush),
            ];
            Some((kharid, row))
        })
        .collect();
    top_rows(scored, true)
}

/// Symbols with the highest retail sell value per seller.
pub fn retail_sell_power(ctx: &FilterContext) -> Vec<SignalRow> {
    let scored = ctx
        .latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.sell_i_volume <= 0 {
                return None;
            }
            let kharid = per_capita(s.buy_i_volume, s.pc, s.buy_counti)?;
            let foroush = per_capita(s.sell_i_volume, s.pc, s.sell_counti)?;
            if kharid <= 0.0 {
                return None;
            }
            let row = vec![
                SignalValue::text(&l.name),
                SignalValue::Int(s.pl),
                SignalValue::Float(s.plp),
                SignalValue::Float(foroush),
                SignalValue::Int(s.sell_counti),
                SignalValue::Float(foroush / kharid),
            ];
            Some((foroush, row))
        })
        .collect();
    top_rows(scored, true)
}

/// Yesterday's limit-up symbols pulling back off today's high at the ceiling.
pub fn sharp_reversal(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            let qualified = ctx.yesterday_limit_up.contains(&l.symbol_id)
                && s.pmax == s.tmax
                && s.pl < s.pmax;
            qualified.then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Float(s.plp),
                    SignalValue::Int(s.pc),
                ]
            })
        })
        .collect()
}

/// Recently active symbols whose change percentage dropped sharply between
/// the last two ticks; the row shows the pre-drop tick.
pub fn positive_range(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.recent_active
        .iter()
        .filter_map(|symbol_id| {
            let (newer, older) = ctx.last_pairs.get(symbol_id)?;
            if older.plp - newer.plp <= 1.5 {
                return None;
            }
            let name = ctx.name_of(symbol_id)?;
            Some(vec![
                SignalValue::text(name),
                SignalValue::Int(older.pl),
                SignalValue::Float(older.plp),
                SignalValue::Int(older.pc),
                SignalValue::Float(older.pcp),
                SignalValue::Time(older.created_time.time()),
            ])
        })
        .collect()
}

/// Sectors ranked by aggregate retail buy power.
pub fn sector_demand(ctx: &FilterContext) -> Vec<SignalRow> {
    #[derive(Default)]
    struct SectorSums {
        buy_i: i64,
        buy_counti: i64,
        sell_i: i64,
        sell_counti: i64,
        entered_money: f64,
    }

    let mut sectors: HashMap<&str, SectorSums> = HashMap::new();
    for l in &ctx.latest {
        if l.group_name.is_empty() {
            continue;
        }
        let s = &l.stat;
        let sums = sectors.entry(l.group_name.as_str()).or_default();
        sums.buy_i += s.buy_i_volume;
        sums.buy_counti += s.buy_counti;
        sums.sell_i += s.sell_i_volume;
        sums.sell_counti += s.sell_counti;
        sums.entered_money += s.pc as f64 * (s.buy_i_volume - s.sell_i_volume) as f64;
    }

    let scored = sectors
        .into_iter()
        .filter_map(|(group, sums)| {
            if sums.buy_i <= 0 || sums.buy_counti <= 0 || sums.sell_i <= 0 || sums.sell_counti <= 0
            {
                return None;
            }
            let saraneh = (sums.buy_i as f64 / sums.buy_counti as f64)
                / (sums.sell_i as f64 / sums.sell_counti as f64);
            let row = vec![
                SignalValue::text(group),
                SignalValue::Float(saraneh),
                SignalValue::Float(sums.entered_money),
            ];
            Some((saraneh, row))
        })
        .collect();
    top_rows(scored, true)
}

/// Per-tick bursts of retail money on either side of the book.
///
/// Both sides of a symbol can fire in the same round; each row carries the
/// side tag plus the overall per-capita picture for context.
pub fn unusual_money_flow(ctx: &FilterContext) -> Vec<SignalRow> {
    let mut pairs: Vec<_> = ctx.last_pairs.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut rows = Vec::new();
    for (symbol_id, (newer, older)) in pairs {
        let Some(name) = ctx.name_of(symbol_id) else {
            continue;
        };
        let s = newer;
        let Some(saraneh_kharid) = per_capita(s.buy_i_volume, s.pc, s.buy_counti) else {
            continue;
        };
        let Some(saraneh_foroush) = per_capita(s.sell_i_volume, s.pc, s.sell_counti) else {
            continue;
        };
        if saraneh_foroush <= 0.0 {
            continue;
        }
        let saraneh = saraneh_kharid / saraneh_foroush;

        let mut side = |delta_volume: i64, delta_count: i64, tag: &str| {
            let Some(lahze_avg) = per_capita(delta_volume, s.pl, delta_count) else {
                return;
            };
            if lahze_avg / 1e7 > MONEY_THRESHOLD {
                rows.push(vec![
                    SignalValue::Time(s.created_time.time()),
                    SignalValue::text(name),
                    SignalValue::text(tag),
                    SignalValue::Float(lahze_avg),
                    SignalValue::Float(saraneh_kharid),
                    SignalValue::Float(saraneh_foroush),
                    SignalValue::Float(saraneh),
                    SignalValue::Int(s.pl),
                ]);
            }
        };
        side(
            s.buy_i_volume - older.buy_i_volume,
            s.buy_counti - older.buy_counti,
            "buy",
        );
        side(
            s.sell_i_volume - older.sell_i_volume,
            s.sell_counti - older.sell_counti,
            "sell",
        );
    }
    rows
}

/// Heavy retail buy power on elevated volume with broad participation.
pub fn swing_break(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            if s.total_transaction_average <= 0.0 || s.buy_counti <= 30 {
                return None;
            }
            let kharid = per_capita(s.buy_i_volume, s.pc, s.buy_counti)?;
            let foroush = per_capita(s.sell_i_volume, s.pc, s.sell_counti)?;
            if foroush <= 0.0 {
                return None;
            }
            let saraneh = kharid / foroush;
            let tvol_tta = s.tvol as f64 / s.total_transaction_average;
            let entered_money = s.pc as f64 * (s.buy_i_volume - s.sell_i_volume) as f64;
            (saraneh > 2.0 && kharid > MONEY_THRESHOLD * 1e6 && tvol_tta > 1.0).then(|| {
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Float(s.plp),
                    SignalValue::Float(tvol_tta),
                    SignalValue::Float(saraneh),
                    SignalValue::Float(entered_money),
                ]
            })
        })
        .collect()
}

/// Strong retail interest near the bottom of the 30-day price band with
/// little retail exit.
pub fn retail_attention(ctx: &FilterContext) -> Vec<SignalRow> {
    ctx.latest
        .iter()
        .filter_map(|l| {
            let s = &l.stat;
            let (min, max) = ctx.band_30d.get(&l.symbol_id)?;
            if s.buy_counti <= 0
                || s.sell_counti <= 0
                || s.sell_i_volume <= 0
                || s.tvol <= 0
                || s.total_transaction_average <= 0.0
            {
                return None;
            }
            let saraneh = (s.buy_i_volume as f64 / s.buy_counti as f64)
                / (s.sell_i_volume as f64 / s.sell_counti as f64);
            let retail_exit = s.sell_n_volume as f64 / s.tvol as f64;
            let position = (s.pl - min) as f64 * 100.0 / (max - min) as f64;
            (saraneh > 10.0 && retail_exit < 0.2 && position < 20.0).then(|| {
                let entered_money = s.pc as f64 * (s.buy_i_volume - s.sell_i_volume) as f64;
                let tvol_tta = s.tvol as f64 / s.total_transaction_average;
                vec![
                    SignalValue::text(&l.name),
                    SignalValue::Int(s.pl),
                    SignalValue::Float(s.plp),
                    SignalValue::Float(saraneh),
                    SignalValue::Float(entered_money),
                    SignalValue::Float(tvol_tta),
                ]
            })
        })
        .collect()
}
