//! Presentational formatting of raw signal rows.
//!
//! Each filter pairs its rule with a per-column formatter; clients receive
//! display-ready strings for money columns and untouched values elsewhere.

use serde_json::{Value, json};

use crate::numfmt::{billions, billions_whole, group_float, group_int, millions, round2};

use super::{SignalRow, SignalValue};

/// Formats one raw row into its display cells.
pub type FormatFn = fn(&SignalRow) -> Vec<Value>;

type Cell = fn(&SignalValue) -> Value;

fn apply(cells: &[Cell], row: &SignalRow) -> Vec<Value> {
    row.iter().zip(cells).map(|(value, cell)| cell(value)).collect()
}

fn raw(value: &SignalValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn grouped_int(value: &SignalValue) -> Value {
    value.as_i64().map_or(Value::Null, |v| json!(group_int(v)))
}

fn grouped_float(value: &SignalValue) -> Value {
    value.as_f64().map_or(Value::Null, |v| json!(group_float(v)))
}

fn as_millions(value: &SignalValue) -> Value {
    value.as_f64().map_or(Value::Null, |v| json!(millions(v)))
}

fn as_billions(value: &SignalValue) -> Value {
    value.as_f64().map_or(Value::Null, |v| json!(billions(v)))
}

fn as_billions_whole(value: &SignalValue) -> Value {
    value.as_f64().map_or(Value::Null, |v| json!(billions_whole(v)))
}

fn rounded(value: &SignalValue) -> Value {
    value.as_f64().map_or(Value::Null, |v| json!(round2(v)))
}

fn clock(value: &SignalValue) -> Value {
    match value {
        SignalValue::Time(t) => json!(t.format("%H:%M:%S").to_string()),
        _ => Value::Null,
    }
}

/// Queue-style rows: name, price, change, close.
pub fn queue(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, raw, grouped_int], row)
}

/// Volume-surge rows.
pub fn volume_surge(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, raw, as_millions, grouped_float], row)
}

/// Per-trade ratio rows.
pub fn per_trade(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, as_millions, as_millions, rounded], row)
}

/// Accumulation rows.
pub fn accumulation(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, as_millions, as_millions], row)
}

/// Top-of-book queue-value rows.
pub fn top_book(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, as_billions_whole, grouped_int], row)
}

/// Retail power rows.
pub fn retail_power(row: &SignalRow) -> Vec<Value> {
    apply(
        &[raw, grouped_int, raw, as_millions, grouped_int, rounded],
        row,
    )
}

/// Positive-range rows, ending in a wall-clock column.
pub fn positive_range(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, grouped_int, raw, grouped_int, raw, clock], row)
}

/// Sector-demand rows.
pub fn sector_demand(row: &SignalRow) -> Vec<Value> {
    apply(&[raw, rounded, as_billions], row)
}

/// Unusual money-flow rows, led by a wall-clock column.
pub fn unusual_money_flow(row: &SignalRow) -> Vec<Value> {
    apply(
        &[
            clock,
            raw,
            raw,
            as_billions,
            as_billions,
            as_billions,
            grouped_float,
            grouped_int,
        ],
        row,
    )
}

/// Swing-break rows.
pub fn swing_break(row: &SignalRow) -> Vec<Value> {
    apply(
        &[raw, grouped_int, raw, grouped_float, grouped_float, as_billions],
        row,
    )
}

/// Retail-attention rows.
pub fn retail_attention(row: &SignalRow) -> Vec<Value> {
    apply(
        &[raw, grouped_int, raw, grouped_float, as_billions, grouped_float],
        row,
    )
}
