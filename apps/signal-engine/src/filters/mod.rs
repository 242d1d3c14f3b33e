//! Signal filters: a registry of named market screens evaluated over a
//! shared point-in-time view of the latest market state.

pub mod engine;
pub mod format;
pub mod rules;
pub mod view;

pub use engine::FilterEngine;
pub use view::{FilterContext, LatestStat};

use chrono::NaiveTime;
use serde::Serialize;

/// One cell of a raw signal row, before presentational formatting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Integer cell.
    Int(i64),
    /// Fractional cell.
    Float(f64),
    /// Text cell.
    Text(String),
    /// Time-of-day cell.
    Time(NaiveTime),
}

impl SignalValue {
    /// Text constructor from anything string-like.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Integer view; floats are truncated.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Float view.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// One matching row emitted by a filter rule.
pub type SignalRow = Vec<SignalValue>;
