//! The filter registry: rule plus formatter per filter code.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::IngestError;
use crate::storage::{HistoryRepository, SnapshotRepository, SymbolRepository};

use super::SignalRow;
use super::format::{self, FormatFn};
use super::rules;
use super::view::FilterContext;

/// Selects raw rows from the shared view.
pub type RuleFn = fn(&FilterContext) -> Vec<SignalRow>;

/// One registered filter.
pub struct FilterSpec {
    /// Stable filter code; also the cache and catalog key.
    pub code: &'static str,
    rule: RuleFn,
    format: FormatFn,
}

/// Evaluates every registered filter over one shared view.
pub struct FilterEngine {
    specs: Vec<FilterSpec>,
}

impl FilterEngine {
    /// The built-in registry, matching the standard catalog.
    #[must_use]
    pub fn standard() -> Self {
        let specs = vec![
            spec("ceiling_queue", rules::ceiling_queue, format::queue),
            spec("floor_queue", rules::floor_queue, format::queue),
            spec("volume_surge", rules::volume_surge, format::volume_surge),
            spec(
                "per_trade_ratio_high",
                rules::per_trade_ratio_high,
                format::per_trade,
            ),
            spec(
                "per_trade_ratio_low",
                rules::per_trade_ratio_low,
                format::per_trade,
            ),
            spec(
                "inst_accumulation",
                rules::inst_accumulation,
                format::accumulation,
            ),
            spec(
                "retail_accumulation",
                rules::retail_accumulation,
                format::accumulation,
            ),
            spec("top_demand", rules::top_demand, format::top_book),
            spec("top_supply", rules::top_supply, format::top_book),
            spec(
                "retail_buy_power",
                rules::retail_buy_power,
                format::retail_power,
            ),
            spec(
                "retail_sell_power",
                rules::retail_sell_power,
                format::retail_power,
            ),
            spec("sharp_reversal", rules::sharp_reversal, format::queue),
            spec(
                "positive_range",
                rules::positive_range,
                format::positive_range,
            ),
            spec("sector_demand", rules::sector_demand, format::sector_demand),
            spec(
                "unusual_money_flow",
                rules::unusual_money_flow,
                format::unusual_money_flow,
            ),
            spec("swing_break", rules::swing_break, format::swing_break),
            spec(
                "retail_attention",
                rules::retail_attention,
                format::retail_attention,
            ),
        ];
        Self { specs }
    }

    /// The registered filter codes, in evaluation order.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.specs.iter().map(|s| s.code).collect()
    }

    /// Build the shared view from the stores and evaluate every filter.
    pub async fn run(
        &self,
        symbols: &Arc<dyn SymbolRepository>,
        snapshots: &Arc<dyn SnapshotRepository>,
        history: &Arc<dyn HistoryRepository>,
    ) -> Result<HashMap<&'static str, Vec<Vec<Value>>>, IngestError> {
        let ctx = FilterContext::build(symbols, snapshots, history).await?;
        Ok(self.evaluate(&ctx))
    }

    /// Evaluate every filter against one view, returning formatted rows per
    /// filter code. Filters that matched nothing map to an empty list.
    #[must_use]
    pub fn evaluate(&self, ctx: &FilterContext) -> HashMap<&'static str, Vec<Vec<Value>>> {
        self.specs
            .iter()
            .map(|s| {
                let rows = (s.rule)(ctx);
                debug!(filter = s.code, matches = rows.len(), "filter evaluated");
                let formatted = rows.iter().map(s.format).collect();
                (s.code, formatted)
            })
            .collect()
    }
}

const fn spec(code: &'static str, rule: RuleFn, format: FormatFn) -> FilterSpec {
    FilterSpec { code, rule, format }
}

#[cfg(test)]
mod tests {
    use crate::domain::filter::standard_catalog;

    use super::*;

    #[test]
    fn registry_matches_the_catalog() {
        let engine = FilterEngine::standard();
        let (_, definitions) = standard_catalog();

        let registered = engine.codes();
        assert_eq!(registered.len(), definitions.len());
        for definition in definitions {
            assert!(
                registered.contains(&definition.code.as_str()),
                "missing rule for {}",
                definition.code
            );
        }
    }
}
