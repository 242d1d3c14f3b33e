//! Administrative filter definitions and entitlement categories.

use serde::{Deserialize, Serialize};

/// A category of signal filters; the category decides whether its filters
/// broadcast on the open group only or also on the entitled group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCategory {
    /// Category id.
    pub id: u32,
    /// Display title.
    pub title: String,
    /// Free categories broadcast on the open group only.
    pub is_free: bool,
    /// Administrative enable flag.
    pub is_enable: bool,
}

/// A named signal filter, read-only to the filter engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDefinition {
    /// Stable filter code used as the registry and cache key.
    pub code: String,
    /// Display title.
    pub title: String,
    /// Owning category.
    pub category_id: u32,
    /// Administrative enable flag.
    pub is_enable: bool,
}

/// Resolved entitlement view of an enabled filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEntitlement {
    /// Whether the filter's category is free.
    pub is_free: bool,
}

/// The built-in filter catalog: categories plus definitions.
///
/// The queue and volume filters are free; the rest require entitlement.
#[must_use]
pub fn standard_catalog() -> (Vec<FilterCategory>, Vec<FilterDefinition>) {
    let categories = vec![
        FilterCategory {
            id: 1,
            title: "Free signals".to_string(),
            is_free: true,
            is_enable: true,
        },
        FilterCategory {
            id: 2,
            title: "Pro signals".to_string(),
            is_free: false,
            is_enable: true,
        },
    ];

    let free = ["ceiling_queue", "floor_queue", "volume_surge"];
    let gated = [
        "per_trade_ratio_high",
        "per_trade_ratio_low",
        "inst_accumulation",
        "retail_accumulation",
        "top_demand",
        "top_supply",
        "retail_buy_power",
        "retail_sell_power",
        "sharp_reversal",
        "positive_range",
        "sector_demand",
        "unusual_money_flow",
        "swing_break",
        "retail_attention",
    ];

    let mut definitions = Vec::with_capacity(free.len() + gated.len());
    for code in free {
        definitions.push(FilterDefinition {
            code: code.to_string(),
            title: code.replace('_', " "),
            category_id: 1,
            is_enable: true,
        });
    }
    for code in gated {
        definitions.push(FilterDefinition {
            code: code.to_string(),
            title: code.replace('_', " "),
            category_id: 2,
            is_enable: true,
        });
    }

    (categories, definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_all_seventeen_filters() {
        let (categories, definitions) = standard_catalog();
        assert_eq!(categories.len(), 2);
        assert_eq!(definitions.len(), 17);
        assert!(definitions.iter().all(|d| d.is_enable));
    }
}
