//! Reference-page extraction for the daily bootstrap.
//!
//! The instrument page embeds a script block of `key='value'` assignments
//! holding the day's static parameters (price bands, share counts, sector
//! codes). The block is located by a marker key and decoded line by line;
//! a page missing the marker or a required key yields `None` so the
//! bootstrapper can skip the symbol instead of failing the sweep.

use std::collections::HashMap;

/// Marker key present only in the assignment block we want.
const MARKER: &str = "TopInst";

/// Decoded reference parameters for one symbol on one trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePage {
    /// Daily price ceiling.
    pub tmax: i64,
    /// Daily price floor.
    pub tmin: i64,
    /// Outstanding shares.
    pub stock_number: i64,
    /// Base volume.
    pub base_volume: i64,
    /// Floating-share ratio; zero when the page omits it.
    pub floating_stock: f64,
    /// 5-day average traded volume.
    pub total_transaction_average: f64,
    /// Estimated earnings per share; zero when the page omits it.
    pub eps: i64,
    /// Sector price/earnings ratio, when published.
    pub sector_pe: Option<f64>,
    /// Script code used in live-tick requests.
    pub script: Option<u32>,
    /// Sector (group) name.
    pub group_name: String,
    /// Market name, taken from the title's second segment.
    pub market: String,
}

impl ReferencePage {
    /// Extract reference parameters from an instrument page.
    #[must_use]
    pub fn parse(html: &str) -> Option<Self> {
        let assignments = Self::assignments(html)?;

        let int = |key: &str| assignments.get(key).and_then(|v| v.parse::<i64>().ok());
        let float = |key: &str| assignments.get(key).and_then(|v| v.parse::<f64>().ok());

        let market = assignments
            .get("Title")
            .and_then(|title| title.split('-').nth(1))
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            tmax: int("PSGelStaMax")?,
            tmin: int("PSGelStaMin")?,
            stock_number: int("ZTitad")?,
            base_volume: int("BaseVol")?,
            floating_stock: float("KAjCapValCpsIdx").unwrap_or(0.0),
            total_transaction_average: float("QTotTran5JAvg")?,
            eps: int("EstimatedEPS").unwrap_or(0),
            sector_pe: float("SectorPE"),
            script: assignments.get("CSecVal").and_then(|v| v.trim().parse().ok()),
            group_name: assignments.get("LSecVal")?.clone(),
            market,
        })
    }

    /// Locate the marker block and decode its `key='value'` pairs.
    fn assignments(html: &str) -> Option<HashMap<String, String>> {
        let block = html
            .split("<script")
            .find(|segment| segment.contains(MARKER))?;
        let body = block.split_once('>').map_or(block, |(_, rest)| rest);
        let body = body.split("</script").next().unwrap_or(body);

        let mut out = HashMap::new();
        let statements = body
            .trim()
            .trim_start_matches("var ")
            .trim_end_matches(';')
            .split(',');
        for statement in statements {
            if let Some((key, value)) = statement.split_once('=') {
                let value = value.trim().trim_matches('\'').trim_matches('"');
                out.insert(key.trim().to_string(), value.to_string());
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }
}
