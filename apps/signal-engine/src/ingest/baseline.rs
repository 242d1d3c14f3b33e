//! Daily baseline bootstrap from instrument reference pages.
//!
//! Once per trading day every enabled symbol needs its static parameters
//! (price bands, share counts, script code) captured before live ticks can
//! be accepted. The sweep is re-runnable: symbols that already carry a
//! baseline for today are skipped.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use serde_json::{Map, json};
use tracing::{info, warn};

use crate::domain::DailyBaseline;
use crate::error::IngestError;
use crate::numfmt::{billions, millions};
use crate::source::{ReferencePage, SourceClient};
use crate::storage::chart::SECTION_DAILY;
use crate::storage::{BaselineRepository, ChartStore, SymbolRepository};

/// Bootstraps per-day baselines and refreshes symbol reference data.
pub struct DailyBootstrapper {
    client: SourceClient,
    symbols: Arc<dyn SymbolRepository>,
    baselines: Arc<dyn BaselineRepository>,
    charts: ChartStore,
}

impl DailyBootstrapper {
    /// Wire the bootstrapper to its collaborators.
    #[must_use]
    pub fn new(
        client: SourceClient,
        symbols: Arc<dyn SymbolRepository>,
        baselines: Arc<dyn BaselineRepository>,
        charts: ChartStore,
    ) -> Self {
        Self {
            client,
            symbols,
            baselines,
            charts,
        }
    }

    /// Bootstrap every enabled symbol that has no baseline for today.
    ///
    /// Per-symbol source failures are logged and skipped so one bad page
    /// cannot starve the rest of the sweep. Returns the number bootstrapped.
    pub async fn run(&self) -> Result<usize, IngestError> {
        let today = Local::now().date_naive();
        let done: HashSet<_> = self
            .baselines
            .symbols_for_day(today)
            .await?
            .into_iter()
            .collect();
        let mut bootstrapped = 0;
        for symbol in self.symbols.list_enabled().await? {
            if done.contains(&symbol.id) {
                continue;
            }
            match self.bootstrap_symbol(&symbol.id).await {
                Ok(true) => bootstrapped += 1,
                Ok(false) => {}
                Err(IngestError::Source(err)) => {
                    warn!(symbol = %symbol.id, error = %err, "reference fetch failed");
                }
                Err(err) => return Err(err),
            }
        }
        info!(bootstrapped, "daily baseline sweep finished");
        Ok(bootstrapped)
    }

    /// Bootstrap one symbol: fetch its reference page, refresh the symbol's
    /// script/sector/market, and record today's baseline.
    ///
    /// Returns `false` when the page cannot be decoded.
    pub async fn bootstrap_symbol(&self, symbol_id: &str) -> Result<bool, IngestError> {
        let html = self.client.instrument_page(symbol_id).await?;
        let Some(page) = ReferencePage::parse(&html) else {
            warn!(symbol = %symbol_id, "reference page missing expected block");
            return Ok(false);
        };

        self.symbols
            .update_reference(symbol_id, page.script, &page.group_name, &page.market)
            .await?;
        self.baselines
            .insert(DailyBaseline {
                symbol_id: symbol_id.to_string(),
                day: Local::now().date_naive(),
                tmax: page.tmax,
                tmin: page.tmin,
                stock_number: page.stock_number,
                base_volume: page.base_volume,
                floating_stock: page.floating_stock,
                total_transaction_average: page.total_transaction_average,
                eps: page.eps,
                sector_pe: page.sector_pe,
            })
            .await?;

        let mut patch = Map::new();
        patch.insert(
            "stock_number".to_string(),
            json!(billions(page.stock_number as f64)),
        );
        patch.insert(
            "base_volume".to_string(),
            json!(millions(page.base_volume as f64)),
        );
        patch.insert("group_name".to_string(), json!(page.group_name));
        patch.insert("market".to_string(), json!(page.market));
        self.charts
            .update(symbol_id, SECTION_DAILY, patch, false)
            .await?;
        Ok(true)
    }
}
