//! Signal Engine Binary
//!
//! Starts the market-data signal pipeline: periodic ingestion sweeps,
//! filter evaluation, and signal distribution.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin signal-engine
//! ```
//!
//! # Environment Variables
//!
//! - `SOURCE_BASE_URL`: Market-data source base URL (default: <http://localhost:8080>)
//! - `INGEST_SWEEP_INTERVAL_SECS`: Ingestion sweep cadence (default: 60)
//! - `RUST_LOG`: Log level (default: info)
//!
//! See `config.rs` for the full list.

use std::sync::Arc;

use signal_engine::config::Settings;
use signal_engine::distribution::{DistributionGateway, SignalHub};
use signal_engine::domain::filter::standard_catalog;
use signal_engine::filters::FilterEngine;
use signal_engine::ingest::{
    DailyBootstrapper, HistoryCompactor, SnapshotIngestor, SymbolDiscovery,
};
use signal_engine::scheduler::Scheduler;
use signal_engine::source::SourceClient;
use signal_engine::storage::memory::{
    InMemoryBaselineRepository, InMemoryFilterRepository, InMemoryHistoryRepository,
    InMemoryKeyValueStore, InMemorySnapshotRepository, InMemorySymbolRepository,
};
use signal_engine::storage::{
    BaselineRepository, ChartStore, HistoryRepository, KeyValueStore, SnapshotRepository,
    SymbolRepository,
};
use signal_engine::telemetry;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let settings = Settings::from_env()?;
    info!(source = %settings.source.base_url, "starting signal engine");

    let symbols: Arc<dyn SymbolRepository> = Arc::new(InMemorySymbolRepository::new());
    let baselines: Arc<dyn BaselineRepository> = Arc::new(InMemoryBaselineRepository::new());
    let snapshots: Arc<dyn SnapshotRepository> = Arc::new(InMemorySnapshotRepository::new());
    let history: Arc<dyn HistoryRepository> = Arc::new(InMemoryHistoryRepository::new());
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let (categories, definitions) = standard_catalog();
    let filters = Arc::new(InMemoryFilterRepository::seeded(categories, definitions));
    let charts = ChartStore::new(kv.clone());

    let client = SourceClient::new(&settings.source)?;
    let ingestor = Arc::new(SnapshotIngestor::new(
        client.clone(),
        symbols.clone(),
        baselines.clone(),
        snapshots.clone(),
        kv.clone(),
        charts.clone(),
        settings.ingest.clone(),
    ));
    let bootstrapper = Arc::new(DailyBootstrapper::new(
        client.clone(),
        symbols.clone(),
        baselines.clone(),
        charts.clone(),
    ));
    let compactor = Arc::new(HistoryCompactor::new(
        snapshots.clone(),
        history.clone(),
        symbols.clone(),
        charts,
        settings.compaction.clone(),
    ));
    let discovery = Arc::new(SymbolDiscovery::new(
        client,
        symbols.clone(),
        settings.discovery.clone(),
    ));

    let hub = Arc::new(SignalHub::new(settings.distribution.channel_capacity));
    let gateway = Arc::new(DistributionGateway::new(filters, kv.clone(), hub));
    let engine = Arc::new(FilterEngine::standard());

    let scheduler = Scheduler::new(
        ingestor,
        bootstrapper,
        compactor,
        discovery,
        engine,
        gateway,
        symbols,
        snapshots,
        history,
        kv,
        settings,
    );

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    scheduler.run().await;
    info!("signal engine stopped");
    Ok(())
}
