//! Periodic job driver: ingestion sweeps, daily bootstrap, status rechecks,
//! and end-of-day compaction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::distribution::DistributionGateway;
use crate::domain::Symbol;
use crate::error::IngestError;
use crate::filters::FilterEngine;
use crate::ingest::{DailyBootstrapper, HistoryCompactor, SnapshotIngestor, SymbolDiscovery};
use crate::source::Backoff;
use crate::storage::{HistoryRepository, KeyValueStore, SnapshotRepository, SymbolRepository};

/// Lease key guarding the bootstrap sweep against concurrent instances.
const BOOTSTRAP_LEASE: &str = "lease:daily_bootstrap";

/// Drives the periodic pipeline jobs until cancelled.
pub struct Scheduler {
    ingestor: Arc<SnapshotIngestor>,
    bootstrapper: Arc<DailyBootstrapper>,
    compactor: Arc<HistoryCompactor>,
    discovery: Arc<SymbolDiscovery>,
    engine: Arc<FilterEngine>,
    gateway: Arc<DistributionGateway>,
    symbols: Arc<dyn SymbolRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    history: Arc<dyn HistoryRepository>,
    kv: Arc<dyn KeyValueStore>,
    settings: Settings,
    pending: AtomicUsize,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Wire the scheduler to the pipeline components.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ingestor: Arc<SnapshotIngestor>,
        bootstrapper: Arc<DailyBootstrapper>,
        compactor: Arc<HistoryCompactor>,
        discovery: Arc<SymbolDiscovery>,
        engine: Arc<FilterEngine>,
        gateway: Arc<DistributionGateway>,
        symbols: Arc<dyn SymbolRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        history: Arc<dyn HistoryRepository>,
        kv: Arc<dyn KeyValueStore>,
        settings: Settings,
    ) -> Self {
        Self {
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
            pending: AtomicUsize::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the periodic loops until the shutdown token fires.
    pub async fn run(&self) {
        let mut ingest = interval(self.settings.schedule.ingest_sweep_interval);
        let mut bootstrap = interval(self.settings.schedule.bootstrap_sweep_interval);
        let mut recheck = interval(self.settings.schedule.status_recheck_interval);
        let mut compact = interval(self.settings.schedule.compaction_interval);
        for i in [&mut ingest, &mut bootstrap, &mut recheck, &mut compact] {
            i.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        info!("scheduler started");
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("scheduler stopping");
                    break;
                }
                _ = bootstrap.tick() => self.bootstrap_round().await,
                _ = ingest.tick() => self.ingest_round().await,
                _ = recheck.tick() => self.recheck_round().await,
                _ = compact.tick() => self.compaction_round().await,
            }
        }
    }

    /// One full ingestion sweep followed by a filter round.
    async fn ingest_round(&self) {
        if self.pending.load(Ordering::SeqCst) > 0 {
            warn!("previous ingestion sweep still in flight, skipping");
            return;
        }
        let symbols = match self.symbols.list_ingestible().await {
            Ok(symbols) => symbols,
            Err(err) => {
                error!(error = %err, "failed to list ingestible symbols");
                return;
            }
        };
        self.pending.store(symbols.len(), Ordering::SeqCst);
        for symbol in &symbols {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.ingest_with_retry(symbol).await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        self.pending.store(0, Ordering::SeqCst);
        self.filter_round().await;
    }

    /// Ingest one symbol, retrying transient source failures with backoff
    /// up to the configured cap.
    async fn ingest_with_retry(&self, symbol: &Symbol) {
        let mut backoff = Backoff::for_sweep(self.settings.ingest.retry_cap);
        loop {
            match self.ingestor.ingest(symbol).await {
                Ok(outcome) => {
                    debug!(symbol = %symbol.id, ?outcome, "tick handled");
                    return;
                }
                Err(IngestError::Source(err)) if err.is_transient() => {
                    let Some(delay) = backoff.next_delay() else {
                        warn!(
                            symbol = %symbol.id,
                            attempts = backoff.attempts(),
                            error = %err,
                            "abandoning tick after retries"
                        );
                        return;
                    };
                    debug!(symbol = %symbol.id, delay_ms = delay.as_millis(), "retrying tick");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(symbol = %symbol.id, error = %err, "ingestion failed");
                    return;
                }
            }
        }
    }

    /// Evaluate every filter and publish the results.
    async fn filter_round(&self) {
        let results = match self
            .engine
            .run(&self.symbols, &self.snapshots, &self.history)
            .await
        {
            Ok(results) => results,
            Err(err) => {
                error!(error = %err, "filter round failed");
                return;
            }
        };
        for (code, rows) in results {
            if let Err(err) = self.gateway.publish(code, rows).await {
                error!(filter = code, error = %err, "publish failed");
            }
        }
    }

    /// Discovery crawl plus the daily baseline sweep, guarded by a lease so
    /// only one instance runs it.
    async fn bootstrap_round(&self) {
        let acquired = match self
            .kv
            .set_if_absent(
                BOOTSTRAP_LEASE,
                json!(true),
                Some(self.settings.schedule.bootstrap_lease_ttl),
            )
            .await
        {
            Ok(acquired) => acquired,
            Err(err) => {
                error!(error = %err, "lease acquisition failed");
                return;
            }
        };
        if !acquired {
            debug!("bootstrap lease held elsewhere, skipping");
            return;
        }

        if let Err(err) = self.discovery.crawl().await {
            error!(error = %err, "symbol discovery failed");
        }
        if let Err(err) = self.bootstrapper.run().await {
            error!(error = %err, "baseline sweep failed");
        }
        if let Err(err) = self.kv.delete(BOOTSTRAP_LEASE).await {
            warn!(error = %err, "failed to release bootstrap lease");
        }
    }

    /// Re-probe disallowed symbols.
    async fn recheck_round(&self) {
        if let Err(err) = self.discovery.recheck_status().await {
            error!(error = %err, "status recheck failed");
        }
    }

    /// End-of-day compaction.
    async fn compaction_round(&self) {
        match self.compactor.run().await {
            Ok(report) => debug!(?report, "compaction round done"),
            Err(err) => error!(error = %err, "compaction failed"),
        }
    }
}
