//! Signal Engine Library
//!
//! Ingests live trading data for exchange-listed symbols from an external
//! market-data source, maintains per-symbol intraday series with daily
//! rollups, evaluates a library of signal filters against the latest
//! snapshot of every symbol, and distributes matched signals to free and
//! entitled subscriber groups over a broadcast hub gated by single-use
//! tickets.
//!
//! # Architecture
//!
//! ```text
//! upstream source -> source::FieldMapper -> ingest::SnapshotIngestor
//!                                               |
//!                    ingest::DailyBootstrapper  | (baseline precondition)
//!                                               v
//!                  ingest::HistoryCompactor <- storage (snapshots)
//!                                               |
//!                       filters::FilterEngine <-+
//!                                               v
//!                  distribution::DistributionGateway -> SignalHub
//!                                               ^
//!                          distribution::TicketGate (subscriber attach)
//! ```

pub mod config;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod filters;
pub mod ingest;
pub mod numfmt;
pub mod scheduler;
pub mod source;
pub mod storage;
pub mod telemetry;

pub use config::Settings;
pub use distribution::{DistributionGateway, SignalHub, TicketGate};
pub use error::{IngestError, PublishError, SourceError};
pub use filters::FilterEngine;
pub use ingest::{DailyBootstrapper, HistoryCompactor, SnapshotIngestor, SymbolDiscovery};
pub use scheduler::Scheduler;
