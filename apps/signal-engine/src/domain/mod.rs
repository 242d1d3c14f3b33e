//! Domain model: symbols, baselines, snapshots, history, filters.

pub mod baseline;
pub mod filter;
pub mod history;
pub mod snapshot;
pub mod symbol;

pub use baseline::DailyBaseline;
pub use filter::{FilterCategory, FilterDefinition, FilterEntitlement};
pub use history::HistoryRecord;
pub use snapshot::{BookLevel, OrderBook, Snapshot};
pub use symbol::{Symbol, SymbolId};
