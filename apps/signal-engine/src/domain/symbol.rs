//! Tradable instruments ("symbols") discovered from the source's listings.

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned to a symbol by the upstream source.
pub type SymbolId = String;

/// A tradable instrument.
///
/// Created by the discovery crawler; the script code, sector name, and
/// allowed flag are refreshed by ingestion. Symbols are never hard-deleted,
/// only disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Opaque external key.
    pub id: SymbolId,
    /// Short ticker name.
    pub name: String,
    /// Long human-readable title.
    pub title: String,
    /// Trading group / sector name.
    pub group_name: String,
    /// Market/board name.
    pub market: String,
    /// Numeric script code assigned by the source; required for live
    /// snapshot requests, resolved during the daily bootstrap.
    pub script: Option<u32>,
    /// Whether the source currently serves this symbol. Flipped off when
    /// the feed reports a halted/invalid status, back on at end of day.
    pub is_allowed: bool,
    /// Administrative enable flag.
    pub is_enable: bool,
}

impl Symbol {
    /// Create a newly discovered symbol with no script code yet.
    #[must_use]
    pub fn discovered(id: impl Into<SymbolId>, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: title.into(),
            group_name: String::new(),
            market: String::new(),
            script: None,
            is_allowed: true,
            is_enable: true,
        }
    }

    /// Whether this symbol is eligible for live ingestion.
    #[must_use]
    pub const fn is_ingestible(&self) -> bool {
        self.script.is_some() && self.is_allowed && self.is_enable
    }
}
