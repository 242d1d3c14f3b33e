//! Symbol discovery from market listing pages, plus the periodic status
//! recheck for disallowed symbols.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{info, warn};

use crate::config::DiscoverySettings;
use crate::domain::Symbol;
use crate::error::IngestError;
use crate::source::field_map::FieldValue;
use crate::source::{FieldMapper, SourceClient};
use crate::storage::SymbolRepository;

/// Listing pages crawled for symbols: (flow name, listing types, partree).
const LISTING_FLOWS: [(&str, &[u32], &str); 3] = [
    ("MostVisited", &[1, 2, 27, 28, 29], "151317"),
    ("Priority", &[1], "151317"),
    ("", &[1], "151316"),
];

/// Crawls listing pages for new symbols and rechecks disallowed ones.
pub struct SymbolDiscovery {
    client: SourceClient,
    mapper: FieldMapper,
    symbols: Arc<dyn SymbolRepository>,
    row: Regex,
    settings: DiscoverySettings,
}

impl SymbolDiscovery {
    /// Wire the discovery crawler to its collaborators.
    ///
    /// # Panics
    /// Never; the row pattern is a checked literal.
    #[must_use]
    pub fn new(
        client: SourceClient,
        symbols: Arc<dyn SymbolRepository>,
        settings: DiscoverySettings,
    ) -> Self {
        #[allow(clippy::expect_used)]
        let row = Regex::new(r"inscode=(\d+)[^>]*>([^<]+)</a>(?:\s*</td>\s*<td[^>]*>([^<]+))?")
            .expect("valid literal pattern");
        Self {
            client,
            mapper: FieldMapper::new(),
            symbols,
            row,
            settings,
        }
    }

    /// Crawl every listing flow and insert symbols not seen before.
    ///
    /// Failed pages are logged and skipped. Returns the number of newly
    /// inserted symbols.
    pub async fn crawl(&self) -> Result<usize, IngestError> {
        let mut found: HashMap<String, Symbol> = HashMap::new();
        for (flow, kinds, partree) in LISTING_FLOWS {
            for kind in kinds {
                let html = match self.client.listing_page(partree, *kind, flow).await {
                    Ok(html) => html,
                    Err(err) => {
                        warn!(flow, kind, error = %err, "listing page fetch failed");
                        continue;
                    }
                };
                for symbol in self.parse_listing(&html) {
                    found.entry(symbol.id.clone()).or_insert(symbol);
                }
            }
        }

        let inserted = self
            .symbols
            .insert_many(found.into_values().collect())
            .await?;
        info!(inserted, "symbol discovery finished");
        Ok(inserted)
    }

    /// Extract symbols from one listing page, honoring the exclusion list.
    fn parse_listing(&self, html: &str) -> Vec<Symbol> {
        self.row
            .captures_iter(html)
            .filter_map(|captures| {
                let id = captures.get(1)?.as_str();
                let name = captures.get(2)?.as_str().trim();
                if self.excluded(name) {
                    return None;
                }
                let title = captures
                    .get(3)
                    .map_or(name, |m| m.as_str().trim());
                Some(Symbol::discovered(id, name, title))
            })
            .collect()
    }

    fn excluded(&self, name: &str) -> bool {
        self.settings
            .exclude_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Re-probe every disallowed symbol and re-enable the ones whose feed
    /// reports a tradable status again. Returns the number re-enabled.
    pub async fn recheck_status(&self) -> Result<usize, IngestError> {
        let mut reallowed = 0;
        for symbol in self.symbols.list_disallowed().await? {
            let Some(script) = symbol.script else {
                continue;
            };
            let payload = match self.client.live_snapshot(&symbol.id, script).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(symbol = %symbol.id, error = %err, "status probe failed");
                    continue;
                }
            };
            let fields = self.mapper.map(&payload);
            let tradable = fields
                .get("status")
                .and_then(FieldValue::as_text)
                .is_some_and(|status| status == "A" || status == "AR");
            if tradable {
                self.symbols.set_allowed(&symbol.id, true).await?;
                reallowed += 1;
            }
        }
        info!(reallowed, "status recheck finished");
        Ok(reallowed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::config::SourceSettings;
    use crate::storage::memory::InMemorySymbolRepository;

    use super::*;

    fn discovery(exclude_prefixes: Vec<String>) -> SymbolDiscovery {
        let client = SourceClient::new(&SourceSettings::default()).unwrap();
        SymbolDiscovery::new(
            client,
            Arc::new(InMemorySymbolRepository::new()),
            DiscoverySettings { exclude_prefixes },
        )
    }

    const LISTING: &str = "<table>\
<tr><td><a target='_blank' href='loader.aspx?ParTree=111C1417&inscode=46348559193224090'>FOO</a></td>\
<td>Foo Industries</td></tr>\
<tr><td><a href='loader.aspx?inscode=778253364357513'>BAR1</a></td><td>Bar Holding</td></tr>\
</table>";

    #[test]
    fn listing_rows_parse_to_symbols() {
        let symbols = discovery(Vec::new()).parse_listing(LISTING);

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].id, "46348559193224090");
        assert_eq!(symbols[0].name, "FOO");
        assert_eq!(symbols[0].title, "Foo Industries");
        assert!(symbols[0].script.is_none());
    }

    #[test]
    fn excluded_prefixes_are_skipped() {
        let symbols = discovery(vec!["BAR".to_string()]).parse_listing(LISTING);

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "FOO");
    }

    #[test]
    fn row_without_title_cell_falls_back_to_name() {
        let symbols =
            discovery(Vec::new()).parse_listing("<a href='x?inscode=123'>BAZ</a><p>other</p>");

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].title, "BAZ");
    }
}
