use std::time::Instant;

use serde::Serialize;

use crate::catalog::{BatchResult, Catalog, CatalogOptions, MatchStrategy, QueryOutcome, RecordSink};
use crate::config::ResolvedConfig;
use crate::domain::{EntryId, NormalizedRecord};
use crate::error::CatalogError;
use crate::index::build_index;
use crate::pokeapi::CatalogClient;
use crate::render::DetailView;

#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub start: EntryId,
    pub next_cursor: EntryId,
    pub cache_hits: usize,
    pub fetched: usize,
    pub skipped: Vec<EntryId>,
    pub records: Vec<NormalizedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Matched,
    NoMatches,
    /// Blank query: the grid went back to the first page.
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub status: SearchStatus,
    pub strategy: Option<MatchStrategy>,
    pub skipped: Vec<EntryId>,
    pub records: Vec<NormalizedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowResult {
    pub record: NormalizedRecord,
    pub detail: DetailView,
}

/// Startup plus the user-facing operations on top of one [`Catalog`].
pub struct App<C: CatalogClient> {
    catalog: Catalog<C>,
    config: ResolvedConfig,
}

impl<C: CatalogClient> App<C> {
    /// Fetches the listing and builds the index. A listing failure is fatal;
    /// there is no partially built index.
    pub fn start(client: C, config: ResolvedConfig) -> Result<Self, CatalogError> {
        let started = Instant::now();
        let listing = client.fetch_listing()?;
        let index = build_index(listing);
        if index.is_empty() {
            tracing::warn!("catalog listing produced an empty index");
        }
        tracing::info!(
            entries = index.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "catalog index ready"
        );
        let catalog = Catalog::new(client, index, CatalogOptions::from(&config));
        Ok(Self { catalog, config })
    }

    pub fn from_catalog(catalog: Catalog<C>, config: ResolvedConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog<C> {
        &self.catalog
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Loads one page. Without `start` the page continues from the cursor.
    pub fn page(
        &self,
        start: Option<EntryId>,
        count: Option<usize>,
        sink: &dyn RecordSink,
    ) -> PageResult {
        let start = start.unwrap_or_else(|| self.catalog.cursor());
        let count = count.unwrap_or(self.config.page_size);
        let batch = self.catalog.load_range(start, count, sink);
        self.page_result(start, batch)
    }

    /// Rewinds to the first page and loads it, mostly from cache.
    pub fn reset(&self, sink: &dyn RecordSink) -> PageResult {
        self.catalog.reset();
        self.page(Some(EntryId::FIRST), None, sink)
    }

    pub fn search(&self, query: &str, sink: &dyn RecordSink) -> SearchResult {
        match self.catalog.resolve_query(query, sink) {
            QueryOutcome::Blank => {
                let page = self.reset(sink);
                SearchResult {
                    query: query.to_string(),
                    status: SearchStatus::Reset,
                    strategy: None,
                    skipped: page.skipped,
                    records: page.records,
                }
            }
            QueryOutcome::Matched { strategy, batch } => SearchResult {
                query: query.to_string(),
                status: SearchStatus::Matched,
                strategy: Some(strategy),
                skipped: batch.skipped,
                records: batch.records,
            },
            QueryOutcome::NoMatches => SearchResult {
                query: query.to_string(),
                status: SearchStatus::NoMatches,
                strategy: None,
                skipped: Vec::new(),
                records: Vec::new(),
            },
        }
    }

    /// Detail view of one record, cache first.
    pub fn show(&self, id: EntryId, sink: &dyn RecordSink) -> Result<ShowResult, CatalogError> {
        let record = match self.catalog.cached(id) {
            Some(record) => record,
            None => match self.catalog.resolve_query(&id.to_string(), sink) {
                QueryOutcome::Matched { batch, .. } => batch
                    .records
                    .into_iter()
                    .next()
                    .ok_or_else(|| CatalogError::NoMatches(format!("#{id}")))?,
                QueryOutcome::Blank | QueryOutcome::NoMatches => {
                    return Err(CatalogError::NoMatches(format!("#{id}")));
                }
            },
        };
        Ok(ShowResult {
            detail: DetailView::from_record(&record),
            record,
        })
    }

    fn page_result(&self, start: EntryId, batch: BatchResult) -> PageResult {
        PageResult {
            start,
            next_cursor: self.catalog.cursor(),
            cache_hits: batch.cache_hits,
            fetched: batch.fetched,
            skipped: batch.skipped,
            records: batch.records,
        }
    }
}
