use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;

use serde::Serialize;

use crate::config::{LanguagePreference, ResolvedConfig};
use crate::domain::{EntryId, NormalizedRecord, Query};
use crate::index::CatalogIndex;
use crate::pokeapi::{CatalogClient, DetailLookup, normalize_record, species_url};

/// Receives records as a batch emits them. Implemented by renderers.
pub trait RecordSink {
    fn record(&self, record: &NormalizedRecord);
}

pub struct NoopSink;

impl RecordSink for NoopSink {
    fn record(&self, _record: &NormalizedRecord) {}
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub match_cap: usize,
    pub max_concurrent_fetches: usize,
    pub languages: LanguagePreference,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self::from(&ResolvedConfig::default())
    }
}

impl From<&ResolvedConfig> for CatalogOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            match_cap: config.match_cap,
            max_concurrent_fetches: config.max_concurrent_fetches,
            languages: config.languages.clone(),
        }
    }
}

/// Records produced by one batch, in emission order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub records: Vec<NormalizedRecord>,
    pub cache_hits: usize,
    pub fetched: usize,
    pub skipped: Vec<EntryId>,
}

impl BatchResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Id,
    ExactName,
    Substring,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The query was empty after normalisation.
    Blank,
    /// At least one candidate was found. `batch` may still be empty when
    /// every candidate failed to load.
    Matched {
        strategy: MatchStrategy,
        batch: BatchResult,
    },
    NoMatches,
}

enum Settled {
    Cached(NormalizedRecord),
    Fetched(NormalizedRecord),
    Skipped(EntryId),
}

#[derive(Debug)]
struct CursorState {
    next: EntryId,
    generation: u64,
}

/// Owns the index, the record cache and the paging cursor.
///
/// All methods take `&self`: overlapping batches from different threads are
/// allowed. Cache writes keep the first value stored for an id and cursor
/// commits never move backwards within one reset generation.
pub struct Catalog<C: CatalogClient> {
    client: C,
    index: CatalogIndex,
    options: CatalogOptions,
    cache: Mutex<HashMap<EntryId, NormalizedRecord>>,
    cursor: Mutex<CursorState>,
}

impl<C: CatalogClient> Catalog<C> {
    pub fn new(client: C, index: CatalogIndex, options: CatalogOptions) -> Self {
        Self {
            client,
            index,
            options,
            cache: Mutex::new(HashMap::new()),
            cursor: Mutex::new(CursorState {
                next: EntryId::FIRST,
                generation: 0,
            }),
        }
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cursor(&self) -> EntryId {
        self.lock_cursor().next
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn cached(&self, id: EntryId) -> Option<NormalizedRecord> {
        self.lock_cache().get(&id).cloned()
    }

    /// Loads up to `count` index entries with id >= `start`, then moves the
    /// cursor past the last selected entry.
    pub fn load_range(&self, start: EntryId, count: usize, sink: &dyn RecordSink) -> BatchResult {
        let generation = self.lock_cursor().generation;
        let ids: Vec<EntryId> = self
            .index
            .select_from(start, count)
            .iter()
            .map(|entry| entry.id)
            .collect();
        let Some(last) = ids.last().copied() else {
            tracing::debug!(%start, "no index entries at or after start");
            return BatchResult::default();
        };

        let batch = self.hydrate(&ids, sink);
        self.commit_cursor(generation, last.next());
        tracing::info!(
            %start,
            selected = ids.len(),
            cache_hits = batch.cache_hits,
            fetched = batch.fetched,
            skipped = batch.skipped.len(),
            cursor = %self.cursor(),
            "range loaded"
        );
        batch
    }

    /// `load_range` from the current cursor.
    pub fn load_next(&self, count: usize, sink: &dyn RecordSink) -> BatchResult {
        self.load_range(self.cursor(), count, sink)
    }

    pub fn resolve_query(&self, raw: &str, sink: &dyn RecordSink) -> QueryOutcome {
        match Query::parse(raw) {
            Query::Blank => QueryOutcome::Blank,
            Query::InvalidId(text) => {
                tracing::debug!(query = %text, "numeric query is not a valid id");
                QueryOutcome::NoMatches
            }
            Query::Id(id) => {
                let batch = self.hydrate(&[id], sink);
                if batch.is_empty() {
                    QueryOutcome::NoMatches
                } else {
                    QueryOutcome::Matched {
                        strategy: MatchStrategy::Id,
                        batch,
                    }
                }
            }
            Query::Name(name) => {
                if let Some(entry) = self.index.find_exact(&name) {
                    let batch = self.hydrate(&[entry.id], sink);
                    return QueryOutcome::Matched {
                        strategy: MatchStrategy::ExactName,
                        batch,
                    };
                }
                let ids: Vec<EntryId> = self
                    .index
                    .substring_matches(&name, self.options.match_cap)
                    .into_iter()
                    .map(|entry| entry.id)
                    .collect();
                if ids.is_empty() {
                    return QueryOutcome::NoMatches;
                }
                let batch = self.hydrate(&ids, sink);
                QueryOutcome::Matched {
                    strategy: MatchStrategy::Substring,
                    batch,
                }
            }
        }
    }

    /// Rewinds the cursor. Cached records stay valid and are reused.
    pub fn reset(&self) {
        let mut cursor = self.lock_cursor();
        cursor.next = EntryId::FIRST;
        cursor.generation = cursor.generation.wrapping_add(1);
        tracing::debug!(generation = cursor.generation, "cursor reset");
    }

    fn commit_cursor(&self, generation: u64, candidate: EntryId) {
        let mut cursor = self.lock_cursor();
        if cursor.generation != generation {
            tracing::debug!(%candidate, "discarding cursor from batch started before reset");
            return;
        }
        cursor.next = cursor.next.max(candidate);
    }

    // Cache first, then fetch the misses concurrently; emits in `ids` order
    // once every fetch has settled.
    fn hydrate(&self, ids: &[EntryId], sink: &dyn RecordSink) -> BatchResult {
        let mut settled: Vec<Option<Settled>> = {
            let cache = self.lock_cache();
            ids.iter()
                .map(|id| cache.get(id).cloned().map(Settled::Cached))
                .collect()
        };

        let misses: Vec<(usize, EntryId)> = ids
            .iter()
            .enumerate()
            .filter(|(pos, _)| settled[*pos].is_none())
            .map(|(pos, id)| (pos, *id))
            .collect();

        let workers = self.options.max_concurrent_fetches.max(1);
        for chunk in misses.chunks(workers) {
            let results: Vec<(usize, Settled)> = thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&(pos, id)| (pos, id, scope.spawn(move || self.fetch_one(id))))
                    .collect();
                handles
                    .into_iter()
                    .map(|(pos, id, handle)| {
                        let outcome = match handle.join() {
                            Ok(Some(record)) => Settled::Fetched(self.store(record)),
                            Ok(None) => Settled::Skipped(id),
                            Err(_) => {
                                tracing::warn!(%id, "fetch worker panicked");
                                Settled::Skipped(id)
                            }
                        };
                        (pos, outcome)
                    })
                    .collect()
            });
            for (pos, outcome) in results {
                settled[pos] = Some(outcome);
            }
        }

        let mut batch = BatchResult::default();
        for (outcome, id) in settled.into_iter().zip(ids) {
            match outcome {
                Some(Settled::Cached(record)) => {
                    batch.cache_hits += 1;
                    sink.record(&record);
                    batch.records.push(record);
                }
                Some(Settled::Fetched(record)) => {
                    batch.fetched += 1;
                    sink.record(&record);
                    batch.records.push(record);
                }
                Some(Settled::Skipped(id)) => batch.skipped.push(id),
                None => batch.skipped.push(*id),
            }
        }
        batch
    }

    fn fetch_one(&self, id: EntryId) -> Option<NormalizedRecord> {
        let detail = match self.client.fetch_detail(id) {
            Ok(DetailLookup::Found(detail)) => detail,
            Ok(DetailLookup::NotFound) => {
                tracing::debug!(%id, "entry not found, skipping");
                return None;
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "detail fetch failed, skipping");
                return None;
            }
        };
        let species = species_url(&detail).and_then(|url| self.client.fetch_secondary(url));
        match normalize_record(&detail, species.as_ref(), &self.options.languages) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(%id, error = %err, "detail payload rejected, skipping");
                None
            }
        }
    }

    // Only index members are cached; the first stored value for an id wins.
    fn store(&self, record: NormalizedRecord) -> NormalizedRecord {
        if !self.index.contains(record.id) {
            return record;
        }
        self.lock_cache()
            .entry(record.id)
            .or_insert(record)
            .clone()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<EntryId, NormalizedRecord>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_cursor(&self) -> std::sync::MutexGuard<'_, CursorState> {
        self.cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::domain::CatalogEntry;
    use crate::error::CatalogError;
    use crate::pokeapi::ListingItem;

    struct NeverClient;

    impl CatalogClient for NeverClient {
        fn fetch_listing(&self) -> Result<Vec<ListingItem>, CatalogError> {
            Ok(Vec::new())
        }

        fn fetch_detail(&self, _id: EntryId) -> Result<DetailLookup, CatalogError> {
            Err(CatalogError::Http("offline".to_string()))
        }

        fn fetch_secondary(&self, _url: &str) -> Option<Value> {
            None
        }
    }

    fn id(value: u32) -> EntryId {
        EntryId::new(value).unwrap()
    }

    fn catalog(ids: &[u32]) -> Catalog<NeverClient> {
        let entries = ids
            .iter()
            .map(|value| CatalogEntry {
                id: id(*value),
                name: format!("entry-{value}"),
                source_url: format!("https://x/pokemon/{value}/"),
            })
            .collect();
        Catalog::new(
            NeverClient,
            CatalogIndex::from_entries(entries),
            CatalogOptions::default(),
        )
    }

    #[test]
    fn stale_generation_does_not_move_cursor() {
        let catalog = catalog(&[1, 2, 3]);
        let generation = catalog.lock_cursor().generation;
        catalog.reset();
        catalog.commit_cursor(generation, id(40));
        assert_eq!(catalog.cursor(), EntryId::FIRST);
    }

    #[test]
    fn commit_never_regresses() {
        let catalog = catalog(&[1, 2, 3]);
        catalog.commit_cursor(0, id(9));
        catalog.commit_cursor(0, id(4));
        assert_eq!(catalog.cursor(), id(9));
    }

    #[test]
    fn failed_fetches_still_advance_cursor() {
        let catalog = catalog(&[1, 2, 3]);
        let batch = catalog.load_range(EntryId::FIRST, 2, &NoopSink);
        assert!(batch.is_empty());
        assert_eq!(batch.skipped, vec![id(1), id(2)]);
        assert_eq!(catalog.cursor(), id(3));
        assert_eq!(catalog.cache_len(), 0);
    }
}
