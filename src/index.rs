use crate::domain::{CatalogEntry, EntryId};
use crate::pokeapi::ListingItem;

/// The universe of known entries, ordered ascending by id.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
}

/// Builds the ordered index from the raw listing. Rows whose URL does not end
/// in a usable numeric id are dropped.
pub fn build_index(listing: Vec<ListingItem>) -> CatalogIndex {
    let total = listing.len();
    let mut entries: Vec<CatalogEntry> = listing
        .into_iter()
        .filter_map(|item| match id_from_url(&item.url) {
            Some(id) => Some(CatalogEntry {
                id,
                name: item.name,
                source_url: item.url,
            }),
            None => {
                tracing::debug!(name = %item.name, url = %item.url, "dropping listing row without numeric id");
                None
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.id);

    if entries.len() < total {
        tracing::info!(
            kept = entries.len(),
            dropped = total - entries.len(),
            "catalog index built with malformed rows dropped"
        );
    }
    CatalogIndex { entries }
}

/// Last non-empty path segment of `url`, parsed as an id.
pub fn id_from_url(url: &str) -> Option<EntryId> {
    url.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .and_then(|segment| segment.parse::<EntryId>().ok())
}

impl CatalogIndex {
    pub fn from_entries(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by_key(|entry| entry.id);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.position(id).is_ok()
    }

    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        self.position(id).ok().map(|pos| &self.entries[pos])
    }

    /// Up to `count` entries with id >= `start`, ascending. Ids may be sparse.
    pub fn select_from(&self, start: EntryId, count: usize) -> &[CatalogEntry] {
        let from = match self.position(start) {
            Ok(pos) | Err(pos) => pos,
        };
        let to = from.saturating_add(count).min(self.entries.len());
        &self.entries[from..to]
    }

    /// First entry whose name equals `name`.
    pub fn find_exact(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Entries whose name contains `needle`, in index order, at most `cap`.
    pub fn substring_matches(&self, needle: &str, cap: usize) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.name.contains(needle))
            .take(cap)
            .collect()
    }

    fn position(&self, id: EntryId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |entry| entry.id)
    }
}
