use std::sync::Mutex;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use dex_catalog::app::{App, SearchStatus};
use dex_catalog::catalog::MatchStrategy;
use dex_catalog::config::ResolvedConfig;
use dex_catalog::domain::EntryId;
use dex_catalog::error::CatalogError;
use dex_catalog::output::JsonOutput;
use dex_catalog::pokeapi::{CatalogClient, DetailLookup, ListingItem};

struct MockPokeApi {
    listing: Result<Vec<(u32, &'static str)>, String>,
    detail_calls: Mutex<usize>,
}

impl MockPokeApi {
    fn starters() -> Self {
        Self {
            listing: Ok(vec![(3, "venusaur"), (1, "bulbasaur"), (2, "ivysaur")]),
            detail_calls: Mutex::new(0),
        }
    }

    fn name_of(&self, id: u32) -> Option<&'static str> {
        self.listing
            .as_ref()
            .ok()
            .and_then(|rows| rows.iter().find(|(row, _)| *row == id))
            .map(|(_, name)| *name)
    }
}

impl CatalogClient for MockPokeApi {
    fn fetch_listing(&self) -> Result<Vec<ListingItem>, CatalogError> {
        let rows = self.listing.clone().map_err(CatalogError::Http)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| ListingItem {
                name: name.to_string(),
                url: format!("https://pokeapi.co/api/v2/pokemon/{id}/"),
            })
            .collect())
    }

    fn fetch_detail(&self, id: EntryId) -> Result<DetailLookup, CatalogError> {
        *self.detail_calls.lock().unwrap() += 1;
        Ok(match self.name_of(id.get()) {
            Some(name) => DetailLookup::Found(json!({
                "id": id.get(),
                "name": name,
                "types": [{ "type": { "name": "grass" } }, { "type": { "name": "poison" } }],
                "stats": [{ "base_stat": 45, "stat": { "name": "hp" } }],
                "weight": 69,
                "height": 7,
                "abilities": [{ "ability": { "name": "overgrow" } }]
            })),
            None => DetailLookup::NotFound,
        })
    }

    fn fetch_secondary(&self, _url: &str) -> Option<Value> {
        None
    }
}

fn config_with_page_size(page_size: usize) -> ResolvedConfig {
    ResolvedConfig {
        page_size,
        ..ResolvedConfig::default()
    }
}

fn names(records: &[dex_catalog::domain::NormalizedRecord]) -> Vec<&str> {
    records.iter().map(|record| record.name.as_str()).collect()
}

#[test]
fn browse_then_search_then_reset() {
    let app = App::start(MockPokeApi::starters(), config_with_page_size(2)).unwrap();
    assert_eq!(app.catalog().index().len(), 3);

    let first = app.page(None, None, &JsonOutput);
    assert_eq!(names(&first.records), vec!["bulbasaur", "ivysaur"]);
    assert_eq!(first.next_cursor, EntryId::new(3).unwrap());

    let second = app.page(None, None, &JsonOutput);
    assert_eq!(names(&second.records), vec!["venusaur"]);
    assert_eq!(second.next_cursor, EntryId::new(4).unwrap());

    let search = app.search("saur", &JsonOutput);
    assert_eq!(search.status, SearchStatus::Matched);
    assert_eq!(search.strategy, Some(MatchStrategy::Substring));
    assert_eq!(names(&search.records), vec!["bulbasaur", "ivysaur", "venusaur"]);

    let calls = *app.catalog().client().detail_calls.lock().unwrap();
    let reset = app.search("   ", &JsonOutput);
    assert_eq!(reset.status, SearchStatus::Reset);
    assert_eq!(names(&reset.records), vec!["bulbasaur", "ivysaur"]);
    assert_eq!(app.catalog().cursor(), EntryId::new(3).unwrap());
    assert_eq!(*app.catalog().client().detail_calls.lock().unwrap(), calls);
}

#[test]
fn search_without_candidates_reports_no_matches() {
    let app = App::start(MockPokeApi::starters(), ResolvedConfig::default()).unwrap();
    let result = app.search("pikachu", &JsonOutput);
    assert_eq!(result.status, SearchStatus::NoMatches);
    assert!(result.records.is_empty());
    assert_eq!(*app.catalog().client().detail_calls.lock().unwrap(), 0);
}

#[test]
fn show_uses_cache_and_formats_detail() {
    let app = App::start(MockPokeApi::starters(), ResolvedConfig::default()).unwrap();
    app.page(None, None, &JsonOutput);
    let calls = *app.catalog().client().detail_calls.lock().unwrap();

    let shown = app.show(EntryId::new(1).unwrap(), &JsonOutput).unwrap();
    assert_eq!(shown.record.name, "bulbasaur");
    assert_eq!(shown.detail.id_label, "#001");
    assert_eq!(shown.detail.height, "0.7 m");
    assert_eq!(shown.detail.weight, "6.9 kg");
    assert_eq!(*app.catalog().client().detail_calls.lock().unwrap(), calls);

    assert_matches!(
        app.show(EntryId::new(99).unwrap(), &JsonOutput),
        Err(CatalogError::NoMatches(_))
    );
}

#[test]
fn listing_failure_is_fatal() {
    let client = MockPokeApi {
        listing: Err("connection refused".to_string()),
        detail_calls: Mutex::new(0),
    };
    assert_matches!(
        App::start(client, ResolvedConfig::default()).err(),
        Some(CatalogError::Http(_))
    );
}

#[test]
fn empty_listing_starts_with_empty_grid() {
    let client = MockPokeApi {
        listing: Ok(Vec::new()),
        detail_calls: Mutex::new(0),
    };
    let app = App::start(client, ResolvedConfig::default()).unwrap();
    let page = app.page(None, None, &JsonOutput);
    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, EntryId::FIRST);
}
