use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{LanguagePreference, ResolvedConfig};
use crate::domain::{EntryId, NormalizedRecord, StatValue};
use crate::error::CatalogError;

/// Row of the bulk listing response. `url` ends with the entry's numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingItem {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ListingPage {
    results: Vec<ListingItem>,
}

/// Outcome of a detail request. A non-success response is `NotFound`, so a
/// batch can skip the entry without aborting.
#[derive(Debug, Clone)]
pub enum DetailLookup {
    Found(Value),
    NotFound,
}

pub trait CatalogClient: Send + Sync {
    fn fetch_listing(&self) -> Result<Vec<ListingItem>, CatalogError>;
    fn fetch_detail(&self, id: EntryId) -> Result<DetailLookup, CatalogError>;
    /// Best effort: any failure is reported as `None`.
    fn fetch_secondary(&self, url: &str) -> Option<Value>;
}

#[derive(Clone)]
pub struct PokeApiHttpClient {
    client: Client,
    base_url: String,
}

impl PokeApiHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("dexcat/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base.clone(),
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}/pokemon?limit=100000&offset=0", self.base_url)
    }

    pub fn detail_url(&self, id: EntryId) -> String {
        format!("{}/pokemon/{}", self.base_url, id)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, CatalogError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying catalog request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying catalog request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(CatalogError::Http(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CatalogError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(CatalogError::Status { status, message })
    }
}

impl CatalogClient for PokeApiHttpClient {
    fn fetch_listing(&self) -> Result<Vec<ListingItem>, CatalogError> {
        let url = self.listing_url();
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let page: ListingPage = response
            .json()
            .map_err(|err| CatalogError::Decode(err.to_string()))?;
        Ok(page.results)
    }

    fn fetch_detail(&self, id: EntryId) -> Result<DetailLookup, CatalogError> {
        let url = self.detail_url(id);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        if !response.status().is_success() {
            tracing::debug!(%id, status = response.status().as_u16(), "detail not found");
            return Ok(DetailLookup::NotFound);
        }
        let raw: Value = response
            .json()
            .map_err(|err| CatalogError::Decode(err.to_string()))?;
        Ok(DetailLookup::Found(raw))
    }

    fn fetch_secondary(&self, url: &str) -> Option<Value> {
        let result = self
            .send_with_retries(|| self.client.get(url))
            .and_then(Self::handle_status)
            .and_then(|response| {
                response
                    .json::<Value>()
                    .map_err(|err| CatalogError::Decode(err.to_string()))
            });
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(url, error = %err, "species lookup failed");
                None
            }
        }
    }
}

/// URL of the species document referenced by a detail payload.
pub fn species_url(detail: &Value) -> Option<&str> {
    detail
        .get("species")
        .and_then(|v| v.get("url"))
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Maps a detail payload plus an optional species payload onto the
/// render-ready record.
pub fn normalize_record(
    detail: &Value,
    species: Option<&Value>,
    languages: &LanguagePreference,
) -> Result<NormalizedRecord, CatalogError> {
    let id = detail
        .get("id")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| CatalogError::Decode("detail payload has no numeric id".to_string()))
        .and_then(EntryId::new)?;
    let name = detail
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CatalogError::Decode(format!("detail payload for {id} has no name")))?
        .to_string();

    let types = named_list(detail, "types", "type");
    let abilities = named_list(detail, "abilities", "ability");

    let sprites = detail.get("sprites");
    let sprite_url = sprites
        .and_then(|v| v.get("other"))
        .and_then(|v| v.get("official-artwork"))
        .and_then(|v| v.get("front_default"))
        .and_then(|v| v.as_str())
        .or_else(|| {
            sprites
                .and_then(|v| v.get("front_default"))
                .and_then(|v| v.as_str())
        })
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());

    let mut stats = Vec::new();
    if let Some(items) = detail.get("stats").and_then(|v| v.as_array()) {
        for item in items {
            let stat_name = item
                .get("stat")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str());
            let value = item.get("base_stat").and_then(as_u32);
            if let (Some(stat_name), Some(value)) = (stat_name, value) {
                stats.push(StatValue {
                    name: stat_name.to_string(),
                    value,
                });
            }
        }
    }

    Ok(NormalizedRecord {
        id,
        name,
        types,
        sprite_url,
        stats,
        weight_deci: detail.get("weight").and_then(as_u32).unwrap_or(0),
        height_deci: detail.get("height").and_then(as_u32).unwrap_or(0),
        abilities,
        flavor_text: species
            .and_then(|species| select_flavor_text(species, languages))
            .unwrap_or_default(),
    })
}

/// First flavour text in the preferred language, else the fallback language.
pub fn select_flavor_text(species: &Value, languages: &LanguagePreference) -> Option<String> {
    let entries = species.get("flavor_text_entries")?.as_array()?;
    let in_language = |lang: &str| {
        entries.iter().find_map(|entry| {
            let entry_lang = entry
                .get("language")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str())?;
            if entry_lang != lang {
                return None;
            }
            entry
                .get("flavor_text")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string())
        })
    };
    in_language(&languages.preferred).or_else(|| in_language(&languages.fallback))
}

// `[{ "<inner>": { "name": ... } }]` -> names, in order.
fn named_list(raw: &Value, field: &str, inner: &str) -> Vec<String> {
    raw.get(field)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get(inner)
                        .and_then(|v| v.get("name"))
                        .and_then(|v| v.as_str())
                        .map(|v| v.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
