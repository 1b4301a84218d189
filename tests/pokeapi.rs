use std::fs;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use dex_catalog::config::{LanguagePreference, ResolvedConfig};
use dex_catalog::domain::EntryId;
use dex_catalog::error::CatalogError;
use dex_catalog::pokeapi::{PokeApiHttpClient, normalize_record, species_url};
use dex_catalog::render::{CardView, DetailView, DisplayLimits};

fn fixture(name: &str) -> Value {
    let raw = fs::read_to_string(format!("tests/fixtures/{name}")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn normalize_squirtle_fixture() {
    let detail = fixture("pokemon_7.json");
    let species = fixture("species_7.json");

    assert_eq!(
        species_url(&detail),
        Some("https://pokeapi.co/api/v2/pokemon-species/7/")
    );

    let record = normalize_record(&detail, Some(&species), &LanguagePreference::default()).unwrap();
    assert_eq!(record.id, EntryId::new(7).unwrap());
    assert_eq!(record.name, "squirtle");
    assert_eq!(record.types, vec!["water".to_string()]);
    assert_eq!(record.primary_type(), Some("water"));
    assert!(
        record
            .sprite_url
            .as_deref()
            .is_some_and(|url| url.contains("official-artwork"))
    );
    assert_eq!(record.stats.len(), 6);
    assert_eq!(record.stats[0].name, "hp");
    assert_eq!(record.stats[0].value, 44);
    assert_eq!(record.weight_deci, 90);
    assert_eq!(record.height_deci, 5);
    assert_eq!(record.abilities, vec!["torrent", "rain-dish"]);
    assert!(record.flavor_text.starts_with("After birth"));

    let detail_view = DetailView::from_record(&record);
    assert_eq!(detail_view.id_label, "#007");
    assert_eq!(detail_view.height, "0.5 m");
    assert_eq!(detail_view.weight, "9 kg");
    assert_eq!(detail_view.abilities, "torrent, rain-dish");
    assert!(!detail_view.flavor.contains('\n'));
    assert!(!detail_view.flavor.contains('\u{c}'));

    let card = CardView::from_record(&record, DisplayLimits::for_width(60, 80));
    assert_eq!(card.stats.len(), 4);
}

#[test]
fn flavor_falls_back_to_second_language() {
    let detail = fixture("pokemon_7.json");
    let species = fixture("species_7.json");
    let languages = LanguagePreference {
        preferred: "ja".to_string(),
        fallback: "fr".to_string(),
    };
    let record = normalize_record(&detail, Some(&species), &languages).unwrap();
    assert!(record.flavor_text.starts_with("Après la naissance"));
}

#[test]
fn missing_species_and_artwork_degrade() {
    let detail = json!({
        "id": 132,
        "name": "ditto",
        "sprites": { "front_default": "https://img/132.png", "other": {} },
        "types": [{ "type": { "name": "normal" } }]
    });
    let record = normalize_record(&detail, None, &LanguagePreference::default()).unwrap();
    assert_eq!(record.sprite_url.as_deref(), Some("https://img/132.png"));
    assert_eq!(record.flavor_text, "");
    assert!(record.stats.is_empty());
    assert_eq!(record.weight_deci, 0);
}

#[test]
fn payload_without_name_is_rejected() {
    let detail = json!({ "id": 3 });
    assert_matches!(
        normalize_record(&detail, None, &LanguagePreference::default()),
        Err(CatalogError::Decode(_))
    );
}

#[test]
fn urls_follow_configured_base() {
    let config = ResolvedConfig {
        api_base: "http://localhost:8080/api/v2".to_string(),
        ..ResolvedConfig::default()
    };
    let client = PokeApiHttpClient::new(&config).unwrap();
    assert_eq!(
        client.listing_url(),
        "http://localhost:8080/api/v2/pokemon?limit=100000&offset=0"
    );
    assert_eq!(
        client.detail_url(EntryId::new(25).unwrap()),
        "http://localhost:8080/api/v2/pokemon/25"
    );
}
