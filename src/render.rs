//! Render-side view models: everything here is derived from a
//! [`NormalizedRecord`] and never feeds back into the catalog.

use serde::Serialize;

use crate::domain::{EntryId, NormalizedRecord, StatValue};

const CARD_STATS: usize = 4;
const COMPACT_NAME_LIMIT: usize = 12;
const COMPACT_FLAVOR_LIMIT: usize = 70;
const WIDE_NAME_LIMIT: usize = 999;
const WIDE_FLAVOR_LIMIT: usize = 120;

const TYPE_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("normal", (0xA8, 0xA7, 0x7A)),
    ("fire", (0xEE, 0x81, 0x30)),
    ("water", (0x63, 0x90, 0xF0)),
    ("electric", (0xF7, 0xD0, 0x2C)),
    ("grass", (0x7A, 0xC7, 0x4C)),
    ("ice", (0x96, 0xD9, 0xD6)),
    ("fighting", (0xC2, 0x2E, 0x28)),
    ("poison", (0xA3, 0x3E, 0xA1)),
    ("ground", (0xE2, 0xBF, 0x65)),
    ("flying", (0xA9, 0x8F, 0xF3)),
    ("psychic", (0xF9, 0x55, 0x87)),
    ("bug", (0xA6, 0xB9, 0x1A)),
    ("rock", (0xB6, 0xA1, 0x36)),
    ("ghost", (0x73, 0x57, 0x97)),
    ("dragon", (0x6F, 0x35, 0xFC)),
    ("dark", (0x70, 0x57, 0x46)),
    ("steel", (0xB7, 0xB7, 0xCE)),
    ("fairy", (0xD6, 0x85, 0xAD)),
];

/// Truncation lengths, chosen from the available width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLimits {
    pub name: usize,
    pub flavor: usize,
}

impl DisplayLimits {
    pub fn for_width(width: u16, compact_below: u16) -> Self {
        if width < compact_below {
            Self {
                name: COMPACT_NAME_LIMIT,
                flavor: COMPACT_FLAVOR_LIMIT,
            }
        } else {
            Self {
                name: WIDE_NAME_LIMIT,
                flavor: WIDE_FLAVOR_LIMIT,
            }
        }
    }
}

/// RGB colour for a type name, if it is one of the known types.
pub fn type_color(type_name: &str) -> Option<(u8, u8, u8)> {
    TYPE_COLORS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, rgb)| *rgb)
}

/// `#001`-style label.
pub fn format_id(id: EntryId) -> String {
    format!("#{:03}", id.get())
}

/// Collapses line breaks and cuts `text` to `limit` characters plus `...`.
pub fn shorten(text: &str, limit: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\u{c}') { ' ' } else { c })
        .collect();
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut: String = flat.chars().take(limit).collect();
    format!("{}...", cut.trim())
}

/// Tenths of a unit as a short decimal: 7 -> "0.7", 20 -> "2".
pub fn format_tenths(value: u32) -> String {
    if value % 10 == 0 {
        format!("{}", value / 10)
    } else {
        format!("{}.{}", value / 10, value % 10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: EntryId,
    pub id_label: String,
    pub name: String,
    pub primary_type: String,
    pub types: Vec<String>,
    pub flavor: String,
    pub stats: Vec<StatValue>,
    pub sprite_url: Option<String>,
}

impl CardView {
    pub fn from_record(record: &NormalizedRecord, limits: DisplayLimits) -> Self {
        Self {
            id: record.id,
            id_label: format_id(record.id),
            name: shorten(&record.name, limits.name),
            primary_type: record.primary_type().unwrap_or("normal").to_string(),
            types: record.types.clone(),
            flavor: shorten(&record.flavor_text, limits.flavor),
            stats: record.stats.iter().take(CARD_STATS).cloned().collect(),
            sprite_url: record.sprite_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub title: String,
    pub id_label: String,
    pub types: Vec<String>,
    pub flavor: String,
    pub height: String,
    pub weight: String,
    pub abilities: String,
    pub stats: Vec<StatValue>,
    pub sprite_url: Option<String>,
}

impl DetailView {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            title: record.name.clone(),
            id_label: format_id(record.id),
            types: record.types.clone(),
            flavor: shorten(&record.flavor_text, usize::MAX),
            height: format!("{} m", format_tenths(record.height_deci)),
            weight: format!("{} kg", format_tenths(record.weight_deci)),
            abilities: record.abilities.join(", "),
            stats: record.stats.clone(),
            sprite_url: record.sprite_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            id: EntryId::new(7).unwrap(),
            name: "squirtle".to_string(),
            types: vec!["water".to_string()],
            sprite_url: None,
            stats: ["hp", "attack", "defense", "special-attack", "speed"]
                .iter()
                .map(|name| StatValue {
                    name: name.to_string(),
                    value: 44,
                })
                .collect(),
            weight_deci: 90,
            height_deci: 5,
            abilities: vec!["torrent".to_string(), "rain-dish".to_string()],
            flavor_text: "After birth, its back swells\nand hardens into a shell.".to_string(),
        }
    }

    #[test]
    fn shorten_flattens_and_truncates() {
        assert_eq!(shorten("a\nb", 10), "a b");
        assert_eq!(shorten("bulbasaur", 4), "bulb...");
        assert_eq!(shorten("ab cd", 3), "ab...");
        assert_eq!(shorten("", 3), "");
    }

    #[test]
    fn id_label_is_zero_padded() {
        assert_eq!(format_id(EntryId::new(7).unwrap()), "#007");
        assert_eq!(format_id(EntryId::new(1025).unwrap()), "#1025");
    }

    #[test]
    fn limits_follow_width() {
        assert_eq!(DisplayLimits::for_width(60, 80).flavor, COMPACT_FLAVOR_LIMIT);
        assert_eq!(DisplayLimits::for_width(120, 80).name, WIDE_NAME_LIMIT);
    }

    #[test]
    fn card_keeps_first_four_stats() {
        let card = CardView::from_record(&record(), DisplayLimits::for_width(60, 80));
        assert_eq!(card.stats.len(), 4);
        assert_eq!(card.id_label, "#007");
        assert_eq!(card.primary_type, "water");
        assert!(!card.flavor.contains('\n'));
    }

    #[test]
    fn detail_converts_units() {
        let detail = DetailView::from_record(&record());
        assert_eq!(detail.height, "0.5 m");
        assert_eq!(detail.weight, "9 kg");
        assert_eq!(detail.abilities, "torrent, rain-dish");
    }

    #[test]
    fn unknown_type_has_no_color() {
        assert!(type_color("fire").is_some());
        assert!(type_color("stellar").is_none());
    }
}
