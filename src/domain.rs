use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Numeric identifier of a catalog entry, as encoded in the listing URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u32);

impl EntryId {
    pub const FIRST: EntryId = EntryId(1);

    pub fn new(value: u32) -> Result<Self, CatalogError> {
        if value == 0 {
            return Err(CatalogError::InvalidEntryId(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id following this one, saturating at the top of the id space.
    pub fn next(self) -> EntryId {
        EntryId(self.0.saturating_add(1))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(CatalogError::InvalidEntryId(value.to_string()));
        }
        let number = trimmed
            .parse::<u32>()
            .map_err(|_| CatalogError::InvalidEntryId(value.to_string()))?;
        EntryId::new(number).map_err(|_| CatalogError::InvalidEntryId(value.to_string()))
    }
}

/// One listing row: identity only, before any detail has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub name: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatValue {
    pub name: String,
    pub value: u32,
}

/// Render-ready form of an entry. Never mutated once cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub id: EntryId,
    pub name: String,
    pub types: Vec<String>,
    pub sprite_url: Option<String>,
    pub stats: Vec<StatValue>,
    pub weight_deci: u32,
    pub height_deci: u32,
    pub abilities: Vec<String>,
    pub flavor_text: String,
}

impl NormalizedRecord {
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}

/// A user query after normalisation, in dispatch priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Blank,
    Id(EntryId),
    /// All digits, but not a usable id (zero or out of range).
    InvalidId(String),
    Name(String),
}

impl Query {
    pub fn parse(raw: &str) -> Query {
        let lowered = raw.trim().to_lowercase();
        let text = lowered.strip_prefix('#').unwrap_or(&lowered).trim();
        if text.is_empty() {
            return Query::Blank;
        }
        if text.chars().all(|c| c.is_ascii_digit()) {
            return match text.parse::<EntryId>() {
                Ok(id) => Query::Id(id),
                Err(_) => Query::InvalidId(text.to_string()),
            };
        }
        Query::Name(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_entry_id_valid() {
        let id: EntryId = "25".parse().unwrap();
        assert_eq!(id.get(), 25);
    }

    #[test]
    fn parse_entry_id_rejects_zero_and_text() {
        assert_matches!("0".parse::<EntryId>(), Err(CatalogError::InvalidEntryId(_)));
        assert_matches!("abc".parse::<EntryId>(), Err(CatalogError::InvalidEntryId(_)));
        assert_matches!("-4".parse::<EntryId>(), Err(CatalogError::InvalidEntryId(_)));
        assert_matches!(
            "99999999999".parse::<EntryId>(),
            Err(CatalogError::InvalidEntryId(_))
        );
    }

    #[test]
    fn query_strips_marker_and_case() {
        assert_eq!(Query::parse("  #007 "), Query::Id(EntryId::new(7).unwrap()));
        assert_eq!(Query::parse("SQUIRTLE"), Query::Name("squirtle".to_string()));
        assert_eq!(Query::parse("   "), Query::Blank);
        assert_eq!(Query::parse("#"), Query::Blank);
    }

    #[test]
    fn query_zero_is_invalid_id() {
        assert_matches!(Query::parse("#0"), Query::InvalidId(_));
    }

    #[test]
    fn hash_inside_name_is_kept() {
        assert_eq!(Query::parse("mr#mime"), Query::Name("mr#mime".to_string()));
    }
}
