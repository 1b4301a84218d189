use std::str::FromStr;

use assert_matches::assert_matches;

use dex_catalog::domain::{EntryId, Query};
use dex_catalog::error::CatalogError;

#[test]
fn entry_id_parse() {
    assert_eq!(EntryId::from_str("151").unwrap().get(), 151);
    assert_matches!(EntryId::from_str("0"), Err(CatalogError::InvalidEntryId(_)));
    assert_matches!(EntryId::from_str("+1"), Err(CatalogError::InvalidEntryId(_)));
}

#[test]
fn entry_id_next_and_display() {
    let id = EntryId::new(9).unwrap();
    assert_eq!(id.next().get(), 10);
    assert_eq!(id.to_string(), "9");
    assert_eq!(EntryId::new(u32::MAX).unwrap().next().get(), u32::MAX);
}

#[test]
fn query_dispatch_forms() {
    assert_eq!(Query::parse(""), Query::Blank);
    assert_eq!(Query::parse("   "), Query::Blank);
    assert_eq!(Query::parse("#"), Query::Blank);
    assert_eq!(Query::parse("7"), Query::Id(EntryId::new(7).unwrap()));
    assert_eq!(Query::parse("#25"), Query::Id(EntryId::new(25).unwrap()));
    assert_eq!(Query::parse("000"), Query::InvalidId("000".to_string()));
    assert_eq!(Query::parse("Mr-Mime"), Query::Name("mr-mime".to_string()));
    assert_eq!(Query::parse("porygon2"), Query::Name("porygon2".to_string()));
}
