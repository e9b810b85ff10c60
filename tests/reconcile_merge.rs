use std::collections::BTreeMap;

use tagdeck::model::{CatalogEntry, NEW_TAB, RemoteTag, Tab, default_tabs};
use tagdeck::reconcile::{ensure_new_tab, format_display_name, reconcile};

fn entry(id: &str, category: Option<&str>) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        display_name: format_display_name(id),
        category: category.map(|c| c.to_string()),
        size_gb: None,
        estimated_hours: None,
        date_added: None,
    }
}

fn tag(name: &str) -> RemoteTag {
    RemoteTag {
        name: name.to_string(),
        full_size: None,
        last_updated: None,
    }
}

fn tag_with(name: &str, full_size: Option<u64>, last_updated: Option<&str>) -> RemoteTag {
    RemoteTag {
        name: name.to_string(),
        full_size,
        last_updated: last_updated.map(|d| d.to_string()),
    }
}

#[test]
fn detects_new_tags_and_assigns_new_category() {
    let catalog = vec![entry("foo", Some("games"))];
    let tags = vec![tag("foo"), tag("bar")];

    let outcome = reconcile(&catalog, &tags, &BTreeMap::new());

    assert_eq!(outcome.newly_added, vec!["bar".to_string()]);
    assert_eq!(outcome.catalog.len(), 2);
    let bar = outcome.catalog.iter().find(|e| e.id == "bar").unwrap();
    assert_eq!(bar.category.as_deref(), Some(NEW_TAB));
    // A new entry always carries a date even when the tag reports none.
    assert!(bar.date_added.is_some());
}

#[test]
fn reconcile_is_idempotent() {
    let catalog = vec![entry("foo", Some("games"))];
    let tags = vec![
        tag_with("foo", Some(2_147_483_648), Some("2024-03-01T10:00:00Z")),
        tag_with("bar", Some(1_610_612_736), None),
    ];
    let mut overrides = BTreeMap::new();
    overrides.insert("foo".to_string(), "classics".to_string());

    let once = reconcile(&catalog, &tags, &overrides);
    let twice = reconcile(&once.catalog, &tags, &overrides);

    assert_eq!(once.catalog, twice.catalog);
    assert!(twice.newly_added.is_empty());
    assert_eq!(twice.changed_metadata, 0);
}

#[test]
fn saved_override_wins_over_registry_and_new_category() {
    let catalog = vec![entry("foo", Some("games"))];
    let tags = vec![tag("foo"), tag("bar")];
    let mut overrides = BTreeMap::new();
    overrides.insert("BAR".to_string(), "shooters".to_string());
    overrides.insert("foo".to_string(), "classics".to_string());

    let outcome = reconcile(&catalog, &tags, &overrides);

    let foo = outcome.catalog.iter().find(|e| e.id == "foo").unwrap();
    let bar = outcome.catalog.iter().find(|e| e.id == "bar").unwrap();
    assert_eq!(foo.category.as_deref(), Some("classics"));
    assert_eq!(bar.category.as_deref(), Some("shooters"));
}

#[test]
fn identity_is_case_insensitive() {
    let catalog = vec![entry("Foo", Some("games")), entry("foo", Some("dupes"))];
    let tags = vec![tag("FOO"), tag("foo")];

    let outcome = reconcile(&catalog, &tags, &BTreeMap::new());

    assert_eq!(outcome.catalog.len(), 1);
    assert!(outcome.newly_added.is_empty());

    let mut keys: Vec<String> = outcome.catalog.iter().map(|e| e.key()).collect();
    keys.dedup();
    assert_eq!(keys.len(), outcome.catalog.len());
}

#[test]
fn refresh_updates_size_and_date_but_not_category() {
    let mut catalog = vec![entry("foo", Some("games"))];
    catalog[0].size_gb = Some(1.0);
    catalog[0].date_added = Some("2023-01-01".to_string());

    let tags = vec![tag_with(
        "foo",
        Some(3_221_225_472),
        Some("2024-06-05T00:00:00Z"),
    )];

    let outcome = reconcile(&catalog, &tags, &BTreeMap::new());

    assert_eq!(outcome.changed_metadata, 1);
    let foo = &outcome.catalog[0];
    assert_eq!(foo.size_gb, Some(3.0));
    assert_eq!(foo.date_added.as_deref(), Some("2024-06-05T00:00:00Z"));
    assert_eq!(foo.category.as_deref(), Some("games"));
}

#[test]
fn absent_remote_metadata_leaves_existing_values_alone() {
    let mut catalog = vec![entry("foo", Some("games"))];
    catalog[0].size_gb = Some(4.2);
    catalog[0].date_added = Some("2023-01-01".to_string());

    let outcome = reconcile(&catalog, &[tag("foo")], &BTreeMap::new());

    assert_eq!(outcome.changed_metadata, 0);
    assert_eq!(outcome.catalog[0].size_gb, Some(4.2));
    assert_eq!(outcome.catalog[0].date_added.as_deref(), Some("2023-01-01"));
}

#[test]
fn size_is_gib_rounded_to_two_decimals() {
    let outcome = reconcile(
        &[],
        &[tag_with("foo", Some(1_610_612_736), None)],
        &BTreeMap::new(),
    );
    assert_eq!(outcome.catalog[0].size_gb, Some(1.5));

    let outcome = reconcile(
        &[],
        &[tag_with("bar", Some(1_234_567_890), None)],
        &BTreeMap::new(),
    );
    assert_eq!(outcome.catalog[0].size_gb, Some(1.15));
}

#[test]
fn formats_display_names() {
    assert_eq!(format_display_name("superMario64"), "Super Mario 64");
    assert_eq!(format_display_name("alan-wake2"), "Alan Wake 2");
    assert_eq!(format_display_name("doom_eternal"), "Doom Eternal");
    assert_eq!(format_display_name("halflife"), "Halflife");
}

#[test]
fn new_tab_synthesized_once_and_only_when_needed() {
    let mut tabs = default_tabs();

    ensure_new_tab(&mut tabs, &[]);
    assert!(!tabs.iter().any(|t| t.id == NEW_TAB));

    ensure_new_tab(&mut tabs, &["bar".to_string()]);
    assert!(tabs.iter().any(|t| t.id == NEW_TAB));

    ensure_new_tab(&mut tabs, &["baz".to_string()]);
    let count = tabs.iter().filter(|t| t.id == NEW_TAB).count();
    assert_eq!(count, 1);
}

#[test]
fn existing_new_tab_is_reused() {
    let mut tabs = vec![Tab {
        id: NEW_TAB.to_string(),
        name: "Fresh arrivals".to_string(),
        icon: None,
    }];
    ensure_new_tab(&mut tabs, &["bar".to_string()]);
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].name, "Fresh arrivals");
}

#[test]
fn empty_tag_names_are_skipped() {
    let outcome = reconcile(&[], &[tag(""), tag("ok")], &BTreeMap::new());
    assert_eq!(outcome.catalog.len(), 1);
    assert_eq!(outcome.newly_added, vec!["ok".to_string()]);
}
