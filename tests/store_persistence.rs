use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result};

use tagdeck::engine::App;
use tagdeck::model::{ALL_TAB, CatalogEntry, Settings, SortKey};
use tagdeck::session::{Session, hash_password};
use tagdeck::store::LocalStore;

fn entry(id: &str, category: Option<&str>) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        display_name: id.to_string(),
        category: category.map(|c| c.to_string()),
        size_gb: None,
        estimated_hours: None,
        date_added: None,
    }
}

#[test]
fn open_requires_init() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    assert!(LocalStore::open(tmp.path()).is_err());

    LocalStore::init(tmp.path(), false)?;
    assert!(LocalStore::open(tmp.path()).is_ok());

    // Double init without force is rejected.
    assert!(LocalStore::init(tmp.path(), false).is_err());
    assert!(LocalStore::init(tmp.path(), true).is_ok());
    Ok(())
}

#[test]
fn settings_roundtrip() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut settings = Settings::default();
    settings.repo_name = "archive".to_string();
    settings.sort_key = SortKey::Size;
    store.write_settings(&settings)?;

    assert_eq!(store.read_settings(), settings);
    Ok(())
}

#[test]
fn corrupt_document_degrades_to_default_without_touching_others() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut installed = BTreeSet::new();
    installed.insert("doom".to_string());
    store.write_installed(&installed)?;

    let mut settings = Settings::default();
    settings.repo_name = "archive".to_string();
    store.write_settings(&settings)?;

    fs::write(
        tmp.path().join(".tagdeck").join("installed.json"),
        b"{not json",
    )
    .context("corrupt installed.json")?;

    assert!(store.read_installed().is_empty());
    assert_eq!(store.read_settings().repo_name, "archive");
    Ok(())
}

#[test]
fn move_noop_reports_zero_and_persists_nothing() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;
    store.write_catalog(&[entry("a", Some("games")), entry("b", Some("games"))])?;

    let mut app = App::load(&store);
    app.toggle_selection("a", true);
    app.toggle_selection("b", true);

    let changed = app.move_selected_to_category(&store, "games")?;
    assert_eq!(changed, 0);
    assert!(!store.has_doc("category_overrides.json"));
    Ok(())
}

#[test]
fn move_persists_full_category_map_and_survives_reload() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;
    store.write_catalog(&[entry("a", Some("games")), entry("b", Some("apps"))])?;

    let mut app = App::load(&store);
    app.toggle_selection("a", true);
    let changed = app.move_selected_to_category(&store, "classics")?;
    assert_eq!(changed, 1);

    let overrides = store.read_category_overrides();
    assert_eq!(overrides.get("a").map(String::as_str), Some("classics"));
    // The whole catalog's map is persisted, not just the moved entry.
    assert_eq!(overrides.get("b").map(String::as_str), Some("apps"));

    let reloaded = App::load(&store);
    let a = reloaded.catalog.iter().find(|e| e.id == "a").unwrap();
    assert_eq!(a.category.as_deref(), Some("classics"));
    // The target category is reachable as a tab.
    assert!(reloaded.tabs.iter().any(|t| t.id == "classics"));
    Ok(())
}

#[test]
fn selection_never_touches_the_catalog() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;
    store.write_catalog(&[entry("a", Some("games"))])?;

    let mut app = App::load(&store);
    let before = app.catalog.clone();

    app.toggle_selection("A", true);
    assert!(app.selection.contains("a"));

    let projection = app.project();
    app.select_all_visible(&projection);
    app.toggle_selection("a", false);
    app.deselect_all();
    assert!(app.selection.is_empty());
    assert_eq!(app.catalog, before);
    Ok(())
}

#[test]
fn hiding_tabs_requires_admin_and_spares_all() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut app = App::load(&store);
    assert!(app.hide_tab(&store, "beta").is_err());

    app.session = Session::with_hash(hash_password("pw"));
    assert!(app.authenticate("pw"));
    assert!(app.hide_tab(&store, ALL_TAB).is_err());

    app.hide_tab(&store, "beta")?;
    assert!(store.read_hidden_tabs().contains("beta"));

    // Hidden state persists even after the session ends.
    app.logout();
    assert!(store.read_hidden_tabs().contains("beta"));

    app.session = Session::with_hash(hash_password("pw"));
    app.authenticate("pw");
    app.unhide_tab(&store, "beta")?;
    assert!(store.read_hidden_tabs().is_empty());
    Ok(())
}

#[test]
fn installed_toggles_persist() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut app = App::load(&store);
    assert!(app.set_installed(&store, "Doom", true)?);
    assert!(!app.set_installed(&store, "doom", true)?);
    assert!(store.read_installed().contains("doom"));

    assert!(app.set_installed(&store, "DOOM", false)?);
    assert!(store.read_installed().is_empty());
    Ok(())
}

#[test]
fn import_rejects_malformed_json_atomically() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut app = App::load(&store);
    app.set_installed(&store, "doom", true)?;

    assert!(app.import_state(&store, "{broken").is_err());
    assert!(app.installed.contains("doom"));
    assert_eq!(store.read_settings(), Settings::default());
    Ok(())
}

#[test]
fn import_applies_present_fields_independently() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut app = App::load(&store);
    app.set_installed(&store, "doom", true)?;

    app.import_state(&store, r#"{"hidden_tabs": ["beta", "all"]}"#)?;

    // Hidden tabs applied (with `all` filtered), installed untouched.
    assert!(app.hidden_tabs.contains("beta"));
    assert!(!app.hidden_tabs.contains(ALL_TAB));
    assert!(app.installed.contains("doom"));
    assert!(store.read_hidden_tabs().contains("beta"));
    Ok(())
}

#[test]
fn export_import_roundtrip() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let store = LocalStore::init(tmp.path(), false)?;

    let mut app = App::load(&store);
    app.set_installed(&store, "doom", true)?;
    app.session = Session::with_hash(hash_password("pw"));
    app.authenticate("pw");
    app.hide_tab(&store, "beta")?;

    let snapshot = serde_json::to_string(&app.export_state()).context("serialize snapshot")?;

    let other = tempfile::tempdir().context("create second tempdir")?;
    let other_store = LocalStore::init(other.path(), false)?;
    let mut fresh = App::load(&other_store);
    fresh.import_state(&other_store, &snapshot)?;

    assert!(fresh.installed.contains("doom"));
    assert!(fresh.hidden_tabs.contains("beta"));
    assert_eq!(fresh.settings, app.settings);
    Ok(())
}
