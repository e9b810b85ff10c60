use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{CatalogEntry, CategoryOverrides, Settings, Tab, default_tabs};

const STORE_DIR: &str = ".tagdeck";

const SETTINGS_DOC: &str = "settings.json";
const CATALOG_DOC: &str = "catalog.json";
const TABS_DOC: &str = "tabs.json";
const INSTALLED_DOC: &str = "installed.json";
const HIDDEN_TABS_DOC: &str = "hidden_tabs.json";
const OVERRIDES_DOC: &str = "category_overrides.json";
const LAST_SEEN_DOC: &str = "last_seen_count.json";

/// Key -> JSON-document store backing all durable user state. Writes are
/// atomic per document; a document that fails to read or parse degrades to
/// that key's default without touching the others.
#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn data_dir(root: &Path) -> PathBuf {
        root.join(STORE_DIR)
    }

    pub fn open(workspace_root: &Path) -> Result<Self> {
        let root = Self::data_dir(workspace_root);
        if !root.is_dir() {
            return Err(anyhow!(
                "No {} directory found at {} (run `tagdeck init`)",
                STORE_DIR,
                root.display()
            ));
        }
        Ok(Self { root })
    }

    pub fn init(workspace_root: &Path, force: bool) -> Result<Self> {
        let root = Self::data_dir(workspace_root);
        if root.exists() && !force {
            return Err(anyhow!(
                "{} already exists at {} (use --force to re-init)",
                STORE_DIR,
                root.display()
            ));
        }

        fs::create_dir_all(&root).context("create data dir")?;
        let store = Self { root };
        store.write_settings(&Settings::default())?;
        store.write_tabs(&default_tabs())?;
        Ok(store)
    }

    pub fn read_settings(&self) -> Settings {
        self.read_doc_or(SETTINGS_DOC, Settings::default)
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<()> {
        self.write_doc(SETTINGS_DOC, settings)
    }

    pub fn read_catalog(&self) -> Vec<CatalogEntry> {
        self.read_doc_or(CATALOG_DOC, Vec::new)
    }

    pub fn write_catalog(&self, catalog: &[CatalogEntry]) -> Result<()> {
        self.write_doc(CATALOG_DOC, &catalog)
    }

    pub fn read_tabs(&self) -> Vec<Tab> {
        self.read_doc_or(TABS_DOC, default_tabs)
    }

    pub fn write_tabs(&self, tabs: &[Tab]) -> Result<()> {
        self.write_doc(TABS_DOC, &tabs)
    }

    pub fn read_installed(&self) -> BTreeSet<String> {
        self.read_doc_or(INSTALLED_DOC, BTreeSet::new)
    }

    pub fn write_installed(&self, installed: &BTreeSet<String>) -> Result<()> {
        self.write_doc(INSTALLED_DOC, installed)
    }

    pub fn read_hidden_tabs(&self) -> BTreeSet<String> {
        self.read_doc_or(HIDDEN_TABS_DOC, BTreeSet::new)
    }

    pub fn write_hidden_tabs(&self, hidden: &BTreeSet<String>) -> Result<()> {
        self.write_doc(HIDDEN_TABS_DOC, hidden)
    }

    pub fn read_category_overrides(&self) -> CategoryOverrides {
        self.read_doc_or(OVERRIDES_DOC, CategoryOverrides::new)
    }

    pub fn write_category_overrides(&self, overrides: &CategoryOverrides) -> Result<()> {
        self.write_doc(OVERRIDES_DOC, overrides)
    }

    pub fn read_last_seen_count(&self) -> u64 {
        self.read_doc_or(LAST_SEEN_DOC, || 0)
    }

    pub fn write_last_seen_count(&self, count: u64) -> Result<()> {
        self.write_doc(LAST_SEEN_DOC, &count)
    }

    pub fn has_doc(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    fn read_doc_or<T: DeserializeOwned>(&self, name: &str, fallback: impl FnOnce() -> T) -> T {
        let path = self.root.join(name);
        if !path.exists() {
            return fallback();
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("failed to read {}: {err}; using default", path.display());
                return fallback();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("failed to parse {}: {err}; using default", path.display());
                fallback()
            }
        }
    }

    fn write_doc<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .with_context(|| format!("serialize {}", name))?;
        write_atomic(&self.root.join(name), &bytes).with_context(|| format!("write {}", name))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create parent directories")?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
