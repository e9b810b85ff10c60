use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::adminconfig;
use crate::model::{ALL_TAB, CatalogEntry, CategoryOverrides, FilterState, Settings, Tab};
use crate::project::{self, Projection};
use crate::reconcile;
use crate::registry::{RegistryClient, TagFetch};
use crate::session::Session;
use crate::store::LocalStore;

/// Whole application state. The catalog is owned here; views read it through
/// `project` and every mutation goes through an operation that persists what
/// it changed.
pub struct App {
    pub catalog: Vec<CatalogEntry>,
    pub tabs: Vec<Tab>,
    pub filter: FilterState,
    /// Lowercased entry ids marked for a bulk action. Never persisted.
    pub selection: BTreeSet<String>,
    pub session: Session,
    pub installed: BTreeSet<String>,
    pub hidden_tabs: BTreeSet<String>,
    pub overrides: CategoryOverrides,
    pub settings: Settings,

    sync_in_progress: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncReport {
    /// False when the registry was unavailable and the merge was skipped.
    pub synced: bool,
    /// True when another sync was still in flight and this one never ran.
    pub skipped: bool,
    pub newly_added: Vec<String>,
    pub changed_metadata: usize,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            synced: false,
            skipped: true,
            newly_added: Vec::new(),
            changed_metadata: 0,
        }
    }

    fn unavailable() -> Self {
        Self {
            synced: false,
            skipped: false,
            newly_added: Vec::new(),
            changed_metadata: 0,
        }
    }
}

/// One exportable/importable snapshot of user state. Fields are independent:
/// an absent field leaves the corresponding state untouched on import.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatePayload {
    pub settings: Option<Settings>,
    pub installed: Option<BTreeSet<String>>,
    pub hidden_tabs: Option<BTreeSet<String>>,
    pub category_overrides: Option<CategoryOverrides>,
}

impl App {
    pub fn load(store: &LocalStore) -> Self {
        let settings = store.read_settings();
        let filter = FilterState {
            sort_key: settings.sort_key,
            sort_direction: settings.sort_direction,
            ..FilterState::default()
        };

        Self {
            catalog: store.read_catalog(),
            tabs: store.read_tabs(),
            filter,
            selection: BTreeSet::new(),
            session: Session::default(),
            installed: store.read_installed(),
            hidden_tabs: store.read_hidden_tabs(),
            overrides: store.read_category_overrides(),
            settings,
            sync_in_progress: false,
        }
    }

    pub fn project(&self) -> Projection {
        project::project(
            &self.catalog,
            &self.filter,
            &self.hidden_tabs,
            self.session.is_admin(),
            &self.installed,
        )
    }

    /// The tab list as a non-admin sees it: hidden tabs removed, `all`
    /// always present. Admins see everything.
    pub fn visible_tabs(&self) -> Vec<Tab> {
        self.tabs
            .iter()
            .filter(|t| {
                t.id == ALL_TAB || self.session.is_admin() || !self.hidden_tabs.contains(&t.id)
            })
            .cloned()
            .collect()
    }

    pub fn toggle_selection(&mut self, id: &str, included: bool) {
        let key = id.to_lowercase();
        if included {
            self.selection.insert(key);
        } else {
            self.selection.remove(&key);
        }
    }

    pub fn select_all_visible(&mut self, projection: &Projection) {
        for entry in &projection.entries {
            self.selection.insert(entry.key());
        }
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Moves every selected entry to `tab_id` and reports how many actually
    /// changed. A no-op (everything already there) persists nothing.
    pub fn move_selected_to_category(&mut self, store: &LocalStore, tab_id: &str) -> Result<usize> {
        let mut changed = 0;
        for key in &self.selection {
            let Some(entry) = self.catalog.iter_mut().find(|e| e.key() == *key) else {
                continue;
            };
            if entry.category.as_deref() != Some(tab_id) {
                entry.category = Some(tab_id.to_string());
                changed += 1;
            }
        }

        if changed > 0 {
            self.overrides = category_map(&self.catalog);
            store.write_category_overrides(&self.overrides)?;
            reconcile::ensure_category_tabs(&mut self.tabs, &self.catalog);
            store.write_tabs(&self.tabs)?;
            store.write_catalog(&self.catalog)?;
        }

        Ok(changed)
    }

    pub fn set_installed(&mut self, store: &LocalStore, id: &str, installed: bool) -> Result<bool> {
        let key = id.to_lowercase();
        let changed = if installed {
            self.installed.insert(key)
        } else {
            self.installed.remove(&key)
        };
        if changed {
            store.write_installed(&self.installed)?;
        }
        Ok(changed)
    }

    pub fn hide_tab(&mut self, store: &LocalStore, tab_id: &str) -> Result<()> {
        if !self.session.is_admin() {
            bail!("admin session required to change tab visibility");
        }
        if tab_id == ALL_TAB {
            bail!("the {} tab cannot be hidden", ALL_TAB);
        }
        if self.hidden_tabs.insert(tab_id.to_string()) {
            store.write_hidden_tabs(&self.hidden_tabs)?;
        }
        Ok(())
    }

    pub fn unhide_tab(&mut self, store: &LocalStore, tab_id: &str) -> Result<()> {
        if !self.session.is_admin() {
            bail!("admin session required to change tab visibility");
        }
        if self.hidden_tabs.remove(tab_id) {
            store.write_hidden_tabs(&self.hidden_tabs)?;
        }
        Ok(())
    }

    pub fn authenticate(&mut self, password: &str) -> bool {
        self.session.authenticate(password)
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Full sync cycle: shared defaults, tag fetch, merge, persist. Guarded
    /// so overlapping cycles (manual plus periodic) are skipped rather than
    /// interleaved.
    pub async fn sync(&mut self, store: &LocalStore, registry: &RegistryClient) -> Result<SyncReport> {
        if self.sync_in_progress {
            tracing::info!("sync already in progress; skipping this cycle");
            return Ok(SyncReport::skipped());
        }
        self.sync_in_progress = true;
        let result = self.sync_inner(store, registry).await;
        self.sync_in_progress = false;
        result
    }

    async fn sync_inner(
        &mut self,
        store: &LocalStore,
        registry: &RegistryClient,
    ) -> Result<SyncReport> {
        let admin_config = match &self.settings.admin_config_url {
            Some(url) => adminconfig::fetch_admin_config(url).await,
            None => None,
        };

        if let Some(config) = &admin_config {
            let mut grew = false;
            for tab in &config.hidden_tabs {
                if tab != ALL_TAB && self.hidden_tabs.insert(tab.clone()) {
                    grew = true;
                }
            }
            if grew {
                store.write_hidden_tabs(&self.hidden_tabs)?;
            }
        }

        let fetch = registry
            .fetch_all_tags(&self.settings.docker_user, &self.settings.repo_name)
            .await;
        let tags = match fetch {
            TagFetch::Unavailable => {
                tracing::info!("catalog not refreshed this cycle");
                return Ok(SyncReport::unavailable());
            }
            TagFetch::Fetched(tags) => tags,
        };

        let outcome = reconcile::reconcile(&self.catalog, &tags, &self.overrides);
        self.catalog = outcome.catalog;

        // Shared baseline categories fill in where the user has not moved
        // the entry; a local override always wins.
        if let Some(config) = &admin_config {
            let overridden: BTreeSet<String> =
                self.overrides.keys().map(|k| k.to_lowercase()).collect();
            let baseline: BTreeMap<String, &String> = config
                .game_categories
                .iter()
                .map(|(id, category)| (id.to_lowercase(), category))
                .collect();
            for entry in &mut self.catalog {
                let key = entry.key();
                if overridden.contains(&key) {
                    continue;
                }
                if let Some(category) = baseline.get(&key) {
                    entry.category = Some((*category).clone());
                }
            }
        }

        reconcile::ensure_new_tab(&mut self.tabs, &outcome.newly_added);
        reconcile::ensure_category_tabs(&mut self.tabs, &self.catalog);

        store.write_catalog(&self.catalog)?;
        store.write_tabs(&self.tabs)?;
        store.write_last_seen_count(self.catalog.len() as u64)?;

        Ok(SyncReport {
            synced: true,
            skipped: false,
            newly_added: outcome.newly_added,
            changed_metadata: outcome.changed_metadata,
        })
    }

    pub fn export_state(&self) -> StatePayload {
        StatePayload {
            settings: Some(self.settings.clone()),
            installed: Some(self.installed.clone()),
            hidden_tabs: Some(self.hidden_tabs.clone()),
            category_overrides: Some(self.overrides.clone()),
        }
    }

    /// Applies an exported snapshot. The whole import is rejected when the
    /// document does not parse; once parsed, present fields apply
    /// independently of each other.
    pub fn import_state(&mut self, store: &LocalStore, json: &str) -> Result<()> {
        let payload: StatePayload = serde_json::from_str(json).context("parse state import")?;

        if let Some(settings) = payload.settings {
            self.filter.sort_key = settings.sort_key;
            self.filter.sort_direction = settings.sort_direction;
            self.settings = settings;
            store.write_settings(&self.settings)?;
        }
        if let Some(installed) = payload.installed {
            self.installed = installed.iter().map(|id| id.to_lowercase()).collect();
            store.write_installed(&self.installed)?;
        }
        if let Some(hidden) = payload.hidden_tabs {
            self.hidden_tabs = hidden;
            self.hidden_tabs.remove(ALL_TAB);
            store.write_hidden_tabs(&self.hidden_tabs)?;
        }
        if let Some(overrides) = payload.category_overrides {
            self.overrides = overrides;
            for (id, category) in &self.overrides {
                let key = id.to_lowercase();
                if let Some(entry) = self.catalog.iter_mut().find(|e| e.key() == key) {
                    entry.category = Some(category.clone());
                }
            }
            store.write_category_overrides(&self.overrides)?;
            store.write_catalog(&self.catalog)?;
        }

        Ok(())
    }
}

fn category_map(catalog: &[CatalogEntry]) -> CategoryOverrides {
    catalog
        .iter()
        .filter_map(|entry| {
            entry
                .category
                .as_ref()
                .map(|category| (entry.id.clone(), category.clone()))
        })
        .collect()
}
