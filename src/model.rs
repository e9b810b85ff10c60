use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Pseudo-tab matching every entry; never hidden, never removed.
pub const ALL_TAB: &str = "all";
/// Tab synthesized when a sync discovers entries not seen before.
pub const NEW_TAB: &str = "new";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub display_name: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Image size in GiB, rounded to two decimals. Registry-owned.
    #[serde(default)]
    pub size_gb: Option<f64>,

    /// Playtime estimate in hours. Catalog-owned; syncs never touch it.
    #[serde(default)]
    pub estimated_hours: Option<f64>,

    /// RFC3339 timestamp or plain `YYYY-MM-DD` date. Registry-owned.
    #[serde(default)]
    pub date_added: Option<String>,
}

impl CatalogEntry {
    /// Case-insensitive identity key. Two entries with the same key are the
    /// same entity.
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,
}

pub fn default_tabs() -> Vec<Tab> {
    vec![Tab {
        id: ALL_TAB.to_string(),
        name: "All".to_string(),
        icon: None,
    }]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Time,
    Category,
    Size,
    Date,
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "time" => Ok(Self::Time),
            "category" => Ok(Self::Category),
            "size" => Ok(Self::Size),
            "date" => Ok(Self::Date),
            other => Err(anyhow!(
                "unknown sort key {} (expected name|time|category|size|date)",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(anyhow!(
                "unknown sort direction {} (expected asc|desc)",
                other
            )),
        }
    }
}

/// Current view state. Derived, never persisted; only the sort defaults live
/// in `Settings`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    pub active_tab: String,
    pub search_query: String,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub installed_only: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            active_tab: ALL_TAB.to_string(),
            search_query: String::new(),
            sort_key: SortKey::Name,
            sort_direction: SortDirection::Asc,
            installed_only: false,
        }
    }
}

/// One tag as reported by the registry listing. Optional fields default to
/// absent instead of failing the whole page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTag {
    pub name: String,

    #[serde(default)]
    pub full_size: Option<u64>,

    #[serde(default)]
    pub last_updated: Option<String>,
}

/// One page of the registry tag listing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TagPage {
    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub results: Vec<RemoteTag>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub docker_user: String,
    pub repo_name: String,
    pub mount_path: String,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,

    /// Alternate base URLs for reaching the registry. Every page fetch races
    /// all of them and keeps the first success.
    pub registry_routes: Vec<String>,

    pub admin_config_url: Option<String>,
    pub sync_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docker_user: "michadockermisha".to_string(),
            repo_name: "backup".to_string(),
            mount_path: "/mnt/games".to_string(),
            sort_key: SortKey::Name,
            sort_direction: SortDirection::Asc,
            registry_routes: vec!["https://hub.docker.com/v2".to_string()],
            admin_config_url: None,
            sync_interval_secs: 30,
        }
    }
}

/// Saved id -> category assignments. Re-applied on top of every merge so a
/// manual move survives the next sync.
pub type CategoryOverrides = BTreeMap<String, String>;
