use std::collections::HashMap;

use crate::model::{CatalogEntry, CategoryOverrides, NEW_TAB, RemoteTag, Tab};

/// Result of merging one remote tag snapshot into the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileOutcome {
    pub catalog: Vec<CatalogEntry>,
    /// Ids of entries synthesized this pass, in remote listing order.
    pub newly_added: Vec<String>,
    /// Number of existing entries whose size or date actually changed.
    pub changed_metadata: usize,
}

/// Merges the remote tag listing into the current catalog and re-applies
/// saved category overrides on top.
///
/// Identity is the lowercased id. Unknown tags become new entries in the
/// `new` category; known tags get their size/date refreshed in place while
/// `category` stays user-owned. Running the same snapshot twice produces no
/// further changes.
pub fn reconcile(
    catalog: &[CatalogEntry],
    remote_tags: &[RemoteTag],
    overrides: &CategoryOverrides,
) -> ReconcileOutcome {
    let mut merged: Vec<CatalogEntry> = Vec::with_capacity(catalog.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(catalog.len());

    for entry in catalog {
        let key = entry.key();
        if index.contains_key(&key) {
            continue;
        }
        index.insert(key, merged.len());
        merged.push(entry.clone());
    }

    let mut newly_added = Vec::new();
    let mut changed_metadata = 0;

    for tag in remote_tags {
        if tag.name.is_empty() {
            continue;
        }
        let key = tag.name.to_lowercase();

        if let Some(&i) = index.get(&key) {
            if refresh_metadata(&mut merged[i], tag) {
                changed_metadata += 1;
            }
            continue;
        }

        let entry = CatalogEntry {
            id: tag.name.clone(),
            display_name: format_display_name(&tag.name),
            category: Some(NEW_TAB.to_string()),
            size_gb: tag.full_size.map(bytes_to_gb),
            estimated_hours: None,
            date_added: Some(tag.last_updated.clone().unwrap_or_else(today)),
        };
        index.insert(key, merged.len());
        merged.push(entry);
        newly_added.push(tag.name.clone());
    }

    // A manual move always wins, including over the synthetic `new` category.
    for (id, category) in overrides {
        if let Some(&i) = index.get(&id.to_lowercase()) {
            merged[i].category = Some(category.clone());
        }
    }

    ReconcileOutcome {
        catalog: merged,
        newly_added,
        changed_metadata,
    }
}

/// Refreshes registry-owned fields in place. Absent remote values leave the
/// current value alone so a pass with the same snapshot stays idempotent.
fn refresh_metadata(entry: &mut CatalogEntry, tag: &RemoteTag) -> bool {
    let mut changed = false;

    if let Some(bytes) = tag.full_size {
        let size = bytes_to_gb(bytes);
        if entry.size_gb != Some(size) {
            entry.size_gb = Some(size);
            changed = true;
        }
    }

    if let Some(date) = &tag.last_updated
        && entry.date_added.as_deref() != Some(date.as_str())
    {
        entry.date_added = Some(date.clone());
        changed = true;
    }

    changed
}

/// Adds the `new` tab when this pass introduced entries and no such tab
/// exists yet.
pub fn ensure_new_tab(tabs: &mut Vec<Tab>, newly_added: &[String]) {
    if newly_added.is_empty() {
        return;
    }
    if tabs.iter().any(|t| t.id == NEW_TAB) {
        return;
    }
    tabs.push(Tab {
        id: NEW_TAB.to_string(),
        name: "New".to_string(),
        icon: None,
    });
}

/// Adds a tab for every category present in the catalog but absent from the
/// tab list, so a moved entry never lands in an unreachable category.
pub fn ensure_category_tabs(tabs: &mut Vec<Tab>, catalog: &[CatalogEntry]) {
    for entry in catalog {
        let Some(category) = entry.category.as_deref() else {
            continue;
        };
        if tabs.iter().any(|t| t.id == category) {
            continue;
        }
        tabs.push(Tab {
            id: category.to_string(),
            name: format_display_name(category),
            icon: None,
        });
    }
}

/// Turns a raw tag id into a display name: separators become spaces, a space
/// is inserted before digit runs and at lower->upper boundaries, words are
/// title-cased, and repeated whitespace collapses.
pub fn format_display_name(id: &str) -> String {
    let mut spaced = String::with_capacity(id.len() + 8);
    let mut prev: Option<char> = None;

    for c in id.chars() {
        if c == '-' || c == '_' || c == '.' {
            spaced.push(' ');
            prev = Some(' ');
            continue;
        }
        if let Some(p) = prev {
            let camel = p.is_ascii_lowercase() && c.is_ascii_uppercase();
            let digit_run = c.is_ascii_digit() && !p.is_ascii_digit() && p != ' ';
            if camel || digit_run {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    spaced
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    (gb * 100.0).round() / 100.0
}

fn today() -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    time::OffsetDateTime::now_utc()
        .date()
        .format(&format)
        .unwrap_or_else(|_| "1970-01-01".to_string())
}
