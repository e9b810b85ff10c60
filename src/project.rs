use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{ALL_TAB, CatalogEntry, FilterState, SortDirection, SortKey};

/// Sentinel for missing time/size values; sorts last ascending.
const MISSING_NUMERIC: f64 = 999.0;
/// Sentinel for missing categories; sorts last ascending.
const MISSING_CATEGORY: &str = "zzz";

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub entries: Vec<CatalogEntry>,
    pub total: usize,
    pub visible: usize,
}

/// Derives the ordered, filtered view of the catalog. Pure: identical inputs
/// always yield the identical ordering (ties keep pre-sort order, the sort is
/// stable).
pub fn project(
    catalog: &[CatalogEntry],
    filter: &FilterState,
    hidden_tabs: &BTreeSet<String>,
    is_admin: bool,
    installed: &BTreeSet<String>,
) -> Projection {
    let total = catalog.len();
    let query = filter.search_query.to_lowercase();

    let mut entries: Vec<CatalogEntry> = catalog
        .iter()
        .filter(|entry| {
            if filter.active_tab != ALL_TAB
                && entry.category.as_deref() != Some(filter.active_tab.as_str())
            {
                return false;
            }
            // Hidden categories disappear for non-admins on every tab,
            // including `all`.
            if !is_admin
                && entry
                    .category
                    .as_ref()
                    .is_some_and(|c| hidden_tabs.contains(c))
            {
                return false;
            }
            if !query.is_empty() && !matches_query(entry, &query) {
                return false;
            }
            if filter.installed_only && !installed.contains(&entry.key()) {
                return false;
            }
            true
        })
        .cloned()
        .collect();

    entries.sort_by(|a, b| {
        let ord = compare(a, b, filter.sort_key);
        match filter.sort_direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let visible = entries.len();
    Projection {
        entries,
        total,
        visible,
    }
}

fn matches_query(entry: &CatalogEntry, query: &str) -> bool {
    entry.display_name.to_lowercase().contains(query)
        || entry.id.to_lowercase().contains(query)
        || entry
            .category
            .as_ref()
            .is_some_and(|c| c.to_lowercase().contains(query))
}

fn compare(a: &CatalogEntry, b: &CatalogEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
        SortKey::Time => a
            .estimated_hours
            .unwrap_or(MISSING_NUMERIC)
            .total_cmp(&b.estimated_hours.unwrap_or(MISSING_NUMERIC)),
        SortKey::Size => a
            .size_gb
            .unwrap_or(MISSING_NUMERIC)
            .total_cmp(&b.size_gb.unwrap_or(MISSING_NUMERIC)),
        SortKey::Category => a
            .category
            .as_deref()
            .unwrap_or(MISSING_CATEGORY)
            .cmp(b.category.as_deref().unwrap_or(MISSING_CATEGORY)),
        SortKey::Date => {
            date_sort_value(a.date_added.as_deref()).cmp(&date_sort_value(b.date_added.as_deref()))
        }
    }
}

/// Missing or unparsable dates collapse to the epoch and sort first
/// ascending. Accepts RFC3339 or a plain leading `YYYY-MM-DD`.
fn date_sort_value(date: Option<&str>) -> i64 {
    let Some(date) = date else {
        return 0;
    };

    if let Ok(parsed) =
        time::OffsetDateTime::parse(date, &time::format_description::well_known::Rfc3339)
    {
        return parsed.unix_timestamp();
    }

    let format = time::macros::format_description!("[year]-[month]-[day]");
    let head = date.get(..10).unwrap_or(date);
    match time::Date::parse(head, &format) {
        Ok(day) => day.midnight().assume_utc().unix_timestamp(),
        Err(_) => 0,
    }
}
