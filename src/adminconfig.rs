use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The single shared configuration record served by the admin-config
/// service: which tabs are hidden by default and baseline category
/// assignments. One record for everyone, no per-user scoping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminConfig {
    pub hidden_tabs: Vec<String>,
    pub game_categories: BTreeMap<String, String>,
    pub last_updated: String,
}

/// Reads the shared record. Degrades to `None` on any failure; the defaults
/// are a convenience, never a requirement for syncing.
pub async fn fetch_admin_config(url: &str) -> Option<AdminConfig> {
    let client = reqwest::Client::builder()
        .user_agent("tagdeck")
        .timeout(Duration::from_secs(8))
        .build()
        .ok()?;

    let endpoint = format!("{}/admin-config", url.trim_end_matches('/'));
    match client.get(&endpoint).send().await {
        Ok(resp) => match resp.error_for_status() {
            Ok(resp) => match resp.json::<AdminConfig>().await {
                Ok(config) => Some(config),
                Err(err) => {
                    tracing::warn!("malformed admin config from {endpoint}: {err}");
                    None
                }
            },
            Err(err) => {
                tracing::warn!("admin config fetch rejected: {err}");
                None
            }
        },
        Err(err) => {
            tracing::warn!("admin config unreachable: {err}");
            None
        }
    }
}

pub fn now_ts() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "<time>".to_string())
}
