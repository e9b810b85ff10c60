use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::task::JoinSet;

use crate::model::{RemoteTag, TagPage};

pub const PAGE_SIZE: u64 = 100;
const ROUTE_TIMEOUT: Duration = Duration::from_secs(8);
const PAGE_BATCH: u64 = 5;

/// Outcome of a full tag listing. `Unavailable` means the first page could
/// not be fetched on any route; it is distinct from a registry that answered
/// with zero tags, so callers know whether skipping the merge is a failure
/// or the truth.
#[derive(Clone, Debug, PartialEq)]
pub enum TagFetch {
    Unavailable,
    Fetched(Vec<RemoteTag>),
}

/// Read-only client for the registry's paginated tag listing. Every page
/// fetch races all configured routes and keeps the first success; the
/// listing is retrieved in bounded concurrent batches. No method surfaces an
/// error: network and parse failures degrade to `Unavailable` or a partial
/// listing.
#[derive(Clone)]
pub struct RegistryClient {
    routes: Vec<String>,
    client: reqwest::Client,
}

impl RegistryClient {
    pub fn new(routes: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tagdeck")
            .build()
            .context("build reqwest client")?;
        Ok(Self { routes, client })
    }

    pub async fn fetch_all_tags(&self, owner: &str, repo: &str) -> TagFetch {
        let Some(first) = self.fetch_page(owner, repo, 1).await else {
            tracing::warn!("registry unreachable on every route; no tag data this cycle");
            return TagFetch::Unavailable;
        };

        let total_pages = first.count.div_ceil(PAGE_SIZE).max(1);
        let mut tags = first.results;

        let mut next_page = 2u64;
        while next_page <= total_pages {
            let batch_end = (next_page + PAGE_BATCH - 1).min(total_pages);

            let mut set = JoinSet::new();
            for page in next_page..=batch_end {
                let this = self.clone();
                let owner = owner.to_string();
                let repo = repo.to_string();
                set.spawn(async move { (page, this.fetch_page(&owner, &repo, page).await) });
            }

            let mut fetched: Vec<(u64, TagPage)> = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((page, Some(result))) => fetched.push((page, result)),
                    Ok((page, None)) => {
                        tracing::warn!("page {page} unavailable; returning a partial listing");
                    }
                    Err(_) => {}
                }
            }

            fetched.sort_by_key(|(page, _)| *page);
            for (_, page) in fetched {
                tags.extend(page.results);
            }

            next_page = batch_end + 1;
        }

        TagFetch::Fetched(tags)
    }

    /// Races all routes for one page; the first successful response wins and
    /// the remaining attempts are aborted.
    async fn fetch_page(&self, owner: &str, repo: &str, page: u64) -> Option<TagPage> {
        let mut set = JoinSet::new();
        for route in &self.routes {
            let url = format!(
                "{}/repositories/{}/{}/tags?page={}&page_size={}",
                route.trim_end_matches('/'),
                owner,
                repo,
                page,
                PAGE_SIZE
            );
            let client = self.client.clone();
            set.spawn(async move { fetch_page_via(client, url).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(result)) => {
                    set.abort_all();
                    return Some(result);
                }
                Ok(Err(err)) => {
                    tracing::debug!("route attempt failed: {err:#}");
                }
                Err(_) => {}
            }
        }
        None
    }
}

async fn fetch_page_via(client: reqwest::Client, url: String) -> Result<TagPage> {
    let resp = tokio::time::timeout(ROUTE_TIMEOUT, client.get(&url).send())
        .await
        .map_err(|_| anyhow!("route timed out"))?
        .with_context(|| format!("send {}", url))?
        .error_for_status()
        .with_context(|| format!("{} status", url))?;

    let page = tokio::time::timeout(ROUTE_TIMEOUT, resp.json::<TagPage>())
        .await
        .map_err(|_| anyhow!("route timed out reading body"))?
        .with_context(|| format!("parse {}", url))?;

    Ok(page)
}
