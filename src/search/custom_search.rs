//! Google Custom Search JSON API client.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::model::SearchItem;
use crate::config::CustomSearchConfig;
use crate::error::SearchError;

/// Results requested per query (the API maximum).
const RESULTS_PER_QUERY: &str = "10";

/// A web search backend.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Run one query. A non-success HTTP status is reported as
    /// `SearchError::CustomSearchStatus` so callers can move on.
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError>;
}

/// Custom Search client bound to one engine.
pub struct CustomSearchClient {
    client: reqwest::Client,
    config: CustomSearchConfig,
}

impl CustomSearchClient {
    pub fn new(client: reqwest::Client, config: CustomSearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl WebSearch for CustomSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError> {
        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("key", self.config.api_key.expose_secret()),
                ("cx", self.config.engine_id.as_str()),
                ("q", query),
                ("num", RESULTS_PER_QUERY),
            ])
            .send()
            .await
            .map_err(|e| SearchError::CustomSearch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::CustomSearchStatus {
                status: status.as_u16(),
                body,
            });
        }

        let data: CustomSearchResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::CustomSearch(format!("Failed to parse response: {e}")))?;

        Ok(data.items.into_iter().map(SearchItem::from).collect())
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

#[derive(Debug, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl From<CustomSearchItem> for SearchItem {
    fn from(item: CustomSearchItem) -> Self {
        let og_description = item
            .pagemap
            .as_ref()
            .and_then(|p| p.metatags.first())
            .and_then(|tags| tags.get("og:description"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            snippet: item.snippet.unwrap_or_default(),
            og_description,
        }
    }
}
