//! Best-effort flashcard scraping from Quizlet study-set pages.
//!
//! Quizlet embeds card data in a few different shapes depending on page
//! vintage. Each extractor renders cards as `Q: ...\nA: ...` blocks.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::model::SearchItem;
use crate::config::DEFAULT_PAGE_TIMEOUT_MS;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; QuizBase/1.0)";

static NEXT_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).expect("valid regex")
});
static SET_PAGE_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Quizlet\.setPageData\((.*?)\);").expect("valid regex"));
static TERM_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="[^"]*TermText[^"]*"[^>]*>(.*?)</span>"#).expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Extract flashcards from a page, trying embedded JSON before visible text.
pub fn extract_flashcards_from_html(html: &str) -> Option<String> {
    if let Some(raw) = NEXT_DATA.captures(html).and_then(|c| c.get(1)) {
        match serde_json::from_str::<Value>(raw.as_str()) {
            Ok(data) => {
                if let Some(cards) = cards_from_next_data(&data) {
                    return Some(cards);
                }
            }
            Err(e) => debug!(error = %e, "Malformed __NEXT_DATA__ payload"),
        }
    }

    if let Some(raw) = SET_PAGE_DATA.captures(html).and_then(|c| c.get(1)) {
        match serde_json::from_str::<Value>(raw.as_str()) {
            Ok(data) => {
                if let Some(cards) = cards_from_page_data(&data) {
                    return Some(cards);
                }
            }
            Err(e) => debug!(error = %e, "Malformed setPageData payload"),
        }
    }

    cards_from_term_spans(html)
}

fn cards_from_next_data(data: &Value) -> Option<String> {
    let queries = data
        .pointer("/props/pageProps/dehydratedState/queries")?
        .as_array()?;
    let items = queries
        .iter()
        .find_map(|q| q.pointer("/state/data/studiableItems").and_then(Value::as_array))?;
    if items.is_empty() {
        return None;
    }

    let side_text = |item: &Value, side: usize| {
        item.pointer(&format!("/cardSides/{side}/media/0/plainText"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(
        items
            .iter()
            .map(|item| format!("Q: {}\nA: {}", side_text(item, 0), side_text(item, 1)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

fn cards_from_page_data(data: &Value) -> Option<String> {
    let terms = data
        .get("termIdToTermsMap")
        .filter(|v| !v.is_null())
        .or_else(|| data.get("terms"))?;

    let values: Vec<&Value> = match terms {
        Value::Object(map) => map.values().collect(),
        Value::Array(list) => list.iter().collect(),
        _ => return None,
    };
    if values.is_empty() {
        return None;
    }

    let field = |term: &Value, key: &str| term.get(key).and_then(Value::as_str).map(str::to_string);

    Some(
        values
            .into_iter()
            .map(|term| {
                let word = field(term, "word")
                    .filter(|s| !s.is_empty())
                    .or_else(|| field(term, "term"))
                    .unwrap_or_default();
                let definition = field(term, "definition").unwrap_or_default();
                format!("Q: {word}\nA: {definition}")
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

fn cards_from_term_spans(html: &str) -> Option<String> {
    let terms: Vec<String> = TERM_TEXT
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| TAG.replace_all(m.as_str(), "").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.len() < 2 {
        return None;
    }

    Some(
        terms
            .chunks_exact(2)
            .map(|pair| format!("Q: {}\nA: {}\n\n", pair[0], pair[1]))
            .collect(),
    )
}

/// Fetches Quizlet pages linked from search hits.
pub struct PageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(DEFAULT_PAGE_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch every Quizlet link and return the flashcards found. Failures are
    /// logged and skipped.
    pub async fn fetch_flashcards(&self, items: &[SearchItem]) -> Vec<String> {
        let mut contents = Vec::new();

        for item in items {
            if item.link.is_empty() || !item.link.contains("quizlet.com") {
                continue;
            }
            debug!(url = %item.link, "Fetching Quizlet page");

            match self.fetch_page(&item.link).await {
                Ok(Some(html)) => {
                    if let Some(cards) = extract_flashcards_from_html(&html) {
                        debug!(url = %item.link, "Extracted flashcard content");
                        contents.push(cards);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(url = %item.link, error = %e, "Failed to fetch Quizlet page"),
            }
        }

        contents
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<String>, reqwest::Error> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!(url, status = %resp.status(), "Skipping page");
            return Ok(None);
        }
        resp.text().await.map(Some)
    }
}
