//! Flashcard search: lookup pipeline, reactive service, and HTTP surface.

pub mod custom_search;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod scrape;
pub mod searcher;
pub mod service;

pub use custom_search::{CustomSearchClient, WebSearch};
pub use model::{FlashcardPair, SearchItem, SearchState};
pub use searcher::{FlashcardLookup, FlashcardSearcher};
pub use service::{SEARCH_FAILED_MESSAGE, SearchService};

use std::sync::Arc;

use crate::config::Config;
use crate::llm::LlmProvider;

/// Assemble the lookup pipeline from configuration.
pub fn create_searcher(
    config: &Config,
    llm: Arc<dyn LlmProvider>,
    client: reqwest::Client,
) -> FlashcardSearcher {
    let mut searcher = FlashcardSearcher::new(llm);

    match &config.custom_search {
        Some(search) => {
            searcher = searcher.with_web_search(Arc::new(CustomSearchClient::new(
                client.clone(),
                search.clone(),
            )));
            if config.fetch_pages {
                searcher = searcher.with_page_fetcher(
                    scrape::PageFetcher::new(client).with_timeout(config.page_timeout),
                );
            }
        }
        None => {
            tracing::warn!("Google Custom Search not configured - using Gemini grounding only");
        }
    }

    searcher
}
