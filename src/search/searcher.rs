//! Flashcard lookup pipeline: grounded Gemini first, Custom Search second.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::custom_search::WebSearch;
use super::model::{FlashcardPair, SearchItem};
use super::prompts;
use super::scrape::PageFetcher;
use crate::error::{LlmError, SearchError};
use crate::llm::{CompletionRequest, LlmProvider};

const TEMPERATURE: f32 = 0.0;
const MAX_OUTPUT_TOKENS: u32 = 300;

/// Anything that can answer a flashcard question.
#[async_trait]
pub trait FlashcardLookup: Send + Sync {
    /// `Ok(None)` means no answer was found.
    async fn lookup(&self, query: &str) -> Result<Option<FlashcardPair>, SearchError>;
}

/// The production lookup pipeline.
pub struct FlashcardSearcher {
    llm: Arc<dyn LlmProvider>,
    web: Option<Arc<dyn WebSearch>>,
    pages: Option<PageFetcher>,
}

impl FlashcardSearcher {
    /// Grounding only. Add a fallback with [`Self::with_web_search`].
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            web: None,
            pages: None,
        }
    }

    pub fn with_web_search(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = Some(web);
        self
    }

    /// Scrape result pages for extra context in the fallback.
    pub fn with_page_fetcher(mut self, pages: PageFetcher) -> Self {
        self.pages = Some(pages);
        self
    }

    fn request(prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_OUTPUT_TOKENS)
    }

    /// Ask Gemini to search Google itself. HTTP failures fall through.
    async fn search_with_grounding(&self, query: &str) -> Result<Option<FlashcardPair>, SearchError> {
        debug!("Trying Gemini grounding search");

        let request = Self::request(prompts::grounding_prompt(query)).with_grounding(true);
        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(LlmError::Status { status, .. }) => {
                warn!(status, "Gemini grounding API error");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        debug!(answer = ?response.text, "Gemini grounding extracted");
        Ok(prompts::accept_grounded_answer(response.text.as_deref())
            .map(|answer| FlashcardPair::new(query, answer)))
    }

    /// Search Quizlet through Custom Search and have Gemini pick the answer.
    async fn search_with_custom_search(
        &self,
        web: &dyn WebSearch,
        query: &str,
    ) -> Result<Option<FlashcardPair>, SearchError> {
        let mut items: Vec<SearchItem> = Vec::new();

        for search_query in prompts::search_strategies(query) {
            debug!(query = %search_query, "Custom Search query");
            match web.search(&search_query).await {
                Ok(found) => {
                    debug!(count = found.len(), "Custom Search results");
                    if !found.is_empty() {
                        items = found;
                        break;
                    }
                }
                Err(SearchError::CustomSearchStatus { status, body }) => {
                    warn!(status, body = %body, "Custom Search API error");
                }
                Err(e) => return Err(e),
            }
        }

        if items.is_empty() {
            info!("No results from any search strategy");
            return Ok(None);
        }

        let mut context = prompts::build_context(&items);
        if let Some(pages) = &self.pages {
            for page in pages.fetch_flashcards(&items).await {
                context.push_str("\n\nPage content:\n");
                context.push_str(&page);
            }
        }

        let request = Self::request(prompts::extraction_prompt(query, &context));
        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(LlmError::Status { status, .. }) => {
                return Err(SearchError::Extraction { status });
            }
            Err(e) => return Err(e.into()),
        };

        debug!(answer = ?response.text, "Gemini extracted answer");
        Ok(prompts::accept_extracted_answer(response.text.as_deref())
            .map(|answer| FlashcardPair::new(query, answer)))
    }
}

#[async_trait]
impl FlashcardLookup for FlashcardSearcher {
    async fn lookup(&self, query: &str) -> Result<Option<FlashcardPair>, SearchError> {
        if !self.llm.is_configured() {
            return Err(SearchError::MissingApiKey);
        }

        if let Some(card) = self.search_with_grounding(query).await? {
            return Ok(Some(card));
        }

        match &self.web {
            Some(web) => self.search_with_custom_search(web.as_ref(), query).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::llm::CompletionResponse;

    /// Replays scripted replies and records every request.
    struct ScriptedLlm {
        configured: bool,
        replies: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<CompletionResponse, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                configured: true,
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected completion call")
        }
    }

    struct ScriptedWeb {
        replies: Mutex<VecDeque<Result<Vec<SearchItem>, SearchError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedWeb {
        fn new(replies: Vec<Result<Vec<SearchItem>, SearchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebSearch for ScriptedWeb {
        async fn search(&self, query: &str) -> Result<Vec<SearchItem>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected search call")
        }
    }

    fn text(s: &str) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            text: Some(s.to_string()),
        })
    }

    fn status(code: u16) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::Status {
            provider: "gemini".into(),
            status: code,
            body: String::new(),
        })
    }

    fn item(title: &str) -> SearchItem {
        SearchItem {
            title: title.into(),
            link: format!("https://quizlet.com/{title}"),
            snippet: "snippet".into(),
            og_description: None,
        }
    }

    #[tokio::test]
    async fn grounded_answer_wins() {
        let llm = ScriptedLlm::new(vec![text("Mitochondria")]);
        let searcher = FlashcardSearcher::new(llm.clone());

        let card = searcher.lookup("Powerhouse of the cell").await.unwrap();
        assert_eq!(card, Some(FlashcardPair::new("Powerhouse of the cell", "Mitochondria")));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].grounding);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 300);
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let llm = Arc::new(ScriptedLlm {
            configured: false,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        });
        let err = FlashcardSearcher::new(llm).lookup("q").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini API key not configured");
    }

    #[tokio::test]
    async fn no_fallback_configured_returns_none() {
        let llm = ScriptedLlm::new(vec![text("NOT_FOUND")]);
        let searcher = FlashcardSearcher::new(llm);
        assert_eq!(searcher.lookup("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn grounding_status_error_falls_back_to_custom_search() {
        let llm = ScriptedLlm::new(vec![status(500), text("Osmosis")]);
        let web = ScriptedWeb::new(vec![Ok(vec![item("bio")])]);
        let searcher = FlashcardSearcher::new(llm.clone()).with_web_search(web.clone());

        let card = searcher.lookup("water diffusion").await.unwrap();
        assert_eq!(card, Some(FlashcardPair::new("water diffusion", "Osmosis")));

        let requests = llm.requests();
        assert!(!requests[1].grounding);
        assert!(requests[1].prompt.contains("[1] bio\nSnippet: snippet"));
        assert_eq!(
            *web.queries.lock().unwrap(),
            vec!["\"water diffusion\" site:quizlet.com".to_string()]
        );
    }

    #[tokio::test]
    async fn second_strategy_used_after_empty_or_failed_first() {
        let llm = ScriptedLlm::new(vec![text("I cannot find it"), text("Answer")]);
        let web = ScriptedWeb::new(vec![
            Err(SearchError::CustomSearchStatus {
                status: 429,
                body: "quota".into(),
            }),
            Ok(vec![item("chem")]),
        ]);
        let searcher = FlashcardSearcher::new(llm).with_web_search(web.clone());

        let card = searcher.lookup("mole").await.unwrap();
        assert_eq!(card, Some(FlashcardPair::new("mole", "Answer")));
        assert_eq!(web.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_items_from_any_strategy() {
        let llm = ScriptedLlm::new(vec![text("NOT_FOUND")]);
        let web = ScriptedWeb::new(vec![Ok(vec![]), Ok(vec![])]);
        let searcher = FlashcardSearcher::new(llm.clone()).with_web_search(web);

        assert_eq!(searcher.lookup("q").await.unwrap(), None);
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn extraction_status_error_propagates() {
        let llm = ScriptedLlm::new(vec![text("NOT_FOUND"), status(503)]);
        let web = ScriptedWeb::new(vec![Ok(vec![item("x")])]);
        let searcher = FlashcardSearcher::new(llm).with_web_search(web);

        let err = searcher.lookup("q").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini API error: 503");
    }

    #[tokio::test]
    async fn extraction_not_found_is_none() {
        let llm = ScriptedLlm::new(vec![text(""), text("Not found in content")]);
        let web = ScriptedWeb::new(vec![Ok(vec![item("x")])]);
        let searcher = FlashcardSearcher::new(llm).with_web_search(web);

        assert_eq!(searcher.lookup("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::RequestFailed {
            provider: "gemini".into(),
            reason: "connection refused".into(),
        })]);
        let searcher = FlashcardSearcher::new(llm);
        assert!(matches!(
            searcher.lookup("q").await,
            Err(SearchError::Llm(LlmError::RequestFailed { .. }))
        ));
    }
}
