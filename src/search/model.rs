//! Flashcard data model and reactive search state.

use serde::{Deserialize, Serialize};

/// A term/definition (question/answer) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardPair {
    /// The user's question, verbatim.
    pub term: String,
    /// The extracted answer, trimmed.
    pub definition: String,
}

impl FlashcardPair {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }
}

impl std::fmt::Display for FlashcardPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q: {}\nA: {}", self.term, self.definition)
    }
}

/// The state a presentation surface renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchState {
    pub result: Option<FlashcardPair>,
    pub loading: bool,
    pub error: Option<String>,
}

/// A single Custom Search hit, reduced to the fields the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub og_description: Option<String>,
}
