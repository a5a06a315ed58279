//! Prompt templates and answer acceptance rules.

use super::model::SearchItem;

/// Literal reply the prompts ask for when no answer exists.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Prompt for the grounded call: the model searches Google itself.
pub fn grounding_prompt(query: &str) -> String {
    format!(
        "Search Google for this Quizlet flashcard question and find the answer:\n\n\
         \"{query}\" site:quizlet.com\n\n\
         Look for the Quizlet flashcard answer in the search results. Google often shows \
         \"Questions & answers\" sections from Quizlet with the exact Q&A pairs.\n\n\
         Return ONLY the exact answer/definition from the Quizlet flashcard.\n\
         - No explanations\n\
         - No \"The answer is...\"\n\
         - Just the answer text itself\n\
         - If it's a short answer (single word, abbreviation, phrase), return just that\n\n\
         If you cannot find a clear Quizlet flashcard answer, respond with exactly: {NOT_FOUND}"
    )
}

/// Prompt for extracting an answer from Custom Search context.
pub fn extraction_prompt(query: &str, context: &str) -> String {
    format!(
        "You are extracting flashcard answers from Quizlet content.\n\n\
         USER'S QUESTION: \"{query}\"\n\n\
         QUIZLET FLASHCARD CONTENT:\n\
         {context}\n\n\
         TASK: Find the EXACT answer to this question from the Quizlet flashcards above.\n\n\
         RULES:\n\
         1. Find the flashcard where this question appears as the term/question\n\
         2. Return ONLY the definition/answer from that flashcard - no explanations\n\
         3. If it's a multiple choice question, return only the correct answer\n\
         4. If the answer is short (single word, abbreviation, phrase), return just that\n\
         5. If you cannot find this exact question in the content, respond with: {NOT_FOUND}\n\n\
         ANSWER:"
    )
}

/// Queries tried against Custom Search, most specific first.
pub fn search_strategies(query: &str) -> [String; 2] {
    [
        format!("\"{query}\" site:quizlet.com"),
        format!("{query} site:quizlet.com"),
    ]
}

/// Render search hits as numbered context blocks joined by blank lines.
pub fn build_context(items: &[SearchItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut block = format!("[{}] {}\nSnippet: {}", i + 1, item.title, item.snippet);
            if let Some(more) = &item.og_description {
                block.push_str("\nMore content: ");
                block.push_str(more);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Accept a grounded answer unless it signals "no answer".
pub fn accept_grounded_answer(text: Option<&str>) -> Option<&str> {
    let text = accept_extracted_answer(text)?;
    if text.to_lowercase().contains("cannot find") {
        return None;
    }
    Some(text)
}

/// Accept an extracted answer unless it signals "no answer".
pub fn accept_extracted_answer(text: Option<&str>) -> Option<&str> {
    let text = text?.trim();
    if text.is_empty() || text == NOT_FOUND || text.to_lowercase().contains("not found") {
        return None;
    }
    Some(text)
}
