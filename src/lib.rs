//! QuizBase — flashcard answers from Quizlet via Gemini.

pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod search;
