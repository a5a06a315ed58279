//! Presentation channels for the search service.

pub mod cli;

pub use cli::{CliChannel, CliExit};
