//! CLI channel — stdin/stdout REPL over a [`SearchService`].

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tracing::error;

use crate::error::ChannelError;
use crate::search::{SearchService, SearchState};

/// Why the REPL stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliExit {
    /// The user typed `/quit`.
    Quit,
    /// stdin closed (piped input, no TTY).
    Eof,
}

/// Reads questions from stdin and prints result cards to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }

    /// Run until EOF or `/quit`.
    pub async fn run(&self, service: &SearchService) -> Result<CliExit, ChannelError> {
        let printer = tokio::spawn(print_states(service.subscribe()));
        let result = read_queries(tokio::io::stdin(), service).await;
        printer.abort();
        result
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed each trimmed, non-empty line into the service.
async fn read_queries<R>(input: R, service: &SearchService) -> Result<CliExit, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    eprint!("> ");
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    eprint!("> ");
                    continue;
                }
                if line == "/quit" {
                    return Ok(CliExit::Quit);
                }
                service.set_query(line);
            }
            Ok(None) => return Ok(CliExit::Eof),
            Err(e) => {
                error!("Error reading stdin: {}", e);
                return Err(e.into());
            }
        }
    }
}

async fn print_states(mut rx: watch::Receiver<SearchState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        println!("\n{}\n", render(&state));
        if !state.loading {
            eprint!("> ");
        }
    }
}

/// Render a state as the text a user sees.
pub fn render(state: &SearchState) -> String {
    if state.loading {
        return "⏳ Searching...".to_string();
    }
    if let Some(message) = &state.error {
        return format!("❌ {}", message);
    }
    match &state.result {
        Some(card) => card.to_string(),
        None => "No answer found.".to_string(),
    }
}
