use std::path::Path;
use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use quizbase::channels::{CliChannel, CliExit};
use quizbase::config::Config;
use quizbase::llm::create_provider;
use quizbase::search::routes::{search_routes, serve};
use quizbase::search::{FlashcardLookup, SearchService, create_searcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📇 QuizBase v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!(
        "   Fallback: {}",
        if config.custom_search.is_some() {
            "Custom Search"
        } else {
            "none (grounding only)"
        }
    );
    eprintln!("   Search API: http://0.0.0.0:{}/api/search?q=...", config.port);
    eprintln!("   Search WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Type a question and press Enter. /quit to exit.\n");

    let client = reqwest::Client::new();
    let llm = create_provider(&config, client.clone());
    let lookup: Arc<dyn FlashcardLookup> = Arc::new(create_searcher(&config, llm, client));

    let app = search_routes(Arc::clone(&lookup), config.debounce);
    let port = config.port;
    let mut server = tokio::spawn(async move {
        if let Err(e) = serve(app, port).await {
            tracing::error!(error = %e, "Search server stopped");
        }
    });

    let service = SearchService::new(lookup, config.debounce);
    if CliChannel::new().run(&service).await? == CliExit::Eof {
        // No terminal attached; keep the HTTP/WS surface up
        tracing::info!("stdin closed, serving until Ctrl-C");
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = &mut server => {}
        }
    }
    server.abort();

    Ok(())
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "quizbase.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}
