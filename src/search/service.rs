//! Search service — debounced, latest-wins lookups behind a watch channel.
//!
//! Input values arrive through [`SearchService::set_query`]. A value is
//! searched once the input has been quiet for the debounce window and differs
//! from the previously searched value. A newer value cancels the lookup in
//! flight, so only the latest query can ever publish a result.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::model::{FlashcardPair, SearchState};
use super::searcher::FlashcardLookup;
use crate::error::SearchError;

/// Message shown for any failed lookup.
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed. Please try again.";

type LookupFuture = BoxFuture<'static, Result<Option<FlashcardPair>, SearchError>>;

/// Reactive search state for one input surface.
pub struct SearchService {
    query_tx: watch::Sender<String>,
    state_rx: watch::Receiver<SearchState>,
    driver: JoinHandle<()>,
}

impl SearchService {
    /// Spawn the driver task. Must be called inside a tokio runtime.
    pub fn new(lookup: Arc<dyn FlashcardLookup>, debounce: Duration) -> Self {
        let (query_tx, query_rx) = watch::channel(String::new());
        let (state_tx, state_rx) = watch::channel(SearchState::default());

        let driver = tokio::spawn(drive(lookup, debounce, query_rx, state_tx));

        Self {
            query_tx,
            state_rx,
            driver,
        }
    }

    /// Replace the current input value.
    pub fn set_query(&self, query: impl Into<String>) {
        self.query_tx.send_replace(query.into());
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SearchState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state_rx.clone()
    }
}

impl Drop for SearchService {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    lookup: Arc<dyn FlashcardLookup>,
    debounce: Duration,
    mut queries: watch::Receiver<String>,
    state: watch::Sender<SearchState>,
) {
    let mut deadline: Option<Instant> = None;
    let mut last_searched = String::new();
    let mut in_flight: Option<(Uuid, LookupFuture)> = None;

    loop {
        tokio::select! {
            changed = queries.changed() => {
                if changed.is_err() {
                    break;
                }
                deadline = Some(Instant::now() + debounce);
            }
            _ = wait_until(deadline) => {
                deadline = None;
                let query = queries.borrow_and_update().clone();
                if query == last_searched {
                    continue;
                }
                last_searched = query.clone();

                if let Some((id, _)) = in_flight.take() {
                    debug!(query_id = %id, "Superseded by newer input");
                }

                if query.trim().is_empty() {
                    state.send_modify(|s| {
                        s.result = None;
                        s.loading = false;
                        s.error = None;
                    });
                    continue;
                }

                let id = Uuid::new_v4();
                info!(query_id = %id, query = %query, "Searching");
                state.send_modify(|s| {
                    s.loading = true;
                    s.error = None;
                });

                let lookup = Arc::clone(&lookup);
                in_flight = Some((id, Box::pin(async move { lookup.lookup(&query).await })));
            }
            outcome = poll_in_flight(&mut in_flight) => {
                let id = in_flight.take().map(|(id, _)| id).unwrap_or_default();
                match outcome {
                    Ok(result) => {
                        info!(query_id = %id, found = result.is_some(), "Search finished");
                        state.send_modify(|s| {
                            s.result = result;
                            s.loading = false;
                        });
                    }
                    Err(e) => {
                        error!(query_id = %id, error = %e, "Search error");
                        state.send_modify(|s| {
                            s.result = None;
                            s.loading = false;
                            s.error = Some(SEARCH_FAILED_MESSAGE.to_string());
                        });
                    }
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn poll_in_flight(
    in_flight: &mut Option<(Uuid, LookupFuture)>,
) -> Result<Option<FlashcardPair>, SearchError> {
    match in_flight {
        Some((_, fut)) => fut.await,
        None => pending().await,
    }
}
