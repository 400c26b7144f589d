// src/pipeline/fetch.rs

//! Detail-fetch and persist stage shared by both crawl modes.

use std::pin::pin;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};

use crate::error::{AppError, FailureKind};
use crate::models::{FetchOutcome, PluginId};
use crate::services::DetailFetcher;
use crate::storage::PluginStore;

/// Tuning for [`fetch_and_store`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Detail requests in flight at once
    pub concurrency: usize,
    /// Pause after each completed item
    pub delay: Duration,
    /// Log each stored plugin at info instead of debug
    pub log_items: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            delay: Duration::ZERO,
            log_items: false,
        }
    }
}

/// Where a single identifier ended up.
enum ItemResult {
    Stored,
    FetchFailed(AppError),
    StoreFailed(AppError),
}

/// Resolve every identifier from `ids` and upsert the records.
///
/// Identifiers are consumed as they arrive. A failed fetch or upsert is
/// logged and counted; it never stops the rest of the stream.
pub async fn fetch_and_store<S>(
    ids: S,
    fetcher: &DetailFetcher,
    store: &dyn PluginStore,
    options: &FetchOptions,
) -> FetchOutcome
where
    S: Stream<Item = PluginId>,
{
    let mut outcome = FetchOutcome::default();
    let log_items = options.log_items;

    let results = ids
        .map(|id| async move {
            let record = match fetcher.fetch(id).await {
                Ok(record) => record,
                Err(error) => return (id, ItemResult::FetchFailed(error)),
            };
            match store.upsert(&record).await {
                Ok(()) => {
                    if log_items {
                        log::info!("Stored plugin {}", id);
                    } else {
                        log::debug!("Stored plugin {}", id);
                    }
                    (id, ItemResult::Stored)
                }
                Err(error) => (id, ItemResult::StoreFailed(error)),
            }
        })
        .buffer_unordered(options.concurrency.max(1));
    let mut results = pin!(results);

    while let Some((id, result)) = results.next().await {
        outcome.requested += 1;
        match result {
            ItemResult::Stored => {
                outcome.fetched += 1;
                outcome.stored += 1;
            }
            ItemResult::FetchFailed(error) => {
                let kind = error.kind();
                outcome.record_failure(kind);
                log::warn!("Failed to fetch plugin {} ({}): {}", id, kind, error);
            }
            ItemResult::StoreFailed(error) => {
                outcome.fetched += 1;
                outcome.record_failure(FailureKind::Store);
                log::error!("Error processing item {}: {}", id, error);
            }
        }

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    outcome
}
