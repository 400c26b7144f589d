// src/pipeline/full.rs

//! Full crawl: every fetchable plugin listed in the bulk feed.

use chrono::Utc;
use futures::stream;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, CrawlMode, RunSummary};
use crate::services::{DetailFetcher, FeedReader};
use crate::storage::PluginStore;

use super::fetch::fetch_and_store;
use super::fetch_options;

/// Run the full crawl.
///
/// The feed is downloaded and scanned completely before the first detail
/// request goes out. A feed failure ends the run.
pub async fn run_full(
    config: &Config,
    store: &dyn PluginStore,
    client: &Client,
) -> Result<RunSummary> {
    let start_time = Utc::now();
    log::info!("Full crawl starting, feed: {}", config.endpoints.feed_url);

    let feed = FeedReader::new(config, client.clone());
    let scan = feed.read().await?;

    log::info!(
        "Plugins XML parsing complete, {} plugins found",
        scan.ids.len()
    );
    log::debug!(
        "Feed records: {} total, {} out of range, {} malformed",
        scan.records,
        scan.excluded,
        scan.malformed
    );

    let fetcher = DetailFetcher::new(config, client.clone());
    let discovered = scan.ids.len();
    let outcome = fetch_and_store(
        stream::iter(scan.ids),
        &fetcher,
        store,
        &fetch_options(config),
    )
    .await;

    Ok(RunSummary {
        mode: CrawlMode::Full,
        start_time,
        end_time: Utc::now(),
        discovered,
        outcome,
    })
}
