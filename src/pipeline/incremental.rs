// src/pipeline/incremental.rs

//! Incremental crawl: plugins modified since a given date.

use chrono::{NaiveDate, Utc};
use futures::channel::mpsc;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, CrawlMode, DateWindow, RunSummary};
use crate::services::{DetailFetcher, SearchCrawler};
use crate::storage::PluginStore;

use super::fetch::fetch_and_store;
use super::fetch_options;

/// Run the incremental crawl for every day after `since` through `today`.
///
/// `since` is validated before any request is made. Search pages feed the
/// detail stage through a channel, so detail fetches start while later
/// pages and days are still being searched.
pub async fn run_incremental(
    config: &Config,
    store: &dyn PluginStore,
    client: &Client,
    since: &str,
    today: NaiveDate,
) -> Result<RunSummary> {
    let window = DateWindow::parse(since, today)?;
    let start_time = Utc::now();
    log::info!(
        "Incremental crawl starting: {} day(s) from {} to {}",
        window.len(),
        window.first().unwrap_or(today),
        window.last().unwrap_or(today)
    );

    let crawler = SearchCrawler::new(config, client.clone());
    let fetcher = DetailFetcher::new(config, client.clone());
    let options = fetch_options(config);

    let (tx, rx) = mpsc::unbounded();
    let discover = async move {
        let stats = crawler.crawl_window(&window, &tx).await;
        // tx drops here and closes the detail stage once it drains
        log::info!(
            "Search complete, {} plugins found across {} page(s)",
            stats.discovered,
            stats.pages
        );
        if stats.failed_days > 0 || stats.failed_pages > 0 {
            log::warn!(
                "{} day(s) and {} page(s) could not be searched",
                stats.failed_days,
                stats.failed_pages
            );
        }
        stats
    };
    let persist = fetch_and_store(rx, &fetcher, store, &options);

    let (stats, outcome) = tokio::join!(discover, persist);

    Ok(RunSummary {
        mode: CrawlMode::Incremental,
        start_time,
        end_time: Utc::now(),
        discovered: stats.discovered,
        outcome,
    })
}
