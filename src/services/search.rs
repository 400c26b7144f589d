// src/services/search.rs

//! Date-filtered plugin search crawler.
//!
//! For each day the search endpoint is queried for plugins modified on that
//! day. The first response carries the result total, which fixes the number
//! of pages; the remaining pages are then fetched concurrently. Every
//! fetchable `script_id` is sent to the detail stage as soon as its page
//! arrives.

use chrono::NaiveDate;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, DateWindow, KEY_FIELD, PluginId};
use crate::utils::{append_query, http};

/// Results per search page, fixed by the upstream API.
pub const PAGE_SIZE: u64 = 50;

/// Maximum number of days crawled at once.
pub const DAY_CONCURRENCY: usize = 4;

/// Number of pages to walk for `total` results.
///
/// Always one more than `total / PAGE_SIZE`, so an exact multiple of the page
/// size walks one trailing empty page.
pub fn page_count(total: u64) -> u64 {
    total / PAGE_SIZE + 1
}

/// URLs of pages `2..=page_count(total)` derived from the first page URL.
///
/// Built one at a time as the crawl asks for them.
pub fn remaining_page_urls(
    first_url: &str,
    total: u64,
) -> impl Iterator<Item = Result<String>> + '_ {
    (2..=page_count(total)).map(move |page| append_query(first_url, "page", &page.to_string()))
}

/// `data.total` as a count; numeric strings are accepted.
fn result_total(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One decoded search page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// `data.total`, when present
    pub total: Option<u64>,
    /// Fetchable identifiers in hit order
    pub ids: Vec<PluginId>,
    /// Hits without a usable `_source.script_id`
    pub skipped: usize,
    /// Hits outside the fetchable ranges
    pub excluded: usize,
}

/// Decode a search response body.
pub fn parse_page(body: &str, context: &str) -> Result<SearchPage> {
    let json: Value = serde_json::from_str(body)?;
    let data = json
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AppError::shape(context, "missing 'data' object"))?;

    let mut page = SearchPage {
        total: data.get("total").and_then(result_total),
        ..SearchPage::default()
    };

    let hits = data.get("hits").and_then(Value::as_array);
    for hit in hits.into_iter().flatten() {
        let id = hit
            .get("_source")
            .and_then(|source| source.get(KEY_FIELD))
            .and_then(PluginId::from_value);

        match id {
            Some(id) if id.is_fetchable() => page.ids.push(id),
            Some(_) => page.excluded += 1,
            None => page.skipped += 1,
        }
    }
    Ok(page)
}

/// Result of crawling one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub day: NaiveDate,
    pub total: u64,
    /// Pages walked, including the first
    pub pages: u64,
    pub failed_pages: u64,
    /// Identifiers sent to the detail stage
    pub discovered: usize,
    pub skipped_hits: usize,
    pub excluded: usize,
}

impl DayOutcome {
    fn new(day: NaiveDate, total: u64) -> Self {
        Self {
            day,
            total,
            pages: page_count(total),
            failed_pages: 0,
            discovered: 0,
            skipped_hits: 0,
            excluded: 0,
        }
    }

    fn absorb(&mut self, page: SearchPage, sink: &UnboundedSender<PluginId>) {
        self.skipped_hits += page.skipped;
        self.excluded += page.excluded;
        for id in page.ids {
            if sink.unbounded_send(id).is_err() {
                log::debug!("Detail stage closed, dropping plugin {}", id);
                continue;
            }
            self.discovered += 1;
        }
    }
}

/// Totals across a date window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub days: usize,
    pub failed_days: usize,
    pub pages: u64,
    pub failed_pages: u64,
    pub discovered: usize,
    pub skipped_hits: usize,
    pub excluded: usize,
}

impl DiscoveryStats {
    fn add(&mut self, day: &DayOutcome) {
        self.pages += day.pages;
        self.failed_pages += day.failed_pages;
        self.discovered += day.discovered;
        self.skipped_hits += day.skipped_hits;
        self.excluded += day.excluded;
    }
}

/// Crawls the search endpoint one day at a time.
pub struct SearchCrawler {
    client: Client,
    search_url: String,
    concurrency: usize,
}

impl SearchCrawler {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            search_url: config.endpoints.search_url.clone(),
            concurrency: config.crawler.max_concurrent.max(1),
        }
    }

    /// First page URL for plugins modified on `day`.
    pub fn first_page_url(&self, day: NaiveDate) -> String {
        format!(
            "{}?q=plugin_modification_date:({})",
            self.search_url,
            day.format("%Y-%m-%d")
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchPage> {
        let body = http::fetch_text(&self.client, url).await?;
        parse_page(&body, url)
    }

    /// Crawl every page for `day`, sending fetchable ids into `sink`.
    ///
    /// Fails only when the first page cannot be used; later page failures are
    /// counted in the outcome.
    pub async fn crawl_day(
        &self,
        day: NaiveDate,
        sink: &UnboundedSender<PluginId>,
    ) -> Result<DayOutcome> {
        let first_url = self.first_page_url(day);
        let first = self.fetch_page(&first_url).await?;
        let total = first
            .total
            .ok_or_else(|| AppError::shape(first_url.as_str(), "missing 'data.total'"))?;

        let mut outcome = DayOutcome::new(day, total);
        log::debug!("{}: {} results over {} page(s)", day, total, outcome.pages);

        // page 1 is already in hand
        outcome.absorb(first, sink);

        let first_url = first_url.as_str();
        let mut pages = stream::iter(remaining_page_urls(first_url, total))
            .map(|url| async move {
                match url {
                    Ok(url) => {
                        let result = self.fetch_page(&url).await;
                        (url, result)
                    }
                    Err(error) => (first_url.to_string(), Err(error)),
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((url, result)) = pages.next().await {
            match result {
                Ok(page) => outcome.absorb(page, sink),
                Err(error) => {
                    outcome.failed_pages += 1;
                    log::warn!("Failed to fetch search page {}: {}", url, error);
                }
            }
        }

        Ok(outcome)
    }

    /// Crawl every day of `window`.
    pub async fn crawl_window(
        &self,
        window: &DateWindow,
        sink: &UnboundedSender<PluginId>,
    ) -> DiscoveryStats {
        let mut stats = DiscoveryStats {
            days: window.len(),
            ..DiscoveryStats::default()
        };

        let mut days = stream::iter(window.days().iter().copied())
            .map(|day| async move { (day, self.crawl_day(day, sink).await) })
            .buffer_unordered(DAY_CONCURRENCY);

        while let Some((day, result)) = days.next().await {
            match result {
                Ok(outcome) => {
                    log::info!(
                        "{}: {} plugin(s) queued from {} page(s)",
                        day,
                        outcome.discovered,
                        outcome.pages
                    );
                    stats.add(&outcome);
                }
                Err(error) => {
                    stats.failed_days += 1;
                    log::warn!("Failed to search plugins modified on {}: {}", day, error);
                }
            }
        }

        stats
    }
}
