//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Bulk feed download and scanning (`FeedReader`)
//! - Date-filtered plugin search (`SearchCrawler`)
//! - Plugin detail fetching (`DetailFetcher`)

pub mod detail;
pub mod feed;
pub mod search;

pub use detail::DetailFetcher;
pub use feed::{FeedReader, FeedScan};
pub use search::{DayOutcome, DiscoveryStats, SearchCrawler};
