//! Pipeline entry points for crawler operations.
//!
//! - `run_full`: Fetch every plugin listed in the bulk feed
//! - `run_incremental`: Fetch plugins modified since a date

pub mod fetch;
pub mod full;
pub mod incremental;

use std::time::Duration;

use crate::models::Config;

pub use fetch::{FetchOptions, fetch_and_store};
pub use full::run_full;
pub use incremental::run_incremental;

/// Detail-stage tuning taken from the crawler and logging settings.
pub fn fetch_options(config: &Config) -> FetchOptions {
    FetchOptions {
        concurrency: config.crawler.max_concurrent.max(1),
        delay: Duration::from_millis(config.crawler.request_delay_ms),
        log_items: config.logging.log_scraped_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_options_follow_config() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 4;
        config.crawler.request_delay_ms = 250;
        config.logging.log_scraped_items = true;

        let options = fetch_options(&config);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.delay, Duration::from_millis(250));
        assert!(options.log_items);
    }
}
