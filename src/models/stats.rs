//! Run statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FailureKind;

/// Which discovery strategy a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Whole bulk feed
    Full,
    /// Search API over a date window
    Incremental,
}

/// Counters for the detail-fetch and persist stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    /// Identifiers handed to the detail fetcher
    pub requested: usize,
    /// Detail records received
    pub fetched: usize,
    /// Records accepted by the store
    pub stored: usize,
    /// Failures per kind, across fetch and store
    pub failures: BTreeMap<String, usize>,
}

impl FetchOutcome {
    pub fn record_failure(&mut self, kind: FailureKind) {
        *self.failures.entry(kind.to_string()).or_default() += 1;
    }

    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }

    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures.get(&kind.to_string()).copied().unwrap_or(0)
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: CrawlMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Fetchable identifiers discovered
    pub discovered: usize,
    pub outcome: FetchOutcome,
}

impl RunSummary {
    /// Emit the summary through the logger.
    pub fn log(&self) {
        let elapsed = self.end_time - self.start_time;
        log::info!(
            "{:?} crawl finished in {}s: {} discovered, {} fetched, {} stored",
            self.mode,
            elapsed.num_seconds(),
            self.discovered,
            self.outcome.fetched,
            self.outcome.stored
        );
        for (kind, count) in &self.outcome.failures {
            log::warn!("  {} {} failure(s)", count, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_accounting() {
        let mut outcome = FetchOutcome::default();
        outcome.record_failure(FailureKind::Network);
        outcome.record_failure(FailureKind::Network);
        outcome.record_failure(FailureKind::Store);

        assert_eq!(outcome.failure_count(), 3);
        assert_eq!(outcome.failures_of(FailureKind::Network), 2);
        assert_eq!(outcome.failures_of(FailureKind::Shape), 0);
    }
}
