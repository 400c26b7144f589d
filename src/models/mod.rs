// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod plugin;
pub mod range;
mod stats;
mod window;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, EndpointConfig, LoggingConfig, PLUGIN_PLACEHOLDER, StorageBackend,
    StorageConfig,
};
pub use plugin::{KEY_FIELD, PluginId, PluginRecord};
pub use range::is_fetchable;
pub use stats::{CrawlMode, FetchOutcome, RunSummary};
pub use window::{DateWindow, previous_day};
