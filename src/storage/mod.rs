//! Storage abstractions for plugin persistence.
//!
//! Every backend upserts by `script_id`: a record for an unknown plugin is
//! inserted, and a record for a known plugin sets each of its fields on the
//! stored document.
//!
//! - `MongoStore`: one document per plugin in a MongoDB collection
//! - `LocalStorage`: one JSON file per plugin under a directory
//!
//! ```text
//! storage/
//! └── plugins/
//!     ├── 10001.json
//!     └── 117291.json
//! ```

pub mod local;
#[cfg(feature = "mongo")]
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PluginId, PluginRecord, StorageBackend, StorageConfig};

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

/// Trait for plugin storage backends.
///
/// Implementations must accept concurrent calls; two upserts racing on the
/// same key leave whichever wrote last.
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// Insert or update the document keyed by the record's `script_id`.
    async fn upsert(&self, record: &PluginRecord) -> Result<()>;

    /// Load the stored document for `id`.
    async fn load(&self, id: PluginId) -> Result<Option<PluginRecord>>;

    /// Number of stored plugins.
    async fn count(&self) -> Result<u64>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Open the backend selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn PluginStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(&config.local_dir))),
        #[cfg(feature = "mongo")]
        StorageBackend::Mongo => Ok(Arc::new(MongoStore::connect(config).await?)),
        #[cfg(not(feature = "mongo"))]
        StorageBackend::Mongo => Err(crate::error::AppError::config(
            "MongoDB backend requested but the 'mongo' feature is disabled",
        )),
    }
}
