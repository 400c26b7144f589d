//! Local filesystem storage implementation.
//!
//! Keeps one pretty-printed JSON document per plugin for development and
//! offline runs. Production deployments should use `MongoStore`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── plugins/
//!     └── {script_id}.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{PluginId, PluginRecord};
use crate::storage::PluginStore;

const PLUGIN_DIR: &str = "plugins";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Relative key of a plugin document.
    fn plugin_key(id: PluginId) -> String {
        format!("{PLUGIN_DIR}/{id}.json")
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a stored document as a field map.
    async fn read_fields(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        match self.read_bytes(key).await? {
            Some(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(fields) => Ok(Some(fields)),
                _ => Err(AppError::store(format!("{key} does not hold a JSON object"))),
            },
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PluginStore for LocalStorage {
    async fn upsert(&self, record: &PluginRecord) -> Result<()> {
        let key = Self::plugin_key(record.id());
        let _guard = self.write_lock.lock().await;

        let mut fields = self.read_fields(&key).await?.unwrap_or_default();
        for (name, value) in record.fields() {
            fields.insert(name.clone(), value.clone());
        }

        let bytes = serde_json::to_vec_pretty(&fields)?;
        self.write_bytes(&key, &bytes).await
    }

    async fn load(&self, id: PluginId) -> Result<Option<PluginRecord>> {
        self.read_fields(&Self::plugin_key(id))
            .await?
            .map(PluginRecord::from_fields)
            .transpose()
    }

    async fn count(&self) -> Result<u64> {
        let dir = self.path(PLUGIN_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn describe(&self) -> String {
        format!("local directory {}", self.path(PLUGIN_DIR).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(value: Value) -> PluginRecord {
        PluginRecord::from_source(value).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.json", b"{}").await.unwrap();
        let data = storage.read_bytes("test.json").await.unwrap();
        assert_eq!(data, Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read_bytes("nope.json").await.unwrap().is_none());
        assert!(storage.load(PluginId::new(10001).unwrap()).await.unwrap().is_none());
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_same_key_keeps_one_document_with_latest_values() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage
            .upsert(&record(json!({"script_id": 10001, "risk_factor": "Low", "cve": ["CVE-1"]})))
            .await
            .unwrap();
        storage
            .upsert(&record(json!({"script_id": 10001, "risk_factor": "High"})))
            .await
            .unwrap();

        assert_eq!(storage.count().await.unwrap(), 1);
        let stored = storage.load(PluginId::new(10001).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.get("risk_factor"), Some(&json!("High")));
        // fields absent from the newer record are left as they were
        assert_eq!(stored.get("cve"), Some(&json!(["CVE-1"])));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_for_different_keys() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));

        let tasks: Vec<_> = (0..20u32)
            .map(|i| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    storage
                        .upsert(&record(json!({"script_id": 20000 + i, "n": i})))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(storage.count().await.unwrap(), 20);
        let stored = storage.load(PluginId::new(20007).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.get("n"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_store_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes("plugins/10001.json", b"[1, 2]").await.unwrap();

        let err = storage
            .upsert(&record(json!({"script_id": 10001})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
