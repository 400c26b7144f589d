//! MongoDB storage implementation.
//!
//! Plugins live in one collection, one document each, matched on
//! `script_id`. Upserts use `$set` so a newer record overwrites every field
//! it carries. `script_id` is always stored as an integer, whether upstream
//! sent a number or a numeric string.

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::{Client, Collection};

use crate::error::{AppError, Result};
use crate::models::{KEY_FIELD, PluginId, PluginRecord, StorageConfig};
use crate::storage::PluginStore;

/// MongoDB storage backend.
///
/// The driver pools connections internally, so one instance is shared by
/// every in-flight upsert of a run.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect using the URI, database and collection from `config`.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        log::info!(
            "Using MongoDB collection {}.{}",
            config.database,
            config.collection
        );
        Ok(Self { collection })
    }
}

/// Filter matching the stored document for a plugin.
fn key_filter(id: PluginId) -> Document {
    doc! { KEY_FIELD: i64::from(id.get()) }
}

/// `$set` update carrying every field of the record.
fn set_update(record: &PluginRecord) -> Result<Document> {
    let mut fields = bson::to_document(record.fields()).map_err(AppError::store)?;
    fields.insert(KEY_FIELD, i64::from(record.id().get()));
    Ok(doc! { "$set": fields })
}

/// Convert a stored document back into a record.
fn into_record(mut document: Document) -> Result<PluginRecord> {
    document.remove("_id");
    match Bson::Document(document).into_relaxed_extjson() {
        serde_json::Value::Object(fields) => PluginRecord::from_fields(fields),
        other => Err(AppError::store(format!("unexpected document shape: {other}"))),
    }
}

#[async_trait]
impl PluginStore for MongoStore {
    async fn upsert(&self, record: &PluginRecord) -> Result<()> {
        let filter = key_filter(record.id());
        let update = set_update(record)?;
        self.collection.update_one(filter, update).upsert(true).await?;
        Ok(())
    }

    async fn load(&self, id: PluginId) -> Result<Option<PluginRecord>> {
        self.collection
            .find_one(key_filter(id))
            .await?
            .map(into_record)
            .transpose()
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    fn describe(&self) -> String {
        format!("MongoDB collection {}", self.collection.namespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> PluginRecord {
        PluginRecord::from_source(value).unwrap()
    }

    #[test]
    fn test_numeric_and_text_keys_share_one_document() {
        let numeric = record(json!({"script_id": 10001}));
        let text = record(json!({"script_id": "10001"}));

        assert_eq!(key_filter(numeric.id()), doc! { "script_id": 10001_i64 });
        assert_eq!(key_filter(text.id()), key_filter(numeric.id()));

        let set = set_update(&text).unwrap();
        assert_eq!(
            set.get_document("$set").unwrap().get_i64("script_id").unwrap(),
            10001
        );
    }

    #[test]
    fn test_update_sets_every_field() {
        let record = record(json!({
            "script_id": 117291,
            "script_name": "Example",
            "cves": ["CVE-2024-0001"],
        }));

        let update = set_update(&record).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get_str("script_name").unwrap(), "Example");
        assert_eq!(
            set.get_array("cves").unwrap(),
            &vec![Bson::String("CVE-2024-0001".into())]
        );
    }

    #[test]
    fn test_round_trip_drops_object_id() {
        let document = doc! {
            "_id": bson::oid::ObjectId::new(),
            "script_id": 10001_i64,
            "risk_factor": "High",
        };

        let record = into_record(document).unwrap();
        assert_eq!(record.id().get(), 10001);
        assert!(record.get("_id").is_none());
        assert_eq!(record.get("risk_factor"), Some(&json!("High")));
    }
}
