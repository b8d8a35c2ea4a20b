// In-memory DocumentStore

use crate::fault::FaultInjector;
use async_trait::async_trait;
use dashmap::DashMap;
use healthcheck_core::error::{AppError, Result};
use healthcheck_core::port::{DocumentId, DocumentStore};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Field holding the generated id on every stored document
pub const ID_FIELD: &str = "_id";

/// Named collections of JSON objects keyed by generated id
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<String, BTreeMap<DocumentId, Value>>,
    faults: FaultInjector,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault switches, keyed by operation (`insert`, `update`, `remove`)
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// All documents of a collection
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Documents of a collection whose `field` equals `value`
    pub fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Vec<Value> {
        self.documents(collection)
            .into_iter()
            .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
            .collect()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: &str, document: Value) -> Result<DocumentId> {
        self.faults.check("insert")?;

        let Value::Object(mut fields) = document else {
            return Err(AppError::Validation(
                "document must be a JSON object".to_string(),
            ));
        };

        let id = uuid::Uuid::new_v4().to_string();
        fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), Value::Object(fields));

        debug!(collection = %collection, id = %id, "Inserted document");
        Ok(id)
    }

    async fn update_by_id(&self, collection: &str, id: &str, fields: Value) -> Result<bool> {
        self.faults.check("update")?;

        let Value::Object(updates) = fields else {
            return Err(AppError::Validation(
                "update fields must be a JSON object".to_string(),
            ));
        };

        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(Value::Object(doc)) = docs.get_mut(id) else {
            return Ok(false);
        };

        for (key, value) in updates {
            if key != ID_FIELD {
                doc.insert(key, value);
            }
        }
        Ok(true)
    }

    async fn remove_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        self.faults.check("remove")?;

        Ok(self
            .collections
            .get_mut(collection)
            .is_some_and(|mut docs| docs.remove(id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert("logs", json!({"taskId": "t1", "status": "RESERVED"}))
            .await
            .unwrap();

        let docs = store.find_by_field("logs", "taskId", "t1");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0][ID_FIELD], id);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert("logs", json!({"taskId": "t1", "status": "RESERVED"}))
            .await
            .unwrap();

        let updated = store
            .update_by_id("logs", &id, json!({"status": "COMPLETED", "completedAt": 5}))
            .await
            .unwrap();
        assert!(updated);

        let doc = &store.documents("logs")[0];
        assert_eq!(doc["status"], "COMPLETED");
        assert_eq!(doc["completedAt"], 5);
        assert_eq!(doc["taskId"], "t1");
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.update_by_id("logs", "nope", json!({})).await.unwrap());
        assert!(!store.remove_by_id("logs", "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryDocumentStore::new();
        let id = store.insert("logs", json!({"taskId": "t1"})).await.unwrap();

        assert!(store.remove_by_id("logs", &id).await.unwrap());
        assert_eq!(store.count("logs"), 0);
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let store = InMemoryDocumentStore::new();
        let result = store.insert("logs", json!([1, 2])).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
