// Document Store Port

use crate::error::Result;
use async_trait::async_trait;

/// Generated document identifier
pub type DocumentId = String;

/// Document store organised in named collections of JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a JSON object, returning its generated id
    async fn insert(&self, collection: &str, document: serde_json::Value) -> Result<DocumentId>;

    /// Merge the top-level fields of `fields` into the document
    ///
    /// Returns `false` if no document with `id` exists.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        fields: serde_json::Value,
    ) -> Result<bool>;

    /// Remove a document; returns whether it existed
    async fn remove_by_id(&self, collection: &str, id: &str) -> Result<bool>;
}
