use crate::error::GalleryError;
use async_trait::async_trait;

/// Field map of one document. Values are JSON so records round-trip through
/// the store without the gateway having to know every field.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// One write in a batched commit.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Replace the whole document.
    Set { path: String, fields: Fields },
    /// Partial field update; creates the document when absent.
    Merge { path: String, fields: Fields },
    Delete { path: String },
}

/// Interface boundary of the managed document store.
///
/// This is the full capability set the crate depends on: read/write by key,
/// partial field update, atomic append-unique to an array field, existence
/// checks, and batched writes. Nothing here is specific to one product.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Fields>, GalleryError>;

    /// Replace the whole document, creating it when absent.
    async fn set(&self, path: &str, fields: Fields) -> Result<(), GalleryError>;

    /// Partial field update, creating the document when absent.
    async fn merge(&self, path: &str, fields: Fields) -> Result<(), GalleryError>;

    /// Atomically append values not already present to an array field,
    /// creating the document and the field when absent.
    async fn array_union(
        &self,
        path: &str,
        field: &str,
        values: Vec<serde_json::Value>,
    ) -> Result<(), GalleryError>;

    /// Delete the document. Deleting an absent document is not an error.
    async fn delete(&self, path: &str) -> Result<(), GalleryError>;

    /// Apply all writes in a single round trip.
    async fn commit(&self, writes: Vec<BatchWrite>) -> Result<(), GalleryError>;

    async fn exists(&self, path: &str) -> Result<bool, GalleryError> {
        Ok(self.get(path).await?.is_some())
    }
}
