use crate::error::GalleryError;
use crate::gallery::model::{Album, DeletionLogEntry, Photo};
use crate::store::document::{BatchWrite, DocumentStore, Fields};
use futures_util::future::try_join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Photos per chunk document. Keeps every chunk comfortably under the
/// store's per-document size ceiling.
pub const CHUNK_CAPACITY: usize = 500;

/// Handle to the physical chunk document holding a photo. A storage
/// artifact: callers carry it back into `update_photo`/`delete_photo`, but
/// it never identifies the photo itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkRef(pub String);

/// A photo together with the chunk it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPhoto {
    pub photo: Photo,
    pub chunk: ChunkRef,
}

/// Full gallery state as read from the remote store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    pub photos: Vec<StoredPhoto>,
    pub albums: Vec<Album>,
}

/// Chunked-layout gateway over a [`DocumentStore`].
///
/// One metadata document (`galleries/{id}`) owns the albums collection and
/// the authoritative ordered list of chunk ids; photos are spread across
/// chunk documents (`galleries/{id}/chunks/{chunkId}`) capped at
/// [`CHUNK_CAPACITY`].
#[derive(Clone)]
pub struct DocumentGateway {
    store: Arc<dyn DocumentStore>,
    gallery_id: String,
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, GalleryError> {
    serde_json::to_value(value)
        .map_err(|e| GalleryError::ValidationFailed(format!("could not encode record: {}", e)))
}

/// Read an array field as raw values; a missing field is an empty array.
fn array_field(fields: &Fields, name: &str) -> Vec<Value> {
    fields
        .get(name)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

fn value_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(|v| v.as_str())
}

/// Decode an array field element-wise, skipping malformed entries instead of
/// failing the whole read.
fn decode_array<T: serde::de::DeserializeOwned>(fields: &Fields, name: &str) -> Vec<T> {
    array_field(fields, name)
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("skipping malformed {} entry: {}", name, e);
                None
            }
        })
        .collect()
}

fn chunk_ids(meta: &Fields) -> Vec<String> {
    array_field(meta, "chunkIds")
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}

// ── Gateway ───────────────────────────────────────────────────────────────────

impl DocumentGateway {
    pub fn new(store: Arc<dyn DocumentStore>, gallery_id: impl Into<String>) -> Self {
        DocumentGateway {
            store,
            gallery_id: gallery_id.into(),
        }
    }

    fn meta_path(&self) -> String {
        format!("galleries/{}", self.gallery_id)
    }

    fn chunk_path(&self, chunk_id: &str) -> String {
        format!("galleries/{}/chunks/{}", self.gallery_id, chunk_id)
    }

    fn deletion_log_path(&self) -> String {
        format!("galleries/{}/deletion-log", self.gallery_id)
    }

    /// Read the metadata document, lazily initializing it on first use.
    async fn require_meta(&self) -> Result<Fields, GalleryError> {
        if let Some(meta) = self.store.get(&self.meta_path()).await? {
            return Ok(meta);
        }
        let mut fields = Fields::new();
        fields.insert("albums".into(), json!([]));
        fields.insert("chunkIds".into(), json!([]));
        self.store.set(&self.meta_path(), fields.clone()).await?;
        tracing::info!("gateway: initialized gallery {}", self.gallery_id);
        Ok(fields)
    }

    /// Fetch the full gallery state. An untouched backing store yields an
    /// empty snapshot, never an error. Chunk documents are read
    /// concurrently; photo order follows the metadata chunk-id list.
    pub async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, GalleryError> {
        let meta = self.require_meta().await?;
        let albums: Vec<Album> = decode_array(&meta, "albums");
        let ids = chunk_ids(&meta);

        let paths: Vec<String> = ids.iter().map(|id| self.chunk_path(id)).collect();
        let reads = paths.iter().map(|path| self.store.get(path));
        let docs = try_join_all(reads).await?;

        let mut photos = Vec::new();
        for (id, doc) in ids.iter().zip(docs) {
            match doc {
                Some(fields) => {
                    let chunk = ChunkRef(id.clone());
                    photos.extend(
                        decode_array::<Photo>(&fields, "photos")
                            .into_iter()
                            .map(|photo| StoredPhoto {
                                photo,
                                chunk: chunk.clone(),
                            }),
                    );
                }
                None => tracing::warn!("chunk {} listed in metadata but missing", id),
            }
        }

        tracing::debug!(
            "fetch_snapshot: {} photos across {} chunks, {} albums",
            photos.len(),
            ids.len(),
            albums.len()
        );
        Ok(RemoteSnapshot { photos, albums })
    }

    /// Append a photo record. Uses spare capacity in the last chunk when
    /// there is any, else allocates a fresh chunk and records it in the
    /// metadata chunk-id list. Returns the owning chunk.
    pub async fn create_photo(&self, photo: &Photo) -> Result<ChunkRef, GalleryError> {
        let meta = self.require_meta().await?;
        let record = encode(photo)?;

        if let Some(last) = chunk_ids(&meta).last() {
            let path = self.chunk_path(last);
            let occupied = match self.store.get(&path).await? {
                Some(fields) => array_field(&fields, "photos").len(),
                None => 0,
            };
            if occupied < CHUNK_CAPACITY {
                self.store.array_union(&path, "photos", vec![record]).await?;
                return Ok(ChunkRef(last.clone()));
            }
        }

        let chunk_id = format!("chunk-{}", uuid::Uuid::new_v4().simple());
        let mut fields = Fields::new();
        fields.insert("photos".into(), json!([record]));
        self.store.set(&self.chunk_path(&chunk_id), fields).await?;
        self.store
            .array_union(&self.meta_path(), "chunkIds", vec![json!(chunk_id)])
            .await?;
        tracing::info!("gateway: allocated chunk {}", chunk_id);
        Ok(ChunkRef(chunk_id))
    }

    /// Apply a partial field update to one photo inside its owning chunk.
    pub async fn update_photo(
        &self,
        photo_id: &str,
        chunk: &ChunkRef,
        partial: Fields,
    ) -> Result<(), GalleryError> {
        let path = self.chunk_path(&chunk.0);
        let fields = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| GalleryError::not_found(format!("chunk {}", chunk.0)))?;

        let mut photos = array_field(&fields, "photos");
        let entry = photos
            .iter_mut()
            .find(|v| value_id(v) == Some(photo_id))
            .ok_or_else(|| GalleryError::not_found(format!("photo {}", photo_id)))?;
        if let Some(object) = entry.as_object_mut() {
            for (key, value) in partial {
                object.insert(key, value);
            }
        }

        let mut update = Fields::new();
        update.insert("photos".into(), Value::Array(photos));
        self.store.merge(&path, update).await
    }

    /// Remove one photo from its owning chunk.
    pub async fn delete_photo(&self, photo_id: &str, chunk: &ChunkRef) -> Result<(), GalleryError> {
        let path = self.chunk_path(&chunk.0);
        let fields = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| GalleryError::not_found(format!("chunk {}", chunk.0)))?;

        let photos = array_field(&fields, "photos");
        let remaining: Vec<Value> = photos
            .iter()
            .filter(|v| value_id(v) != Some(photo_id))
            .cloned()
            .collect();
        if remaining.len() == photos.len() {
            return Err(GalleryError::not_found(format!("photo {}", photo_id)));
        }

        let mut update = Fields::new();
        update.insert("photos".into(), Value::Array(remaining));
        self.store.merge(&path, update).await
    }

    pub async fn create_album(&self, album: &Album) -> Result<(), GalleryError> {
        self.require_meta().await?;
        let record = encode(album)?;
        self.store
            .array_union(&self.meta_path(), "albums", vec![record])
            .await
    }

    /// Apply a partial field update to one album in the metadata document.
    pub async fn update_album(&self, album_id: &str, partial: Fields) -> Result<(), GalleryError> {
        let meta = self.require_meta().await?;
        let mut albums = array_field(&meta, "albums");
        let entry = albums
            .iter_mut()
            .find(|v| value_id(v) == Some(album_id))
            .ok_or_else(|| GalleryError::not_found(format!("album {}", album_id)))?;
        if let Some(object) = entry.as_object_mut() {
            for (key, value) in partial {
                object.insert(key, value);
            }
        }

        let mut update = Fields::new();
        update.insert("albums".into(), Value::Array(albums));
        self.store.merge(&self.meta_path(), update).await
    }

    pub async fn delete_album(&self, album_id: &str) -> Result<(), GalleryError> {
        let meta = self.require_meta().await?;
        let albums = array_field(&meta, "albums");
        let remaining: Vec<Value> = albums
            .iter()
            .filter(|v| value_id(v) != Some(album_id))
            .cloned()
            .collect();
        if remaining.len() == albums.len() {
            return Err(GalleryError::not_found(format!("album {}", album_id)));
        }

        let mut update = Fields::new();
        update.insert("albums".into(), Value::Array(remaining));
        self.store.merge(&self.meta_path(), update).await
    }

    /// Reassign every listed photo to `new_album_id` in one batched write.
    /// Grouped per chunk so large transfers stay one round trip instead of
    /// one write per photo.
    pub async fn bulk_reassign_album(
        &self,
        pairs: &[(String, ChunkRef)],
        new_album_id: &str,
    ) -> Result<(), GalleryError> {
        if pairs.is_empty() {
            return Ok(());
        }

        let mut by_chunk: HashMap<&str, Vec<&str>> = HashMap::new();
        for (photo_id, chunk) in pairs {
            by_chunk.entry(&chunk.0).or_default().push(photo_id);
        }

        let mut writes = Vec::with_capacity(by_chunk.len());
        for (chunk_id, ids) in by_chunk {
            let path = self.chunk_path(chunk_id);
            let fields = self
                .store
                .get(&path)
                .await?
                .ok_or_else(|| GalleryError::not_found(format!("chunk {}", chunk_id)))?;
            let mut photos = array_field(&fields, "photos");
            for entry in photos.iter_mut() {
                let matches = value_id(entry).map(|id| ids.contains(&id)).unwrap_or(false);
                if matches {
                    if let Some(object) = entry.as_object_mut() {
                        object.insert("albumId".into(), json!(new_album_id));
                    }
                }
            }
            let mut update = Fields::new();
            update.insert("photos".into(), Value::Array(photos));
            writes.push(BatchWrite::Merge { path, fields: update });
        }

        tracing::info!(
            "bulk_reassign_album: {} photos across {} chunks -> {:?}",
            pairs.len(),
            writes.len(),
            new_album_id
        );
        self.store.commit(writes).await
    }

    /// Append a deletion-log entry. Callers treat failures as non-fatal.
    pub async fn append_deletion_log(&self, entry: &DeletionLogEntry) -> Result<(), GalleryError> {
        let record = encode(entry)?;
        self.store
            .array_union(&self.deletion_log_path(), "entries", vec![record])
            .await
    }
}
