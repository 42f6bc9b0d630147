use crate::error::GalleryError;
use crate::store::document::{BatchWrite, DocumentStore, Fields};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory [`DocumentStore`]. Plays the role an in-memory SQLite
/// connection plays elsewhere: the backend for tests and local tooling.
///
/// `set_offline(true)` makes every call fail with `RemoteUnavailable`, so
/// callers can exercise their failure paths. `commits()` counts batched
/// round trips, so tests can assert an operation stayed within one.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Fields>>,
    offline: AtomicBool,
    commit_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of batched `commit` round trips served so far.
    pub fn commits(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), GalleryError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(GalleryError::RemoteUnavailable(
                "document store offline".into(),
            ))
        } else {
            Ok(())
        }
    }

    fn apply(docs: &mut HashMap<String, Fields>, write: BatchWrite) {
        match write {
            BatchWrite::Set { path, fields } => {
                docs.insert(path, fields);
            }
            BatchWrite::Merge { path, fields } => {
                let doc = docs.entry(path).or_default();
                for (key, value) in fields {
                    doc.insert(key, value);
                }
            }
            BatchWrite::Delete { path } => {
                docs.remove(&path);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Fields>, GalleryError> {
        self.check_online()?;
        Ok(self.docs.lock().unwrap().get(path).cloned())
    }

    async fn set(&self, path: &str, fields: Fields) -> Result<(), GalleryError> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        Self::apply(
            &mut docs,
            BatchWrite::Set {
                path: path.to_string(),
                fields,
            },
        );
        Ok(())
    }

    async fn merge(&self, path: &str, fields: Fields) -> Result<(), GalleryError> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        Self::apply(
            &mut docs,
            BatchWrite::Merge {
                path: path.to_string(),
                fields,
            },
        );
        Ok(())
    }

    async fn array_union(
        &self,
        path: &str,
        field: &str,
        values: Vec<serde_json::Value>,
    ) -> Result<(), GalleryError> {
        self.check_online()?;
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.entry(path.to_string()).or_default();
        let entry = doc
            .entry(field.to_string())
            .or_insert_with(|| serde_json::Value::Array(vec![]));
        let arr = match entry.as_array_mut() {
            Some(arr) => arr,
            None => {
                return Err(GalleryError::RemoteUnavailable(format!(
                    "field {} of {} is not an array",
                    field, path
                )))
            }
        };
        for value in values {
            if !arr.contains(&value) {
                arr.push(value);
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), GalleryError> {
        self.check_online()?;
        self.docs.lock().unwrap().remove(path);
        Ok(())
    }

    async fn commit(&self, writes: Vec<BatchWrite>) -> Result<(), GalleryError> {
        self.check_online()?;
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        for write in writes {
            Self::apply(&mut docs, write);
        }
        Ok(())
    }
}
