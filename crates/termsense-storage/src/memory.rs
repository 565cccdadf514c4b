use crate::error::{Result, StorageError};
use crate::{DocChange, DocumentBackend};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// In-memory [`DocumentBackend`].
///
/// Keeps every document in a path-keyed map and broadcasts a [`DocChange`]
/// after each successful write, which is what the cloud collaborator's
/// live-subscription feature degrades to in-process. The availability
/// toggle lets tests and demos exercise the `StoreUnavailable` paths.
pub struct MemoryBackend {
    docs: RwLock<BTreeMap<String, Value>>,
    change_tx: broadcast::Sender<DocChange>,
    available: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(64);
        Self {
            docs: RwLock::new(BTreeMap::new()),
            change_tx,
            available: AtomicBool::new(true),
        }
    }

    /// Marks the backend reachable or unreachable. While unreachable every
    /// operation fails with [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored documents, across all collections.
    pub fn doc_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable(
                "memory backend marked unreachable".to_string(),
            ))
        }
    }

    fn notify(&self, path: &str) {
        // No receivers is fine; changes are only interesting to subscribers.
        let _ = self.change_tx.send(DocChange {
            path: path.to_string(),
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow merge: top-level fields of `patch` overwrite `target`.
fn merge_into(target: &mut Value, patch: Value) {
    match (target.as_object_mut(), patch) {
        (Some(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                target_map.insert(key, value);
            }
        }
        (_, patch) => *target = patch,
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        self.check_available()?;
        Ok(self.docs.read().unwrap().get(path).cloned())
    }

    async fn merge(&self, path: &str, value: Value) -> Result<()> {
        self.check_available()?;
        {
            let mut docs = self.docs.write().unwrap();
            match docs.get_mut(path) {
                Some(existing) => merge_into(existing, value),
                None => {
                    docs.insert(path.to_string(), value);
                }
            }
        }
        self.notify(path);
        Ok(())
    }

    async fn insert(&self, collection: &str, value: Value) -> Result<String> {
        self.check_available()?;
        let id = termsense_common::id::next_id();
        let path = format!("{collection}/{id}");
        self.docs.write().unwrap().insert(path.clone(), value);
        self.notify(&path);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        self.check_available()?;
        let path = format!("{collection}/{id}");
        {
            let mut docs = self.docs.write().unwrap();
            let existing = docs.get_mut(&path).ok_or_else(|| StorageError::NotFound {
                entity: "document",
                id: id.to_string(),
            })?;
            merge_into(existing, patch);
        }
        self.notify(&path);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        self.check_available()?;
        let prefix = format!("{collection}/");
        let docs = self.docs.read().unwrap();
        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, value)| (path[prefix.len()..].to_string(), value.clone()))
            .collect())
    }

    fn changes(&self) -> broadcast::Receiver<DocChange> {
        self.change_tx.subscribe()
    }
}
