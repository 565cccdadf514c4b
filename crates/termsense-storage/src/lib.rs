//! Document-store layer for thresholds and merchant tickets.
//!
//! Durability is delegated to an external document collaborator behind the
//! [`DocumentBackend`] trait (point read, write-with-merge, insert with an
//! assigned ID, update, list, and change notification). The typed
//! [`thresholds::ThresholdStore`] and [`tickets::TicketStore`] sit on top
//! and publish live updates through `tokio::sync::watch` channels. The
//! in-memory implementation ([`memory::MemoryBackend`]) backs tests and
//! degraded/demo operation.

pub mod error;
pub mod memory;
pub mod thresholds;
pub mod tickets;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use error::Result;
use serde_json::Value;
use tokio::sync::broadcast;

/// Tenant + user scope a store is keyed by. Each scope owns exactly one
/// thresholds document and one ticket collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub tenant_id: String,
    pub user_id: String,
}

impl Scope {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Path of a named config document within this scope.
    pub fn config_doc(&self, name: &str) -> String {
        format!(
            "tenants/{}/users/{}/config/{name}",
            self.tenant_id, self.user_id
        )
    }

    /// Path of a named collection within this scope.
    pub fn collection(&self, name: &str) -> String {
        format!("tenants/{}/users/{}/{name}", self.tenant_id, self.user_id)
    }
}

/// A change notification emitted by a backend after any successful write.
#[derive(Debug, Clone)]
pub struct DocChange {
    /// Full path of the document that changed.
    pub path: String,
}

/// Persistence backend for scoped documents.
///
/// Implementations must be safe to share across tasks (`Send + Sync`): the
/// stores, their subscription loops, and the reconciliation engine all hold
/// the same backend concurrently.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Point read of a single document. `Ok(None)` when absent.
    async fn read(&self, path: &str) -> Result<Option<Value>>;

    /// Point write with shallow merge: present fields overwrite, absent
    /// fields are preserved. Creates the document when missing.
    async fn merge(&self, path: &str, value: Value) -> Result<()>;

    /// Inserts a document into a collection and returns the assigned ID.
    async fn insert(&self, collection: &str, value: Value) -> Result<String>;

    /// Applies a shallow-merge patch to an existing collection document.
    ///
    /// # Errors
    ///
    /// [`error::StorageError::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    /// Lists all documents in a collection as `(id, value)` pairs, in no
    /// particular order.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>>;

    /// Subscribes to change notifications for all paths. Writers from any
    /// task (or process, for shared backends) are observed here.
    fn changes(&self) -> broadcast::Receiver<DocChange>;
}
