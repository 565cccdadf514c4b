use crate::error::{Result, StorageError};
use crate::{DocumentBackend, Scope};
use std::sync::Arc;
use termsense_common::types::Thresholds;
use tokio::sync::{broadcast, watch};

/// Name of the per-scope thresholds document.
const THRESHOLDS_DOC: &str = "anomaly_thresholds";

/// Typed access to the single anomaly-thresholds document of one scope.
///
/// Subscribers receive `None` until the document has been loaded once (so
/// consumers never classify against a placeholder), then `Some` with the
/// current value on every successful [`set`](Self::set) from any writer
/// sharing the backend.
pub struct ThresholdStore {
    backend: Arc<dyn DocumentBackend>,
    doc_path: String,
    tx: watch::Sender<Option<Thresholds>>,
}

impl ThresholdStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, scope: &Scope) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            backend,
            doc_path: scope.config_doc(THRESHOLDS_DOC),
            tx,
        }
    }

    /// Returns the current thresholds.
    ///
    /// If no document exists yet, persists the default and returns it.
    /// Idempotent under concurrent callers: a duplicate default write is a
    /// harmless last-write-wins on the same document.
    pub async fn get(&self) -> Result<Thresholds> {
        match self.backend.read(&self.doc_path).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => {
                let defaults = Thresholds::default();
                self.backend
                    .merge(&self.doc_path, serde_json::to_value(defaults)?)
                    .await?;
                tracing::info!(doc = %self.doc_path, "Initialized default thresholds");
                Ok(defaults)
            }
        }
    }

    /// Validates a thresholds value without writing anything.
    pub fn validate(next: &Thresholds) -> Result<()> {
        if !next.error_rate_limit.is_finite() || next.error_rate_limit < 0.0 {
            return Err(StorageError::Validation(format!(
                "error_rate_limit must be a non-negative number, got {}",
                next.error_rate_limit
            )));
        }
        if next.low_volume_limit < 0 {
            return Err(StorageError::Validation(format!(
                "low_volume_limit must be non-negative, got {}",
                next.low_volume_limit
            )));
        }
        Ok(())
    }

    /// Persists new thresholds and publishes them to all subscribers.
    ///
    /// # Errors
    ///
    /// [`StorageError::Validation`] on out-of-range input; nothing is
    /// written in that case.
    pub async fn set(&self, next: Thresholds) -> Result<()> {
        Self::validate(&next)?;
        self.backend
            .merge(&self.doc_path, serde_json::to_value(next)?)
            .await?;
        self.publish(next);
        Ok(())
    }

    /// Registers a live subscriber. The receiver observes the current value
    /// immediately (`None` while still loading) and every later change.
    /// Dropping the receiver unsubscribes without affecting others.
    pub fn subscribe(&self) -> watch::Receiver<Option<Thresholds>> {
        self.tx.subscribe()
    }

    fn publish(&self, value: Thresholds) {
        self.tx.send_if_modified(|current| {
            if *current == Some(value) {
                false
            } else {
                *current = Some(value);
                true
            }
        });
    }

    /// Loads the initial value and forwards backend change notifications to
    /// subscribers. Runs until the task driving it is cancelled; if the
    /// backend is unreachable, falls back to in-memory defaults.
    pub async fn run(&self) {
        let mut changes = self.backend.changes();

        match self.get().await {
            Ok(current) => self.publish(current),
            Err(e) => {
                tracing::warn!(error = %e, "Thresholds unavailable, using in-memory defaults");
                self.publish(Thresholds::default());
            }
        }

        loop {
            match changes.recv().await {
                Ok(change) if change.path == self.doc_path => self.reload().await,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Threshold change stream lagged, re-reading");
                    self.reload().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn reload(&self) {
        match self.get().await {
            Ok(current) => self.publish(current),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to re-read thresholds after change");
            }
        }
    }
}
