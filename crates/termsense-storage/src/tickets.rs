use crate::error::{Result, StorageError};
use crate::{DocumentBackend, Scope};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use termsense_common::types::{Ticket, TicketStatus};
use tokio::sync::{broadcast, watch};

/// Name of the per-scope ticket collection.
const TICKETS_COLLECTION: &str = "merchant_tickets";

/// What ticket subscribers currently see.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketFeed {
    /// Initial load has not completed yet.
    Loading,
    /// The full, sorted ticket list as of the latest change.
    Ready(Vec<Ticket>),
    /// The backing collaborator is unreachable; tickets cannot be served.
    Unavailable,
}

/// Sorts tickets into the delivery order presentation depends on:
/// `Pending` before `Resolved`, then newest first. This ordering is a hard
/// contract of [`TicketStore::subscribe`].
pub fn sort_tickets(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| {
        let rank = |t: &Ticket| match t.status {
            TicketStatus::Pending => 0,
            TicketStatus::Resolved => 1,
        };
        rank(a)
            .cmp(&rank(b))
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// Typed access to one scope's merchant-ticket collection.
///
/// The store is the sole authority over ticket state; every consumer holds
/// a read-only view refreshed through [`subscribe`](Self::subscribe).
pub struct TicketStore {
    backend: Arc<dyn DocumentBackend>,
    collection: String,
    tx: watch::Sender<TicketFeed>,
}

impl TicketStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, scope: &Scope) -> Self {
        let (tx, _) = watch::channel(TicketFeed::Loading);
        Self {
            backend,
            collection: scope.collection(TICKETS_COLLECTION),
            tx,
        }
    }

    /// Opens a new `Pending` ticket and returns it with its assigned ID.
    pub async fn create(
        &self,
        terminal_id: &str,
        merchant_name: &str,
        message: &str,
    ) -> Result<Ticket> {
        let mut ticket = Ticket {
            id: String::new(),
            terminal_id: terminal_id.to_string(),
            merchant_name: merchant_name.to_string(),
            message: message.to_string(),
            status: TicketStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };

        let assigned = self
            .backend
            .insert(&self.collection, serde_json::to_value(&ticket)?)
            .await?;
        ticket.id = assigned;

        tracing::info!(
            ticket_id = %ticket.id,
            terminal_id = %ticket.terminal_id,
            "Ticket created"
        );
        self.refresh().await;
        Ok(ticket)
    }

    /// Transitions a ticket `Pending -> Resolved`, stamping `resolved_at`.
    ///
    /// Resolving an already-resolved ticket is an idempotent no-op, so the
    /// store does not depend on caller-side gating.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the ticket ID is unknown.
    pub async fn resolve(&self, ticket_id: &str) -> Result<()> {
        let path = format!("{}/{ticket_id}", self.collection);
        let doc = self
            .backend
            .read(&path)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "ticket",
                id: ticket_id.to_string(),
            })?;

        let ticket: Ticket = from_doc(ticket_id, doc)?;
        if ticket.status == TicketStatus::Resolved {
            return Ok(());
        }

        self.backend
            .update(
                &self.collection,
                ticket_id,
                json!({
                    "status": TicketStatus::Resolved,
                    "resolved_at": Utc::now(),
                }),
            )
            .await?;

        tracing::info!(ticket_id, "Ticket resolved");
        self.refresh().await;
        Ok(())
    }

    /// Reads the full ticket list from the backend, sorted per the
    /// subscription contract.
    pub async fn list(&self) -> Result<Vec<Ticket>> {
        let docs = self.backend.list(&self.collection).await?;
        let mut tickets = docs
            .into_iter()
            .map(|(id, doc)| from_doc(&id, doc))
            .collect::<Result<Vec<_>>>()?;
        sort_tickets(&mut tickets);
        Ok(tickets)
    }

    /// Registers a live subscriber. Every create/resolve (from any writer
    /// sharing the backend) delivers the full sorted list; dropping the
    /// receiver unsubscribes without affecting others.
    pub fn subscribe(&self) -> watch::Receiver<TicketFeed> {
        self.tx.subscribe()
    }

    /// Loads the initial list and forwards backend change notifications to
    /// subscribers. Runs until the task driving it is cancelled.
    pub async fn run(&self) {
        let mut changes = self.backend.changes();
        let prefix = format!("{}/", self.collection);

        self.refresh().await;

        loop {
            match changes.recv().await {
                Ok(change) if change.path.starts_with(&prefix) => self.refresh().await,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Ticket change stream lagged, re-reading");
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn refresh(&self) {
        let feed = match self.list().await {
            Ok(tickets) => TicketFeed::Ready(tickets),
            Err(e) => {
                tracing::warn!(error = %e, "Ticket list unavailable");
                TicketFeed::Unavailable
            }
        };
        self.tx.send_if_modified(|current| {
            if *current == feed {
                false
            } else {
                *current = feed;
                true
            }
        });
    }
}

/// Decodes a collection document into a [`Ticket`], overriding the embedded
/// ID with the authoritative collection key.
fn from_doc(id: &str, doc: serde_json::Value) -> Result<Ticket> {
    let mut ticket: Ticket = serde_json::from_value(doc)?;
    ticket.id = id.to_string();
    Ok(ticket)
}
