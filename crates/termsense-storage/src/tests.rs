use crate::error::StorageError;
use crate::memory::MemoryBackend;
use crate::thresholds::ThresholdStore;
use crate::tickets::{TicketFeed, TicketStore};
use crate::{DocumentBackend, Scope};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use termsense_common::types::{Thresholds, TicketStatus};

fn setup() -> (Arc<MemoryBackend>, Scope) {
    termsense_common::id::init(1, 1);
    (Arc::new(MemoryBackend::new()), Scope::new("acme", "ops-1"))
}

#[tokio::test]
async fn get_initializes_defaults_once() {
    let (backend, scope) = setup();
    let store = ThresholdStore::new(backend.clone(), &scope);

    let first = store.get().await.unwrap();
    let second = store.get().await.unwrap();

    assert_eq!(first, Thresholds::default());
    assert_eq!(second, Thresholds::default());
    assert_eq!(backend.doc_count(), 1, "exactly one persisted default doc");
}

#[tokio::test]
async fn concurrent_first_reads_leave_one_document() {
    let (backend, scope) = setup();
    let store_a = ThresholdStore::new(backend.clone(), &scope);
    let store_b = ThresholdStore::new(backend.clone(), &scope);

    let (a, b) = tokio::join!(store_a.get(), store_b.get());
    assert_eq!(a.unwrap(), Thresholds::default());
    assert_eq!(b.unwrap(), Thresholds::default());
    assert_eq!(backend.doc_count(), 1);
}

#[tokio::test]
async fn set_rejects_negative_limits_without_writing() {
    let (backend, scope) = setup();
    let store = ThresholdStore::new(backend.clone(), &scope);

    let err = store
        .set(Thresholds {
            error_rate_limit: -1.0,
            low_volume_limit: 20,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));

    let err = store
        .set(Thresholds {
            error_rate_limit: 15.0,
            low_volume_limit: -5,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));

    assert_eq!(backend.doc_count(), 0, "no partial writes on rejection");
}

#[tokio::test]
async fn set_persists_and_notifies_subscribers() {
    let (backend, scope) = setup();
    let store = Arc::new(ThresholdStore::new(backend.clone(), &scope));
    let mut rx = store.subscribe();

    let runner = {
        let store = store.clone();
        tokio::spawn(async move { store.run().await })
    };

    // Initial load publishes the persisted defaults.
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(Thresholds::default()));

    let next = Thresholds {
        error_rate_limit: 30.0,
        low_volume_limit: 5,
    };
    store.set(next).await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(next));
    assert_eq!(store.get().await.unwrap(), next);

    runner.abort();
}

#[tokio::test]
async fn subscriber_observes_writes_from_other_writers() {
    let (backend, scope) = setup();
    let store = Arc::new(ThresholdStore::new(backend.clone(), &scope));
    let other_writer = ThresholdStore::new(backend.clone(), &scope);
    let mut rx = store.subscribe();

    let runner = {
        let store = store.clone();
        tokio::spawn(async move { store.run().await })
    };
    rx.changed().await.unwrap();

    let next = Thresholds {
        error_rate_limit: 42.0,
        low_volume_limit: 3,
    };
    other_writer.set(next).await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(next));

    runner.abort();
}

#[tokio::test]
async fn threshold_fallback_when_backend_unreachable() {
    let (backend, scope) = setup();
    backend.set_available(false);
    let store = Arc::new(ThresholdStore::new(backend.clone(), &scope));
    let mut rx = store.subscribe();

    let runner = {
        let store = store.clone();
        tokio::spawn(async move { store.run().await })
    };

    // Degraded: in-memory defaults are published instead of an error.
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(Thresholds::default()));

    runner.abort();
}

#[tokio::test]
async fn create_assigns_id_and_pending_status() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);

    let ticket = store
        .create("T1003", "Merchant A4", "Card reader is slow.")
        .await
        .unwrap();

    assert!(!ticket.id.is_empty());
    assert_eq!(ticket.status, TicketStatus::Pending);
    assert!(ticket.resolved_at.is_none());

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, ticket.id);
}

#[tokio::test]
async fn list_orders_pending_first_then_newest() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);
    let collection = scope.collection("merchant_tickets");

    // Insert directly so created_at is controlled: a resolved ticket newer
    // than a pending one must still sort after it.
    let t0 = Utc::now() - Duration::minutes(10);
    let t1 = Utc::now() - Duration::minutes(1);
    backend
        .insert(
            &collection,
            json!({
                "id": "",
                "terminal_id": "T1001",
                "merchant_name": "Merchant A2",
                "message": "resolved later",
                "status": "Resolved",
                "created_at": t1,
                "resolved_at": Utc::now(),
            }),
        )
        .await
        .unwrap();
    backend
        .insert(
            &collection,
            json!({
                "id": "",
                "terminal_id": "T1002",
                "merchant_name": "Merchant A3",
                "message": "still open",
                "status": "Pending",
                "created_at": t0,
            }),
        )
        .await
        .unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].status, TicketStatus::Pending);
    assert_eq!(listed[0].created_at, t0);
    assert_eq!(listed[1].status, TicketStatus::Resolved);
}

#[tokio::test]
async fn pending_tickets_sort_newest_first() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);

    let older = store.create("T1001", "Merchant A2", "first").await.unwrap();
    let newer = store.create("T1002", "Merchant A3", "second").await.unwrap();

    let listed = store.list().await.unwrap();
    // create() stamps created_at with now(); the second create is newer.
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
}

#[tokio::test]
async fn resolve_unknown_ticket_is_not_found() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);
    store.create("T1001", "Merchant A2", "open").await.unwrap();
    let before = store.list().await.unwrap();

    let err = store.resolve("no-such-ticket").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::NotFound { entity: "ticket", .. }
    ));

    // The failed resolve left the list unchanged.
    assert_eq!(store.list().await.unwrap(), before);
}

#[tokio::test]
async fn resolve_is_idempotent() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);

    let ticket = store.create("T1001", "Merchant A2", "open").await.unwrap();
    store.resolve(&ticket.id).await.unwrap();

    let first = store.list().await.unwrap()[0].clone();
    assert_eq!(first.status, TicketStatus::Resolved);
    let resolved_at = first.resolved_at.expect("resolved_at stamped");

    // Second resolve: no error, no rewrite of resolved_at.
    store.resolve(&ticket.id).await.unwrap();
    let second = store.list().await.unwrap()[0].clone();
    assert_eq!(second.resolved_at, Some(resolved_at));
}

#[tokio::test]
async fn subscription_delivers_sorted_list_on_every_change() {
    let (backend, scope) = setup();
    let store = Arc::new(TicketStore::new(backend.clone(), &scope));
    let mut rx = store.subscribe();
    assert_eq!(*rx.borrow(), TicketFeed::Loading);

    let runner = {
        let store = store.clone();
        tokio::spawn(async move { store.run().await })
    };

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), TicketFeed::Ready(Vec::new()));

    let ticket = store.create("T1001", "Merchant A2", "open").await.unwrap();
    rx.changed().await.unwrap();
    match rx.borrow().clone() {
        TicketFeed::Ready(tickets) => {
            assert_eq!(tickets.len(), 1);
            assert_eq!(tickets[0].id, ticket.id);
        }
        other => panic!("expected Ready, got {other:?}"),
    }

    store.resolve(&ticket.id).await.unwrap();
    rx.changed().await.unwrap();
    match rx.borrow().clone() {
        TicketFeed::Ready(tickets) => {
            assert_eq!(tickets[0].status, TicketStatus::Resolved);
        }
        other => panic!("expected Ready, got {other:?}"),
    }

    runner.abort();
}

#[tokio::test]
async fn ticket_operations_fail_when_backend_unreachable() {
    let (backend, scope) = setup();
    let store = TicketStore::new(backend.clone(), &scope);
    backend.set_available(false);

    let err = store
        .create("T1001", "Merchant A2", "open")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
}

#[tokio::test]
async fn merge_preserves_untouched_fields() {
    let (backend, _) = setup();

    backend
        .merge("tenants/acme/users/u/config/anomaly_thresholds", json!({
            "error_rate_limit": 25.0,
            "low_volume_limit": 10,
        }))
        .await
        .unwrap();
    backend
        .merge(
            "tenants/acme/users/u/config/anomaly_thresholds",
            json!({ "error_rate_limit": 40.0 }),
        )
        .await
        .unwrap();

    let doc = backend
        .read("tenants/acme/users/u/config/anomaly_thresholds")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["error_rate_limit"], 40.0);
    assert_eq!(doc["low_volume_limit"], 10);
}
