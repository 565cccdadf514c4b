//! The reconciliation engine.
//!
//! A single task owns all mutable state (fleet, thresholds, tickets, alerts)
//! and reconciles it whenever any input changes: the periodic metric fetch,
//! a threshold update, a ticket change, or an operator command. Consumers
//! observe the engine exclusively through the published [`EngineView`].

use crate::seed;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use termsense_common::types::{Alert, Connectivity, Kpis, Severity, TerminalSnapshot, Thresholds, TicketStatus};
use termsense_metrics::MetricSource;
use termsense_storage::tickets::{TicketFeed, TicketStore};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Operator commands accepted by the engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Trigger a metric fetch now. Ignored while a fetch is in flight.
    Refresh,
    /// Open a ticket by hand.
    CreateTicket {
        terminal_id: String,
        merchant_name: String,
        message: String,
    },
    /// Resolve a pending ticket.
    ResolveTicket { id: String },
    /// Stop the loop deterministically.
    Shutdown,
}

/// Engine lifecycle. `Ready` is entered once and held for process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Ready,
}

/// Everything a consumer can see, published atomically. Alerts always travel
/// with the thresholds they were computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView {
    pub state: EngineState,
    pub fleet: Vec<TerminalSnapshot>,
    pub alerts: Vec<Alert>,
    pub thresholds: Option<Thresholds>,
    pub tickets: TicketFeed,
    pub kpis: Kpis,
    pub last_updated: Option<DateTime<Utc>>,
}

impl EngineView {
    fn initial() -> Self {
        Self {
            state: EngineState::Initializing,
            fleet: Vec::new(),
            alerts: Vec::new(),
            thresholds: None,
            tickets: TicketFeed::Loading,
            kpis: Kpis::default(),
            last_updated: None,
        }
    }
}

/// Cloneable handle for sending commands and subscribing to views. Dropping
/// every handle shuts the engine down.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    view_rx: watch::Receiver<EngineView>,
}

impl EngineHandle {
    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.view_rx.clone()
    }

    pub async fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).await.is_err() {
            tracing::warn!("Engine command dropped, loop already stopped");
        }
    }
}

pub struct ReconciliationEngine {
    source: Arc<dyn MetricSource>,
    tickets: Arc<TicketStore>,
    terminal_count: usize,
    refresh_interval: Duration,
    seed_grace: Duration,

    thresholds_rx: watch::Receiver<Option<Thresholds>>,
    tickets_rx: watch::Receiver<TicketFeed>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    view_tx: watch::Sender<EngineView>,

    // Fetch results come back over a channel so a slow source never blocks
    // threshold or ticket delivery. At most one fetch is outstanding.
    fetch_tx: mpsc::Sender<Vec<TerminalSnapshot>>,
    fetch_rx: mpsc::Receiver<Vec<TerminalSnapshot>>,
    fetch_busy: bool,

    fleet: Vec<TerminalSnapshot>,
    fleet_loaded: bool,
    thresholds: Option<Thresholds>,
    ticket_feed: TicketFeed,
    last_updated: Option<DateTime<Utc>>,

    seed_deadline: Option<Instant>,
    seeded: bool,
}

impl ReconciliationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn MetricSource>,
        tickets: Arc<TicketStore>,
        thresholds_rx: watch::Receiver<Option<Thresholds>>,
        tickets_rx: watch::Receiver<TicketFeed>,
        terminal_count: usize,
        refresh_interval: Duration,
        seed_grace: Duration,
    ) -> (Self, EngineHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (view_tx, view_rx) = watch::channel(EngineView::initial());
        let (fetch_tx, fetch_rx) = mpsc::channel(1);

        let engine = Self {
            source,
            tickets,
            terminal_count,
            refresh_interval,
            seed_grace,
            thresholds_rx,
            tickets_rx,
            cmd_rx,
            view_tx,
            fetch_tx,
            fetch_rx,
            fetch_busy: false,
            fleet: Vec::new(),
            fleet_loaded: false,
            thresholds: None,
            ticket_feed: TicketFeed::Loading,
            last_updated: None,
            seed_deadline: None,
            seeded: false,
        };
        (engine, EngineHandle { cmd_tx, view_rx })
    }

    /// Drives the engine until `Shutdown` or the last handle is dropped.
    /// No event is processed after teardown begins.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            terminal_count = self.terminal_count,
            refresh_interval_secs = self.refresh_interval.as_secs(),
            "Reconciliation engine started"
        );

        loop {
            let seed_at = self.seed_deadline;
            tokio::select! {
                _ = ticker.tick() => {
                    self.start_fetch();
                }
                Some(fleet) = self.fetch_rx.recv() => {
                    self.fetch_busy = false;
                    self.apply_fleet(fleet);
                }
                changed = self.thresholds_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Threshold feed closed, stopping engine");
                        break;
                    }
                    self.thresholds = *self.thresholds_rx.borrow_and_update();
                    tracing::info!(thresholds = ?self.thresholds, "Thresholds updated");
                    self.publish();
                }
                changed = self.tickets_rx.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Ticket feed closed, stopping engine");
                        break;
                    }
                    let feed = self.tickets_rx.borrow_and_update().clone();
                    self.apply_ticket_feed(feed);
                }
                _ = tokio::time::sleep_until(seed_at.unwrap_or_else(Instant::now)),
                        if seed_at.is_some() => {
                    self.seed_deadline = None;
                    self.maybe_seed_ticket().await;
                }
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(EngineCommand::Refresh) => {
                            if self.fetch_busy {
                                tracing::debug!("Manual refresh ignored, fetch in flight");
                            } else {
                                self.start_fetch();
                            }
                        }
                        Some(EngineCommand::CreateTicket { terminal_id, merchant_name, message }) => {
                            if let Err(e) = self
                                .tickets
                                .create(&terminal_id, &merchant_name, &message)
                                .await
                            {
                                tracing::error!(error = %e, terminal_id, "Failed to create ticket");
                            }
                        }
                        Some(EngineCommand::ResolveTicket { id }) => {
                            if let Err(e) = self.tickets.resolve(&id).await {
                                tracing::error!(error = %e, ticket_id = %id, "Failed to resolve ticket");
                            }
                        }
                        Some(EngineCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        tracing::info!("Reconciliation engine stopped");
    }

    /// Spawns a metric fetch unless one is already outstanding. Failures and
    /// malformed output degrade to an empty fleet for the cycle.
    fn start_fetch(&mut self) {
        if self.fetch_busy {
            return;
        }
        self.fetch_busy = true;

        let source = self.source.clone();
        let count = self.terminal_count;
        let results = self.fetch_tx.clone();
        tokio::spawn(async move {
            let fleet = match source.fetch(count).await {
                Ok(fleet) => fleet,
                Err(e) => {
                    tracing::warn!(error = %e, "Metric fetch failed, treating as empty fleet");
                    Vec::new()
                }
            };
            let _ = results.send(fleet).await;
        });
    }

    fn apply_fleet(&mut self, fleet: Vec<TerminalSnapshot>) {
        tracing::debug!(terminals = fleet.len(), "Fleet snapshot received");
        self.fleet = fleet;
        self.fleet_loaded = true;
        self.last_updated = Some(Utc::now());
        self.publish();
    }

    fn apply_ticket_feed(&mut self, feed: TicketFeed) {
        // First non-loading delivery arms the one-shot seed grace timer.
        if self.ticket_feed == TicketFeed::Loading
            && feed != TicketFeed::Loading
            && !self.seeded
            && self.seed_deadline.is_none()
        {
            self.seed_deadline = Some(Instant::now() + self.seed_grace);
        }
        self.ticket_feed = feed;
        self.publish();
    }

    /// Seeds one starter ticket if the collection is still empty once the
    /// grace period has elapsed. The store is re-read at fire time so a
    /// ticket created during the grace window suppresses the seed. At most
    /// one seed per engine run.
    async fn maybe_seed_ticket(&mut self) {
        if self.seeded {
            return;
        }
        self.seeded = true;

        match self.tickets.list().await {
            Ok(existing) if existing.is_empty() => {}
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping ticket seed, store unreachable");
                return;
            }
        }

        let Some(seed) = seed::pick(&self.fleet) else {
            tracing::debug!("No eligible terminal to seed a ticket against");
            return;
        };
        match self
            .tickets
            .create(&seed.terminal_id, &seed.merchant_name, &seed.message)
            .await
        {
            Ok(ticket) => {
                tracing::info!(ticket_id = %ticket.id, terminal_id = %ticket.terminal_id, "Seeded starter ticket");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to seed starter ticket");
            }
        }
    }

    /// Recomputes alerts and KPIs from current state and publishes the view.
    /// Classification waits until both the fleet and the thresholds have
    /// loaded; a placeholder threshold set never produces alerts.
    fn publish(&mut self) {
        let alerts = match (self.fleet_loaded, self.thresholds) {
            (true, Some(thresholds)) => termsense_alert::classify(&self.fleet, &thresholds),
            _ => Vec::new(),
        };

        let state = if self.fleet_loaded && self.thresholds.is_some() {
            EngineState::Ready
        } else {
            EngineState::Initializing
        };

        let kpis = compute_kpis(&self.fleet, &alerts, &self.ticket_feed);

        let view = EngineView {
            state,
            fleet: self.fleet.clone(),
            alerts,
            thresholds: self.thresholds,
            tickets: self.ticket_feed.clone(),
            kpis,
            last_updated: self.last_updated,
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

/// Fleet-level indicators, recomputed from scratch on every pass.
fn compute_kpis(fleet: &[TerminalSnapshot], alerts: &[Alert], tickets: &TicketFeed) -> Kpis {
    let pending_tickets = match tickets {
        TicketFeed::Ready(list) => list
            .iter()
            .filter(|t| t.status == TicketStatus::Pending)
            .count(),
        _ => 0,
    };

    Kpis {
        total_transactions: fleet.iter().map(|t| t.transactions).sum(),
        total_errors: fleet.iter().map(|t| t.errors).sum(),
        online_terminals: fleet
            .iter()
            .filter(|t| t.connectivity == Connectivity::Online)
            .count(),
        terminal_count: fleet.len(),
        active_alerts: alerts
            .iter()
            .filter(|a| a.severity >= Severity::Warning)
            .count(),
        pending_tickets,
    }
}
