use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use termsense_draft::{DraftKind, DraftRequest, Drafter, GeminiProvider};
use termsense_metrics::simulator::SimulatedMetricSource;
use termsense_server::config::ServerConfig;
use termsense_server::engine::{EngineCommand, EngineState, EngineView, ReconciliationEngine};
use termsense_storage::memory::MemoryBackend;
use termsense_storage::thresholds::ThresholdStore;
use termsense_storage::tickets::{TicketFeed, TicketStore};
use termsense_storage::Scope;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    termsense_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("termsense=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = match ServerConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %config_path, error = %e, "Config not loaded, using defaults");
            ServerConfig::default()
        }
    };

    let scope = Scope::new(&config.scope.tenant_id, &config.scope.user_id);
    let backend = Arc::new(MemoryBackend::new());
    let thresholds = Arc::new(ThresholdStore::new(backend.clone(), &scope));
    let tickets = Arc::new(TicketStore::new(backend.clone(), &scope));
    let source = Arc::new(SimulatedMetricSource::new(Duration::from_millis(
        config.fetch_latency_ms,
    )));

    let drafter = build_drafter(&config)?;

    let (engine, handle) = ReconciliationEngine::new(
        source,
        tickets.clone(),
        thresholds.subscribe(),
        tickets.subscribe(),
        config.terminal_count,
        Duration::from_secs(config.refresh_interval_secs),
        Duration::from_secs(config.seed_grace_secs),
    );

    let threshold_task = tokio::spawn({
        let thresholds = thresholds.clone();
        async move { thresholds.run().await }
    });
    let ticket_task = tokio::spawn({
        let tickets = tickets.clone();
        async move { tickets.run().await }
    });
    let engine_task = tokio::spawn(engine.run());

    let mut view_rx = handle.subscribe();
    let log_task = tokio::spawn(async move {
        while view_rx.changed().await.is_ok() {
            let view = view_rx.borrow().clone();
            log_view(&view, drafter.as_deref()).await;
        }
    });

    signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    handle.send(EngineCommand::Shutdown).await;

    log_task.abort();
    engine_task.abort();
    ticket_task.abort();
    threshold_task.abort();
    Ok(())
}

fn build_drafter(config: &ServerConfig) -> Result<Option<Arc<dyn Drafter>>> {
    if !config.drafting.enabled {
        return Ok(None);
    }
    let Some(api_key) = config.drafting.resolve_api_key() else {
        tracing::warn!("Drafting enabled but no API key configured, disabling");
        return Ok(None);
    };
    let provider = GeminiProvider::new(
        api_key,
        config.drafting.model.clone(),
        config.drafting.base_url.clone(),
        config.drafting.timeout_secs,
    )?;
    Ok(Some(Arc::new(provider)))
}

/// Logs a reconciliation summary for every published view; for the highest
/// severity alert, asks the drafter for a root-cause assessment.
async fn log_view(view: &EngineView, drafter: Option<&dyn Drafter>) {
    if view.state == EngineState::Initializing {
        tracing::info!("Initializing, waiting for fleet and thresholds");
        return;
    }

    let tickets = match &view.tickets {
        TicketFeed::Ready(list) => format!("{}", list.len()),
        TicketFeed::Loading => "loading".to_string(),
        TicketFeed::Unavailable => "unavailable".to_string(),
    };
    tracing::info!(
        terminals = view.kpis.terminal_count,
        online = view.kpis.online_terminals,
        transactions = view.kpis.total_transactions,
        errors = view.kpis.total_errors,
        alerts = view.alerts.len(),
        active_alerts = view.kpis.active_alerts,
        pending_tickets = view.kpis.pending_tickets,
        tickets = %tickets,
        "Reconciliation pass"
    );

    for alert in &view.alerts {
        tracing::info!(
            severity = %alert.severity,
            terminal_id = %alert.terminal_id,
            merchant = %alert.merchant_name,
            "{}",
            alert.message
        );
    }

    let Some(drafter) = drafter else { return };
    let Some(worst) = view.alerts.iter().max_by_key(|a| a.severity) else {
        return;
    };
    let request = DraftRequest {
        kind: DraftKind::RootCause,
        alert: worst.clone(),
    };
    match drafter.draft(&request).await {
        Ok(text) => {
            tracing::info!(terminal_id = %worst.terminal_id, "RCA draft:\n{text}");
        }
        Err(e) => {
            tracing::warn!(error = %e, "RCA draft failed");
        }
    }
}
