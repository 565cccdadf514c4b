//! Metric ingestion for the terminal fleet.
//!
//! A [`MetricSource`] implementation produces one [`TerminalSnapshot`] per
//! terminal on every reconciliation cycle. Production deployments put a real
//! telemetry feed behind the trait; [`simulator::SimulatedMetricSource`]
//! stands in for it in demos and tests.

pub mod simulator;

use anyhow::Result;
use async_trait::async_trait;
use termsense_common::types::TerminalSnapshot;

/// A source of terminal metric snapshots.
///
/// Called once per reconciliation cycle. Implementations must be
/// `Send + Sync`: fetches run on a spawned task so slow sources never block
/// the engine loop.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Returns fresh snapshots for a fleet of `count` terminals.
    ///
    /// Every returned snapshot is a complete observation; the engine
    /// replaces its previous fleet state wholesale, never merges.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying feed is unreachable. The engine
    /// treats any failure as an empty fleet for that cycle.
    async fn fetch(&self, count: usize) -> Result<Vec<TerminalSnapshot>>;
}
