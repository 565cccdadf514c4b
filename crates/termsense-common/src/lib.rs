//! Shared domain types for the TermSense terminal-monitoring core.
//!
//! Everything that crosses a crate boundary lives here: terminal metric
//! snapshots, anomaly thresholds, derived alerts, merchant tickets, and
//! the snowflake ID generator used for store-assigned identifiers.

pub mod id;
pub mod types;
