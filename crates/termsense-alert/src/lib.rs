//! Anomaly classifier for terminal metric snapshots.
//!
//! [`classify`] evaluates each snapshot against the built-in rules in a
//! fixed order (outage, then high error rate, then low volume) and stops at
//! the first match, so a snapshot contributes at most one alert. The whole
//! alert set is recomputed on every call; there is no hidden state.

pub mod rules;


use termsense_common::types::{Alert, Severity, TerminalSnapshot, Thresholds};

/// A single anomaly rule evaluated against one snapshot.
///
/// Implementations are held in a fixed, ordered list (see
/// [`rules::default_rules`]); earlier rules take precedence. A rule returns
/// `Some(Alert)` when its condition matches and `None` otherwise.
pub trait AnomalyRule: Send + Sync {
    /// Short identifier for logging (e.g. `"outage"`).
    fn id(&self) -> &str;

    /// The severity assigned to alerts produced by this rule.
    fn severity(&self) -> Severity;

    /// Evaluates the rule against one snapshot under the given thresholds.
    fn evaluate(&self, snapshot: &TerminalSnapshot, thresholds: &Thresholds) -> Option<Alert>;
}

/// Classifies a set of snapshots against the current thresholds.
///
/// Pure and total: an empty input yields an empty result, output preserves
/// input snapshot order, and the returned vector is the full replacement
/// alert set (never an incremental diff).
pub fn classify(snapshots: &[TerminalSnapshot], thresholds: &Thresholds) -> Vec<Alert> {
    classify_with(&rules::default_rules(), snapshots, thresholds)
}

/// [`classify`] with an explicit rule list. First matching rule wins.
pub fn classify_with(
    rules: &[Box<dyn AnomalyRule>],
    snapshots: &[TerminalSnapshot],
    thresholds: &Thresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for snapshot in snapshots {
        for rule in rules {
            if let Some(alert) = rule.evaluate(snapshot, thresholds) {
                alerts.push(alert);
                break;
            }
        }
    }
    alerts
}
