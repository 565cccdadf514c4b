use crate::AnomalyRule;
use termsense_common::types::{Alert, Connectivity, Severity, TerminalSnapshot, Thresholds};

/// Critical: zero transactions while offline is a complete service outage,
/// regardless of any configured thresholds.
pub struct OutageRule;

impl AnomalyRule for OutageRule {
    fn id(&self) -> &str {
        "outage"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn evaluate(&self, snapshot: &TerminalSnapshot, _thresholds: &Thresholds) -> Option<Alert> {
        if snapshot.transactions != 0 || snapshot.connectivity != Connectivity::Offline {
            return None;
        }

        Some(Alert {
            severity: Severity::Critical,
            terminal_id: snapshot.id.clone(),
            merchant_name: snapshot.merchant_name.clone(),
            message: "Complete service outage detected (0 transactions, Offline). \
                      Immediate proactive action required."
                .to_string(),
            source: snapshot.clone(),
        })
    }
}
