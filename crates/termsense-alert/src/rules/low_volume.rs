use crate::AnomalyRule;
use termsense_common::types::{Alert, Connectivity, Severity, TerminalSnapshot, Thresholds};

/// Info: an online terminal is processing fewer sales than the configured
/// floor. Requires at least one transaction so a fresh outage does not also
/// read as low volume.
pub struct LowVolumeRule;

impl AnomalyRule for LowVolumeRule {
    fn id(&self) -> &str {
        "low_volume"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn evaluate(&self, snapshot: &TerminalSnapshot, thresholds: &Thresholds) -> Option<Alert> {
        let below_floor = (snapshot.transactions as i64) < thresholds.low_volume_limit;
        if !below_floor
            || snapshot.connectivity != Connectivity::Online
            || snapshot.transactions == 0
        {
            return None;
        }

        Some(Alert {
            severity: Severity::Info,
            terminal_id: snapshot.id.clone(),
            merchant_name: snapshot.merchant_name.clone(),
            message: format!(
                "Unusually low transaction volume ({} sales). Below threshold of {}.",
                snapshot.transactions, thresholds.low_volume_limit,
            ),
            source: snapshot.clone(),
        })
    }
}
