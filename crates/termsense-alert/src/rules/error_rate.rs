use crate::AnomalyRule;
use termsense_common::types::{Alert, Severity, TerminalSnapshot, Thresholds};

/// Warning: the observed error rate exceeds the configured limit.
///
/// Evaluated after [`crate::rules::OutageRule`], so a dead terminal whose
/// residual errors push the rate to 100% still reports as an outage, not a
/// high error rate.
pub struct HighErrorRateRule;

impl AnomalyRule for HighErrorRateRule {
    fn id(&self) -> &str {
        "high_error_rate"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn evaluate(&self, snapshot: &TerminalSnapshot, thresholds: &Thresholds) -> Option<Alert> {
        if snapshot.error_rate <= thresholds.error_rate_limit {
            return None;
        }

        Some(Alert {
            severity: Severity::Warning,
            terminal_id: snapshot.id.clone(),
            merchant_name: snapshot.merchant_name.clone(),
            message: format!(
                "Abnormally high error rate ({}%) detected. Exceeds limit of {}%.",
                snapshot.error_rate, thresholds.error_rate_limit,
            ),
            source: snapshot.clone(),
        })
    }
}
