use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use termsense_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Link quality reported by a terminal in its latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
    Lagging,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Online => write!(f, "Online"),
            Connectivity::Offline => write!(f, "Offline"),
            Connectivity::Lagging => write!(f, "Lagging"),
        }
    }
}

/// Derived status label attached to a snapshot by the metric source.
///
/// The renderer-facing text (`"Critical: Outage"` etc.) is produced by
/// `Display`; the core only ever matches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Operational,
    Outage,
    HighErrors,
    LowVolume,
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalStatus::Operational => write!(f, "Operational"),
            TerminalStatus::Outage => write!(f, "Critical: Outage"),
            TerminalStatus::HighErrors => write!(f, "Warning: High Errors"),
            TerminalStatus::LowVolume => write!(f, "Warning: Low Volume"),
        }
    }
}

/// One terminal's metrics at a point in time.
///
/// Snapshots are immutable once produced and replaced wholesale by the next
/// ingestion cycle; there is no partial merge across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    pub id: String,
    pub merchant_name: String,
    pub transactions: u64,
    pub errors: u64,
    /// Percentage, rounded to two decimals. See [`error_rate`].
    pub error_rate: f64,
    pub connectivity: Connectivity,
    pub status: TerminalStatus,
    pub last_update: DateTime<Utc>,
}

/// Error rate in percent, rounded to two decimals.
///
/// With zero transactions the rate is 100 if any errors were reported and
/// 0 otherwise.
///
/// # Examples
///
/// ```
/// use termsense_common::types::error_rate;
///
/// assert_eq!(error_rate(350, 100), 28.57);
/// assert_eq!(error_rate(0, 3), 100.0);
/// assert_eq!(error_rate(0, 0), 0.0);
/// ```
pub fn error_rate(transactions: u64, errors: u64) -> f64 {
    if transactions > 0 {
        let raw = errors as f64 / transactions as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    } else if errors > 0 {
        100.0
    } else {
        0.0
    }
}

/// Anomaly-detection thresholds. Exactly one active copy per scope,
/// created with defaults on first access and mutated only through an
/// explicit save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Warning fires when a terminal's error rate exceeds this percentage.
    #[serde(default = "default_error_rate_limit")]
    pub error_rate_limit: f64,
    /// Info fires when an online terminal's transactions fall below this.
    #[serde(default = "default_low_volume_limit")]
    pub low_volume_limit: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_rate_limit: default_error_rate_limit(),
            low_volume_limit: default_low_volume_limit(),
        }
    }
}

fn default_error_rate_limit() -> f64 {
    15.0
}

fn default_low_volume_limit() -> i64 {
    20
}

/// A derived, non-persisted classification result. The alert set is always
/// replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub terminal_id: String,
    pub merchant_name: String,
    pub message: String,
    /// The snapshot that produced this alert (read-only link).
    pub source: TerminalSnapshot,
}

/// Ticket lifecycle: `Pending -> Resolved`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Pending,
    Resolved,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Pending => write!(f, "Pending"),
            TicketStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

/// A unit of human follow-up tied to a terminal issue. The ticket store is
/// the sole authority; consumers hold read-only cached views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub terminal_id: String,
    pub merchant_name: String,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    /// Present only once the ticket is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Fleet-level indicators, recomputed from scratch on every reconciliation
/// pass (never incrementally maintained).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Kpis {
    pub total_transactions: u64,
    pub total_errors: u64,
    pub online_terminals: usize,
    pub terminal_count: usize,
    /// Critical + Warning alerts.
    pub active_alerts: usize,
    pub pending_tickets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_rounds_to_two_decimals() {
        assert_eq!(error_rate(350, 100), 28.57);
        assert_eq!(error_rate(3, 1), 33.33);
        assert_eq!(error_rate(100, 15), 15.0);
    }

    #[test]
    fn error_rate_zero_transactions() {
        assert_eq!(error_rate(0, 1), 100.0);
        assert_eq!(error_rate(0, 0), 0.0);
    }

    #[test]
    fn status_labels_match_display_contract() {
        assert_eq!(TerminalStatus::Outage.to_string(), "Critical: Outage");
        assert_eq!(TerminalStatus::HighErrors.to_string(), "Warning: High Errors");
        assert_eq!(TerminalStatus::Operational.to_string(), "Operational");
    }

    #[test]
    fn thresholds_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.error_rate_limit, 15.0);
        assert_eq!(t.low_volume_limit, 20);
    }

    #[test]
    fn thresholds_deserialize_partial_document() {
        let t: Thresholds = serde_json::from_str(r#"{"error_rate_limit": 30.0}"#).unwrap();
        assert_eq!(t.error_rate_limit, 30.0);
        assert_eq!(t.low_volume_limit, 20);
    }
}
