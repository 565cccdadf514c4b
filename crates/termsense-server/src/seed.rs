//! Starter-ticket synthesis for empty ticket collections.

use rand::seq::SliceRandom;
use rand::Rng;
use termsense_common::types::{TerminalSnapshot, TerminalStatus};

/// A ticket ready to be created: terminal, merchant, complaint text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTicket {
    pub terminal_id: String,
    pub merchant_name: String,
    pub message: String,
}

/// Picks a random non-outage terminal and writes one of the canned merchant
/// complaints against it. Returns `None` when the fleet is empty or every
/// terminal is in outage (a ticket against a dead terminal would be noise).
pub fn pick(fleet: &[TerminalSnapshot]) -> Option<SeedTicket> {
    let candidates: Vec<&TerminalSnapshot> = fleet
        .iter()
        .filter(|t| t.status != TerminalStatus::Outage)
        .collect();
    let target = candidates.choose(&mut rand::thread_rng())?;

    let messages = [
        format!(
            "My payment machine {} keeps freezing during transactions. \
             We've had 5 failures in the last hour.",
            target.id
        ),
        format!(
            "The card reader at Merchant {} is slow. \
             Customers are complaining about the delay in processing.",
            target.merchant_name
        ),
        format!(
            "I rebooted Terminal {} but it's still showing connection issues. \
             Please help ASAP.",
            target.id
        ),
        "I received an email about high error rates on my terminal. \
         I need a technician to call me."
            .to_string(),
    ];
    let idx = rand::thread_rng().gen_range(0..messages.len());

    Some(SeedTicket {
        terminal_id: target.id.clone(),
        merchant_name: target.merchant_name.clone(),
        message: messages[idx].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use termsense_common::types::{error_rate, Connectivity};

    fn snapshot(id: &str, status: TerminalStatus) -> TerminalSnapshot {
        let (transactions, errors) = match status {
            TerminalStatus::Outage => (0, 0),
            _ => (200, 4),
        };
        TerminalSnapshot {
            id: id.to_string(),
            merchant_name: format!("Merchant {id}"),
            transactions,
            errors,
            error_rate: error_rate(transactions, errors),
            connectivity: if status == TerminalStatus::Outage {
                Connectivity::Offline
            } else {
                Connectivity::Online
            },
            status,
            last_update: Utc::now(),
        }
    }

    #[test]
    fn never_targets_an_outage_terminal() {
        let fleet = vec![
            snapshot("T1000", TerminalStatus::Outage),
            snapshot("T1001", TerminalStatus::Operational),
        ];
        for _ in 0..50 {
            let seed = pick(&fleet).unwrap();
            assert_eq!(seed.terminal_id, "T1001");
        }
    }

    #[test]
    fn empty_or_all_outage_fleet_yields_nothing() {
        assert_eq!(pick(&[]), None);
        let fleet = vec![snapshot("T1000", TerminalStatus::Outage)];
        assert_eq!(pick(&fleet), None);
    }

    #[test]
    fn message_references_the_chosen_terminal_or_merchant() {
        let fleet = vec![snapshot("T1002", TerminalStatus::Operational)];
        for _ in 0..50 {
            let seed = pick(&fleet).unwrap();
            assert!(
                seed.message.contains("T1002")
                    || seed.message.contains("Merchant T1002")
                    || seed.message.contains("high error rates")
            );
        }
    }
}
