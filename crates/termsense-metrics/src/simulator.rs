use crate::MetricSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use termsense_common::types::{error_rate, Connectivity, TerminalSnapshot, TerminalStatus};

/// Simulated terminal fleet.
///
/// Generates a fresh fleet on every fetch with a few planted anomalies so
/// every classifier rule has something to fire on: one complete outage, one
/// terminal with a pathological error rate, one with unusually low volume.
/// The rest report healthy numbers with a small chance of a lagging link.
pub struct SimulatedMetricSource {
    latency: Duration,
}

impl SimulatedMetricSource {
    /// `latency` is slept before each fetch to mimic a remote feed.
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn generate(&self, count: usize) -> Vec<TerminalSnapshot> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let mut fleet = Vec::with_capacity(count);

        for i in 0..count {
            let mut transactions: u64 = rng.gen_range(50..550);
            let mut errors: u64 = rng.gen_range(0..=(transactions / 20).max(1));
            let mut status = TerminalStatus::Operational;
            let mut connectivity = if rng.gen_bool(0.95) {
                Connectivity::Online
            } else {
                Connectivity::Offline
            };

            if i == 1 {
                transactions = 0;
                errors = 0;
                status = TerminalStatus::Outage;
                connectivity = Connectivity::Offline;
            } else if i == 4 {
                transactions = 350;
                errors = 100;
                status = TerminalStatus::HighErrors;
            } else if i == 7 {
                transactions = rng.gen_range(1..=20);
                status = TerminalStatus::LowVolume;
            } else if rng.gen_bool(0.05) {
                connectivity = Connectivity::Lagging;
                errors += 5;
            }

            fleet.push(TerminalSnapshot {
                id: format!("T{}", 1000 + i),
                merchant_name: format!("Merchant A{}", i + 1),
                transactions,
                errors,
                error_rate: error_rate(transactions, errors),
                connectivity,
                status,
                last_update: now,
            });
        }

        fleet
    }
}

#[async_trait]
impl MetricSource for SimulatedMetricSource {
    async fn fetch(&self, count: usize) -> Result<Vec<TerminalSnapshot>> {
        tokio::time::sleep(self.latency).await;
        Ok(self.generate(count))
    }
}
