//! Terminal-fleet monitoring server: configuration, the reconciliation
//! engine, and the starter-ticket seeding policy.

pub mod config;
pub mod engine;
pub mod seed;
