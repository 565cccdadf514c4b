//! Generative drafting for alert follow-up.
//!
//! Given an anomaly alert, a [`Drafter`] produces either a root-cause
//! assessment for the on-call consultant or a proactive merchant email. The
//! model service is an external collaborator; this crate owns the client,
//! the prompts, and the retry policy.

pub mod drafter;
pub mod models;
pub mod prompt;
pub mod providers;

pub use drafter::{DraftKind, DraftRequest, Drafter};
pub use providers::gemini::GeminiProvider;
