use anyhow::Result;
use async_trait::async_trait;
use termsense_common::types::Alert;

/// The two kinds of text a drafter can produce for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    /// Rapid root-cause assessment plus next steps, for the consultant.
    RootCause,
    /// Proactive, apologetic email to the affected merchant.
    MerchantEmail,
}

/// One drafting request. Everything the prompt needs travels with the alert
/// (terminal metrics are embedded in its source snapshot).
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub kind: DraftKind,
    pub alert: Alert,
}

/// A text-drafting model provider.
#[async_trait]
pub trait Drafter: Send + Sync {
    /// Provider name, used for logging.
    fn provider(&self) -> &str;

    /// Model name, used for logging.
    fn model_name(&self) -> &str;

    /// Produces the requested draft.
    ///
    /// # Errors
    ///
    /// Returns an error when the model service fails after the provider's
    /// retry policy is exhausted, or responds with no usable text.
    async fn draft(&self, request: &DraftRequest) -> Result<String>;
}
