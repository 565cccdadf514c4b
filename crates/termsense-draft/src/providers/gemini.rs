use crate::drafter::{DraftRequest, Drafter};
use crate::models::{Content, GenerateContentRequest, GenerateContentResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

/// Gemini generateContent provider.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(60)))
            .build()?;

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            base_url: base_url.unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            client,
        })
    }

    /// Sends one generateContent request, retrying only on rate limiting:
    /// up to [`MAX_ATTEMPTS`] tries with exponential backoff starting at 1s.
    /// Any other failure surfaces immediately.
    async fn call_api(&self, req: &GenerateContentRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        for attempt in 0..MAX_ATTEMPTS {
            let resp = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(req)
                .send()
                .await
                .context("Failed to send request to Gemini API")?;

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS - 1 {
                let delay = Duration::from_secs(1u64 << attempt);
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    "Gemini rate limit hit, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(status = %status, body = %body, "Gemini API request failed");
                anyhow::bail!("Gemini API error {}: {}", status, body);
            }

            let parsed: GenerateContentResponse = resp
                .json()
                .await
                .context("Failed to parse Gemini API response")?;
            return parsed
                .text()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Gemini API response was empty or malformed"));
        }

        anyhow::bail!("Gemini API rate limited after {MAX_ATTEMPTS} attempts")
    }
}

#[async_trait]
impl Drafter for GeminiProvider {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn draft(&self, request: &DraftRequest) -> Result<String> {
        let prompts = crate::prompt::build(request);
        let req = GenerateContentRequest {
            contents: vec![Content::from_text(prompts.user)],
            system_instruction: Some(Content::from_text(prompts.system)),
        };

        tracing::debug!(
            model = %self.model,
            kind = ?request.kind,
            terminal_id = %request.alert.terminal_id,
            "Calling Gemini API"
        );

        self.call_api(&req).await
    }
}
