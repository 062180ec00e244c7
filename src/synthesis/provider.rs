//! Completion provider seam and the OpenAI-compatible HTTP client.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::debug;

/// Longest slice of an error body kept in [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Text-completion service: prompt in, candidate SQL text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Name used in errors and logs.
    fn name(&self) -> &str;
}

/// Chat-completions client for OpenAI and compatible gateways.
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompletionProvider {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn request_body(&self, prompt: &str) -> JsonValue {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "Requesting completion");

        let mut request = self.client.post(&self.endpoint).json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY),
            });
        }

        let payload: JsonValue = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.without_url().to_string()))?;
        extract_content(&payload)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn extract_content(payload: &JsonValue) -> Result<String, ProviderError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::MalformedResponse("no choices[0].message.content in response".into())
        })
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
