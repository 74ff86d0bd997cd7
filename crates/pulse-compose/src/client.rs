//! HTTP client for the generative-text backend (chat-completions API).

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::ComposeError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// One client serves both newsletter generation and style analysis; the
/// two differ only in the prompts they send.
pub struct GenTextClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl GenTextClient {
    /// Creates a client pointed at the production backend.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, ComposeError> {
        Self::with_base_url(api_key, model, max_tokens, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ComposeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from app config.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::GenerationFailed`] when no API key is
    /// configured, or [`ComposeError::Http`] if the client cannot be built.
    pub fn from_app_config(config: &pulse_core::AppConfig) -> Result<Self, ComposeError> {
        let api_key = config.generation_api_key.as_deref().ok_or_else(|| {
            ComposeError::GenerationFailed("PULSE_GENERATION_API_KEY is not set".to_string())
        })?;
        Self::with_base_url(
            api_key,
            &config.generation_model,
            config.generation_max_tokens,
            config.generation_timeout_secs,
            &config.generation_base_url,
        )
    }

    /// Submit one system + user message pair and return the generated text.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::Http`] on network failure.
    /// - [`ComposeError::GenerationFailed`] on a non-2xx status or an
    ///   empty/shapeless completion.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ComposeError::GenerationFailed(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ComposeError::GenerationFailed(format!("unparseable completion response: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ComposeError::GenerationFailed(
                "backend returned empty content".to_string(),
            ));
        }

        Ok(content)
    }
}
