//! HTTP client for the transactional email API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::DeliverError;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Client for a Resend-style `/emails` endpoint: one request per
/// recipient, bearer-token auth, HTML body.
pub struct EmailClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl EmailClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`DeliverError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, DeliverError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`DeliverError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, DeliverError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from app config.
    ///
    /// # Errors
    ///
    /// Returns [`DeliverError::Api`] when no API key is configured, or
    /// [`DeliverError::Http`] if the client cannot be built.
    pub fn from_app_config(config: &pulse_core::AppConfig) -> Result<Self, DeliverError> {
        let api_key = config
            .email_api_key
            .as_deref()
            .ok_or_else(|| DeliverError::Api("PULSE_EMAIL_API_KEY is not set".to_string()))?;
        Self::with_base_url(api_key, config.scraper_request_timeout_secs, &config.email_base_url)
    }

    /// Send one email; returns the provider's message id.
    ///
    /// # Errors
    ///
    /// - [`DeliverError::Http`] on network failure.
    /// - [`DeliverError::Api`] on a non-2xx status.
    pub async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<String, DeliverError> {
        let body = json!({
            "from": from,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliverError::Api(format!(
                "send to {to} returned {status}: {detail}"
            )));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| DeliverError::Api(format!("unparseable send response: {e}")))?;
        Ok(parsed.id.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_one_recipient_per_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re-key"))
            .and(body_partial_json(json!({ "to": ["reader@example.com"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg-1" })))
            .mount(&server)
            .await;

        let client = EmailClient::with_base_url("re-key", 5, &server.uri()).expect("client");
        let id = client
            .send(
                "Pulse <news@pulse.dev>",
                "reader@example.com",
                "Subject",
                "<p>Hi</p>",
            )
            .await
            .expect("send");
        assert_eq!(id, "msg-1");
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad address"))
            .mount(&server)
            .await;

        let client = EmailClient::with_base_url("re-key", 5, &server.uri()).expect("client");
        let result = client.send("from", "to@example.com", "s", "<p></p>").await;
        assert!(matches!(result, Err(DeliverError::Api(_))));
    }
}
