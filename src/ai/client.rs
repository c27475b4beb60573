//! Gemini client for text generation and image analysis.
//!
//! One dispatch is exactly one HTTP round trip: no retries, bounded by
//! the client timeout. Provider errors keep their detail for the logs;
//! callers only see the generic failure shape.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::AiConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum AiError {
    /// Rejected locally, before any network call
    #[error("prompt must be a non-empty string")]
    EmptyPrompt,

    #[error("Gemini request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unusable Gemini response: {0}")]
    Malformed(String),
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Generate a response for a text-only prompt
    pub async fn generate_text(&self, prompt: &str) -> Result<String, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        self.generate(json!([{ "text": prompt }])).await
    }

    /// Generate a response for a prompt plus an inline image
    pub async fn generate_with_image(
        &self,
        prompt: &str,
        image_bytes: &[u8],
        media_type: &str,
    ) -> Result<String, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let parts = json!([
            { "text": prompt },
            {
                "inline_data": {
                    "mime_type": media_type,
                    "data": BASE64.encode(image_bytes),
                }
            }
        ]);

        self.generate(parts).await
    }

    /// Issue the single generateContent call and extract the text result
    async fn generate(&self, parts: Value) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let payload = json!({
            "contents": [{ "parts": parts }]
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        let body: Value = response.json().await?;
        extract_text(&body)
    }
}

/// Pull the single textual result out of a generateContent response
fn extract_text(body: &Value) -> Result<String, AiError> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AiError::Malformed("no candidate text in response".to_string()))
}
