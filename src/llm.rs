//! Language-model client abstraction.
//!
//! The [`LanguageModel`] trait is the seam used by both the metadata
//! extractor and the answer synthesizer: text in, text out. The model is
//! a black box — callers own their failure policy (empty metadata,
//! error-string answers) and never let an outage abort the pipeline.
//!
//! [`GeminiClient`] calls the Google Generative Language API
//! (`models/{model}:generateContent`), authenticated via the
//! `GEMINI_API_KEY` environment variable.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;

/// Text-in/text-out language model capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`. Errors are provider errors
    /// (missing credentials, network, API); callers decide how to
    /// degrade.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the configured language model client, or `None` when the
/// provider is disabled. Disabled is a legitimate configuration: the
/// pipeline then stores chunks with empty metadata and queries return
/// sources without synthesis.
pub fn create_model(config: &LlmConfig) -> Result<Option<Box<dyn LanguageModel>>> {
    match config.provider.as_str() {
        "gemini" => Ok(Some(Box::new(GeminiClient::new(config)?))),
        "disabled" => Ok(None),
        other => bail!("unknown llm provider: {}", other),
    }
}

/// Client for the Google Gemini `generateContent` endpoint.
pub struct GeminiClient {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_gemini_response(&json)
    }
}

/// Pull the generated text out of a `generateContent` response.
///
/// Responses may split the answer across multiple parts; they are
/// concatenated in arrival order.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("invalid Gemini response: missing candidates"))?;

    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            out.push_str(text);
        }
    }

    if out.is_empty() {
        bail!("Gemini response contained no text parts");
    }
    Ok(out)
}
