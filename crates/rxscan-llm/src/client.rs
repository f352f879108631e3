//! OpenAI-compatible chat-completions client.
//!
//! The client is deliberately minimal: one blocking round trip per call,
//! temperature 0, strict JSON response mode. The base URL is configurable
//! so any OpenAI-compatible gateway works.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings and model selection for both extraction tiers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions base URL (no trailing slash)
    pub api_base: String,
    /// Bearer token
    pub api_key: String,
    /// Vision-capable model id
    pub vision_model: String,
    /// Text-only model id
    pub text_model: String,
    /// Hard timeout for the vision round trip
    pub vision_timeout: Duration,
    /// Hard timeout for the text-model round trip
    pub text_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            vision_model: "gpt-4o".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            vision_timeout: Duration::from_secs(60),
            text_timeout: Duration::from_secs(45),
        }
    }
}

impl LlmConfig {
    /// Build a config from `RXSCAN_*` environment variables, falling back
    /// to defaults for anything unset.
    #[must_use = "config is built but not used"]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("RXSCAN_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var("RXSCAN_API_KEY") {
            config.api_key = key;
        }
        if let Ok(model) = std::env::var("RXSCAN_MODEL") {
            config.vision_model = model;
        }
        if let Ok(model) = std::env::var("RXSCAN_TEXT_MODEL") {
            config.text_model = model;
        }
        config
    }
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    pub r#type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: String,
    pub content: Vec<Content>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Content {
    Text { r#type: String, text: String },
    Image { r#type: String, image_url: ImageUrl },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            r#type: "text".to_string(),
            text: text.into(),
        }
    }

    pub fn image(data_url: impl Into<String>) -> Self {
        Self::Image {
            r#type: "image_url".to_string(),
            image_url: ImageUrl {
                url: data_url.into(),
                detail: "high".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
    pub detail: String,
}

/// Chat completion response body (the parts we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client shared by both extractors.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    /// Create a client from a config.
    #[must_use = "client is created but not used"]
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The active configuration.
    #[inline]
    #[must_use = "config reference is returned but not used"]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// One chat round trip; returns the first choice's content verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-2xx status, or a
    /// response with no choices. Callers in this crate convert every error
    /// into "tier unavailable" (`None`).
    pub(crate) async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        timeout: Duration,
    ) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
        };

        let url = format!("{}/chat/completions", self.config.api_base);
        debug!(%url, model, "sending chat completion request");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat completion error ({status}): {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("chat completion response was not valid JSON")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("chat completion response had no choices")?;
        Ok(choice.message.content)
    }
}
