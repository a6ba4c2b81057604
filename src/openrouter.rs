use crate::{
    config::{key_preview, AppConfig},
    extract::parse_suggestions,
    models::Suggestion,
    prompt::SYSTEM_INSTRUCTION,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

const REFERER: &str = "https://app.quemepongo.help";
const APP_TITLE: &str = "QueMePongo";
const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenRouter API key not configured")]
    Config,
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("no content in response")]
    EmptyResponse,
    #[error("invalid response format: {0}")]
    Format(String),
}

fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[{} chars]", &text[..idx], text.len()),
        None => text.to_string(),
    }
}

/// Chat-completion client for outfit generation.
///
/// One best-effort attempt per call: no retries, no streaming, and the
/// transport's default timeout.
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.openrouter_api_key.clone(),
            config.openrouter_base_url.clone(),
            config.openrouter_model.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn generate_suggestions(&self, prompt: &str) -> Result<Vec<Suggestion>, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::Config)?;
        let url = format!("{}/chat/completions", self.base_url);

        info!(
            "🎯 Requesting outfits from {} (model={}, key={}) with prompt: {}",
            url,
            self.model,
            key_preview(Some(api_key)),
            preview(prompt, 120)
        );

        let request_body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ OpenRouter API error response: {}", error_body);
            return Err(GenerationError::Upstream(format!("status={status}")));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let parsed: ChatCompletion = serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::Format(format!("unexpected envelope: {e}")))?;

        let content = extract_content(&parsed).ok_or(GenerationError::EmptyResponse)?;
        info!("📝 Model content: {}", preview(content, 300));

        let outfits = parse_suggestions(content)?;
        info!("✅ Decoded {} outfit suggestions", outfits.len());
        Ok(outfits)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<serde_json::Value>,
}

fn extract_content(resp: &ChatCompletion) -> Option<&str> {
    resp.choices
        .first()?
        .message
        .as_ref()?
        .content
        .as_ref()?
        .as_str()
        .filter(|s| !s.trim().is_empty())
}
