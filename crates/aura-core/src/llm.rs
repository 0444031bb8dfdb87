use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{self, LlmConfig};
use crate::error::{AuraError, Result};
use crate::model::HistoryEntry;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` endpoint.
///
/// Cheap to clone; the insight banner and the assistant share one
/// connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: usize,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl GenerateResponse {
    /// Concatenated text of the first candidate; empty when the model
    /// returned no text.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuraError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: config.max_tokens,
        })
    }

    /// Build a client if an API key can be resolved. `Ok(None)` means the
    /// AI features run degraded.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        Self::from_key(config::resolve_api_key(config), config)
    }

    fn from_key(key: Option<String>, config: &LlmConfig) -> Result<Option<Self>> {
        match key {
            Some(key) => Self::new(key, config).map(Some),
            None => {
                tracing::warn!("no generative-language API key configured, AI features degraded");
                Ok(None)
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single-shot prompt.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let contents = vec![Content::text(Some("user"), prompt)];
        self.generate_contents(contents, system).await
    }

    /// Multi-turn exchange: `history` oldest first, then `message` as the
    /// current user turn.
    pub async fn chat(
        &self,
        message: &str,
        history: &[HistoryEntry],
        system: Option<&str>,
    ) -> Result<String> {
        let contents = build_contents(message, history);
        self.generate_contents(contents, system).await
    }

    /// POST {base_url}/v1beta/models/{model}:generateContent
    async fn generate_contents(&self, contents: Vec<Content>, system: Option<&str>) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model,
        );

        let body = GenerateRequest {
            contents,
            system_instruction: system.map(|s| Content::text(None, s)),
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AuraError::Llm(format!("Gemini error {status}: {text}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AuraError::Llm(format!("Gemini response parse error: {e}")))?;

        Ok(parsed.into_text())
    }
}

fn build_contents(message: &str, history: &[HistoryEntry]) -> Vec<Content> {
    history
        .iter()
        .map(|entry| Content::text(Some(entry.role.to_string().as_str()), &entry.text))
        .chain(std::iter::once(Content::text(Some("user"), message)))
        .collect()
}
