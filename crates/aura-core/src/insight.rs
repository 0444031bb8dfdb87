//! One-line daily insight for the dashboard banner.

use crate::error::Result;
use crate::llm::GeminiClient;
use crate::model::MetricReading;

/// Reply when no API key is configured.
pub const INSIGHT_UNCONFIGURED: &str =
    "Please configure your API Key to receive personalized AI health insights.";

/// Reply when the model returns blank text.
pub const INSIGHT_EMPTY: &str = "Stay active and hydrated!";

/// Reply when the backend fails.
pub const INSIGHT_FALLBACK: &str = "Great job tracking your health today!";

/// Placeholder shown while an insight is being generated.
pub const INSIGHT_LOADING: &str = "Analyzing your daily metrics...";

#[derive(Debug, Clone)]
pub struct InsightService {
    client: Option<GeminiClient>,
}

impl InsightService {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Never fails: every error path degrades to a fixed sentence.
    pub async fn get_insight(&self, metrics: &[MetricReading]) -> String {
        let Some(client) = &self.client else {
            return INSIGHT_UNCONFIGURED.to_string();
        };

        let prompt = match build_prompt(metrics) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize metrics for insight");
                return INSIGHT_FALLBACK.to_string();
            }
        };

        match client.generate(&prompt, None).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    INSIGHT_EMPTY.to_string()
                } else {
                    trimmed.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, transient = e.is_transient(), "insight backend failed, using fallback");
                INSIGHT_FALLBACK.to_string()
            }
        }
    }
}

fn build_prompt(metrics: &[MetricReading]) -> Result<String> {
    let metrics_json = serde_json::to_string(metrics)?;
    Ok(format!(
        "You are an elite personal health coach known for concise, motivating, and scientifically accurate advice.\n\
         Analyze the following user health metrics: {metrics_json}.\n\
         Provide a single, powerful sentence of insight or motivation. Do not use markdown."
    ))
}
