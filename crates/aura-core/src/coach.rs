//! Coach backend: answers one assistant turn given the transcript so far.

use crate::error::Result;
use crate::llm::GeminiClient;
use crate::model::HistoryEntry;

pub const COACH_SYSTEM_INSTRUCTION: &str = "You are Aura, a friendly, professional, and empathetic health assistant. Keep answers brief (under 50 words) unless asked for detail. Focus on wellness, nutrition, and fitness.";

/// Reply when no API key is configured.
pub const COACH_UNCONFIGURED_REPLY: &str = "I can only answer questions if an API Key is provided.";

/// Reply when the model returns no text.
pub const COACH_EMPTY_REPLY: &str = "I'm thinking...";

/// Reply when the backend cannot be reached or errors.
pub const COACH_FALLBACK_REPLY: &str =
    "I'm having trouble connecting to the health database right now.";

/// Remote service that produces the model's side of a turn.
pub trait CoachBackend: Send + Sync {
    /// `history` is the transcript before `message` was appended, oldest first.
    fn send_turn(
        &self,
        message: &str,
        history: &[HistoryEntry],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Production coach. Never fails outward: a missing key or a backend error
/// degrades to a fixed reply, so the assistant always looks available.
#[derive(Debug, Clone)]
pub struct CoachService {
    client: Option<GeminiClient>,
}

impl CoachService {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    pub fn unconfigured() -> Self {
        Self { client: None }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn reply(&self, message: &str, history: &[HistoryEntry]) -> String {
        let Some(client) = &self.client else {
            return COACH_UNCONFIGURED_REPLY.to_string();
        };

        match client
            .chat(message, history, Some(COACH_SYSTEM_INSTRUCTION))
            .await
        {
            Ok(text) if text.is_empty() => COACH_EMPTY_REPLY.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, transient = e.is_transient(), "coach backend failed, using fallback reply");
                COACH_FALLBACK_REPLY.to_string()
            }
        }
    }
}

impl CoachBackend for CoachService {
    async fn send_turn(&self, message: &str, history: &[HistoryEntry]) -> Result<String> {
        Ok(self.reply(message, history).await)
    }
}
