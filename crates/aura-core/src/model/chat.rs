use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Greeting every fresh transcript starts with.
pub const DEFAULT_GREETING: &str =
    "Hello! I'm Aura. How can I help you with your health goals today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            text: self.text.clone(),
        }
    }
}

/// Context entry handed to the coach backend, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// Lifecycle of the most recent exchange. Only `Pending` blocks a new send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    Pending {
        message_id: Uuid,
    },
    Fulfilled {
        message_id: Uuid,
    },
    Failed {
        message_id: Uuid,
        reason: String,
    },
}

impl TurnState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_pending_for(&self, id: Uuid) -> bool {
        matches!(self, Self::Pending { message_id } if *message_id == id)
    }

    /// The user message whose reply failed, if the last turn failed.
    pub fn failed_message(&self) -> Option<(Uuid, &str)> {
        match self {
            Self::Failed { message_id, reason } => Some((*message_id, reason.as_str())),
            _ => None,
        }
    }
}
