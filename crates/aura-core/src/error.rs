use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuraError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuraError {
    /// Returns `true` when the error is likely transient
    /// (HTTP 429/5xx, network timeouts, connection refused).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            Self::Llm(msg) | Self::Storage(msg) => is_transient_message(msg),
            _ => false,
        }
    }
}

fn is_transient_message(msg: &str) -> bool {
    let msg_lower = msg.to_lowercase();
    for code in ["429", "500", "502", "503", "504"] {
        if msg_lower.contains(code) {
            return true;
        }
    }
    let patterns = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "temporarily unavailable",
    ];
    patterns.iter().any(|p| msg_lower.contains(p))
}

pub type Result<T> = std::result::Result<T, AuraError>;
