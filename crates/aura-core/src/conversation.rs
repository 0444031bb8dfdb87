//! Assistant transcript and the single in-flight exchange with the coach.
//!
//! A turn moves `Idle -> Pending -> {Fulfilled, Failed}`. The user message is
//! appended as soon as a send is accepted; the model reply is appended only
//! on success. The lock guarding the transcript is never held across the
//! backend call.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::coach::CoachBackend;
use crate::config::AssistantConfig;
use crate::model::{ChatMessage, HistoryEntry, TurnState, DEFAULT_GREETING};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("a reply is already pending")]
    RequestPending,

    #[error("coach backend failed: {0}")]
    Backend(String),

    #[error("no reply within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("request was cancelled")]
    Cancelled,
}

impl SendError {
    /// Rejections leave the transcript untouched; everything else failed a
    /// turn that was already appended.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::RequestPending)
    }
}

/// Ordered transcript plus the state of the latest turn.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    turn: TurnState,
}

impl Conversation {
    /// Fresh transcript holding only the model's greeting.
    pub fn seeded(greeting: &str) -> Self {
        Self {
            messages: vec![ChatMessage::model(greeting)],
            turn: TurnState::Idle,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.turn.is_pending()
    }

    /// Backend context: the whole transcript, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(ChatMessage::to_history).collect()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::seeded(DEFAULT_GREETING)
    }
}

#[derive(Debug)]
struct Exchange {
    conversation: Conversation,
    cancel: Option<CancellationToken>,
}

/// Drives one conversation against a [`CoachBackend`].
pub struct Assistant<C> {
    exchange: Mutex<Exchange>,
    coach: C,
    greeting: String,
    timeout: Duration,
}

impl<C: CoachBackend> Assistant<C> {
    pub fn new(coach: C, config: &AssistantConfig) -> Self {
        Self {
            exchange: Mutex::new(Exchange {
                conversation: Conversation::seeded(&config.greeting),
                cancel: None,
            }),
            coach,
            greeting: config.greeting.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn coach(&self) -> &C {
        &self.coach
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Copy of the transcript and turn state for rendering.
    pub fn snapshot(&self) -> Conversation {
        self.lock().conversation.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().conversation.messages.clone()
    }

    pub fn turn(&self) -> TurnState {
        self.lock().conversation.turn.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().conversation.is_pending()
    }

    /// Send one user message and wait for the model's reply.
    ///
    /// The user message stays in the transcript even when the reply fails;
    /// the failure is recorded in [`TurnState::Failed`].
    pub async fn send(&self, text: &str) -> Result<ChatMessage, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let (history, message_id, token) = {
            let mut exchange = self.lock();
            if exchange.conversation.is_pending() {
                tracing::debug!("send rejected, a turn is already pending");
                return Err(SendError::RequestPending);
            }

            let history = exchange.conversation.history();
            let message = ChatMessage::user(text);
            let message_id = message.id;
            let token = CancellationToken::new();

            exchange.conversation.messages.push(message);
            exchange.conversation.turn = TurnState::Pending { message_id };
            exchange.cancel = Some(token.clone());
            (history, message_id, token)
        };

        tracing::debug!(%message_id, history = history.len(), "turn pending");
        let mut guard = PendingTurn {
            exchange: &self.exchange,
            message_id,
            armed: true,
        };

        let outcome = tokio::select! {
            _ = token.cancelled() => Err(SendError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.coach.send_turn(text, &history)) => {
                match result {
                    Ok(Ok(reply)) => Ok(reply),
                    Ok(Err(e)) => Err(SendError::Backend(e.to_string())),
                    Err(_) => Err(SendError::TimedOut(self.timeout)),
                }
            }
        };

        guard.armed = false;
        let mut exchange = self.lock();
        if !exchange.conversation.turn.is_pending_for(message_id) {
            // The transcript was replaced while this turn was in flight.
            tracing::debug!(%message_id, "reply dropped, turn was superseded");
            return Err(SendError::Cancelled);
        }
        exchange.cancel = None;
        match outcome {
            Ok(reply) => {
                let reply = ChatMessage::model(reply);
                exchange.conversation.messages.push(reply.clone());
                exchange.conversation.turn = TurnState::Fulfilled { message_id };
                tracing::debug!(%message_id, "turn fulfilled");
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "turn failed");
                exchange.conversation.turn = TurnState::Failed {
                    message_id,
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Cancel the pending turn. Returns false when nothing was pending.
    pub fn cancel(&self) -> bool {
        let exchange = self.lock();
        match &exchange.cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Start over from the greeting. Ignored while a turn is pending.
    pub fn reset(&self) -> bool {
        let mut exchange = self.lock();
        if exchange.conversation.is_pending() {
            tracing::debug!("reset ignored, a turn is pending");
            return false;
        }
        exchange.conversation = Conversation::seeded(&self.greeting);
        true
    }

    /// Drop the transcript of a session that is ending, pending turn or not.
    ///
    /// Any in-flight reply is cancelled and will not be written into the new
    /// transcript. Returns true when a pending turn was interrupted.
    pub fn end_session(&self) -> bool {
        let mut exchange = self.lock();
        let interrupted = match exchange.cancel.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };
        exchange.conversation = Conversation::seeded(&self.greeting);
        tracing::debug!(interrupted, "transcript cleared for a new session");
        interrupted
    }

    fn lock(&self) -> MutexGuard<'_, Exchange> {
        self.exchange.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fails the turn if the `send` future is dropped mid-flight, so an
/// abandoned request cannot leave the conversation stuck in `Pending`.
struct PendingTurn<'a> {
    exchange: &'a Mutex<Exchange>,
    message_id: Uuid,
    armed: bool,
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut exchange = self.exchange.lock().unwrap_or_else(|e| e.into_inner());
        if !exchange.conversation.turn.is_pending_for(self.message_id) {
            return;
        }
        exchange.cancel = None;
        exchange.conversation.turn = TurnState::Failed {
            message_id: self.message_id,
            reason: SendError::Cancelled.to_string(),
        };
        tracing::debug!(message_id = %self.message_id, "pending turn abandoned");
    }
}
