use std::sync::Arc;

use askama::Template;
use aura_core::conversation::Conversation;
use aura_core::gate::Route;
use aura_core::model::TurnState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::{guard, Layout};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assistant", get(assistant_page))
        .route("/assistant/send", post(send_message))
        .route("/assistant/cancel", post(cancel_turn))
        .route("/assistant/reset", post(reset_conversation))
}

// -- Templates --

#[derive(Template)]
#[template(path = "assistant.html")]
struct AssistantTemplate {
    layout: Layout,
    messages: Vec<MessageView>,
    pending: bool,
}

struct MessageView {
    text: String,
    is_user: bool,
    time: String,
    /// Set on the user message whose reply failed.
    error: Option<String>,
}

fn message_views(conversation: &Conversation) -> Vec<MessageView> {
    let failed = conversation.turn().failed_message();
    conversation
        .messages()
        .iter()
        .map(|m| MessageView {
            text: m.text.clone(),
            is_user: m.role.is_user(),
            time: m.timestamp.format("%H:%M").to_string(),
            error: failed
                .filter(|(id, _)| *id == m.id)
                .map(|(_, reason)| reason.to_string()),
        })
        .collect()
}

// -- Form --

#[derive(Deserialize)]
pub struct SendForm {
    #[serde(default)]
    message: String,
}

// -- Handlers --

async fn assistant_page(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if let Some(redirect) = guard(&state, Route::Assistant) {
        return Ok(redirect);
    }

    let conversation = state.assistant.snapshot();
    let tmpl = AssistantTemplate {
        layout: Layout::new(&state, Route::Assistant),
        messages: message_views(&conversation),
        pending: matches!(conversation.turn(), TurnState::Pending { .. }),
    };
    Ok(Html(tmpl.render()?).into_response())
}

/// Post/redirect/get: the reply (or the failed turn) shows up on the
/// redirected page.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SendForm>,
) -> Response {
    if let Some(redirect) = guard(&state, Route::Assistant) {
        return redirect;
    }
    // Failed turns are recorded in the transcript state; only rejections
    // leave no trace there.
    if let Err(e) = state.assistant.send(&form.message).await {
        if e.is_rejection() {
            tracing::debug!(error = %e, "message rejected");
        }
    }
    Redirect::to(Route::Assistant.path()).into_response()
}

async fn cancel_turn(State(state): State<Arc<AppState>>) -> Response {
    if let Some(redirect) = guard(&state, Route::Assistant) {
        return redirect;
    }
    state.assistant.cancel();
    Redirect::to(Route::Assistant.path()).into_response()
}

async fn reset_conversation(State(state): State<Arc<AppState>>) -> Response {
    if let Some(redirect) = guard(&state, Route::Assistant) {
        return redirect;
    }
    state.assistant.reset();
    Redirect::to(Route::Assistant.path()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::{body_string, location, signed_in_state, test_app_state};
    use aura_core::coach::CoachBackend;
    use aura_core::config::AssistantConfig;
    use aura_core::conversation::Assistant;
    use aura_core::model::{ChatMessage, HistoryEntry};
    use aura_core::AuraError;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn send(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/assistant/send")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_seeded_view_has_no_error() {
        let conversation = Conversation::seeded("Hi");
        let views = message_views(&conversation);
        assert_eq!(views.len(), 1);
        assert!(!views[0].is_user);
        assert!(views[0].error.is_none());
    }

    struct UnavailableCoach;

    impl CoachBackend for UnavailableCoach {
        async fn send_turn(&self, _message: &str, _history: &[HistoryEntry]) -> aura_core::Result<String> {
            Err(AuraError::Llm("Gemini error 503 Service Unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_turn_renders_error_under_user_message() {
        let assistant = Assistant::new(UnavailableCoach, &AssistantConfig::default());
        assistant.send("Is 72 BPM normal?").await.unwrap_err();

        let conversation = assistant.snapshot();
        let failed_id = conversation.messages()[1].id;
        assert_eq!(conversation.turn().failed_message().map(|(id, _)| id), Some(failed_id));

        let views = message_views(&conversation);
        assert_eq!(views.len(), 2);
        assert!(views[0].error.is_none());
        assert!(views[1].is_user);
        assert!(views[1].error.as_deref().unwrap().contains("503"));

        let tmpl = AssistantTemplate {
            layout: Layout {
                title: Route::Assistant.title(),
                nav: Vec::new(),
                user_name: None,
                photo_url: None,
            },
            messages: views,
            pending: false,
        };
        let html = tmpl.render().unwrap();
        let question = html.find("Is 72 BPM normal?").unwrap();
        let bubble = html.find("Not delivered: coach backend failed").unwrap();
        assert!(bubble > question);
    }

    #[tokio::test]
    async fn test_send_requires_session() {
        let state = test_app_state().await;
        let app = crate::routes::router().with_state(state.clone());
        let resp = app.oneshot(send("message=hello")).await.unwrap();
        assert_eq!(location(&resp), "/login");
        assert_eq!(state.assistant.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_send_appends_round_trip() {
        let state = signed_in_state().await;
        let app = crate::routes::router().with_state(state.clone());

        let resp = app.clone().oneshot(send("message=How+do+I+sleep+better%3F")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/assistant");

        let messages: Vec<ChatMessage> = state.assistant.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "How do I sleep better?");
        assert_eq!(
            messages[2].text,
            "I can only answer questions if an API Key is provided."
        );

        let req = Request::builder().uri("/assistant").body(Body::empty()).unwrap();
        let html = body_string(app.oneshot(req).await.unwrap().into_body()).await;
        assert!(html.contains("How do I sleep better?"));
        assert!(html.contains("Ask about your health metrics..."));
    }

    #[tokio::test]
    async fn test_blank_message_ignored() {
        let state = signed_in_state().await;
        let app = crate::routes::router().with_state(state.clone());
        let resp = app.oneshot(send("message=+++")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.assistant.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_reseeds_transcript() {
        let state = signed_in_state().await;
        state.assistant.send("hello").await.unwrap();

        let app = crate::routes::router().with_state(state.clone());
        let req = Request::builder()
            .method("POST")
            .uri("/assistant/reset")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.assistant.messages().len(), 1);
    }
}
