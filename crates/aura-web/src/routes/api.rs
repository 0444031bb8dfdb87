//! JSON API mirroring the pages, for scripted clients.

use std::sync::Arc;

use aura_core::conversation::Conversation;
use aura_core::gate::{destination, LogoutOutcome, Navigation, Route};
use aura_core::model::{daily_summary, ChatMessage, Credentials, SessionState};
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/session",
            get(get_session).post(login).delete(logout),
        )
        .route("/api/v1/navigate", get(navigate))
        .route(
            "/api/v1/chat",
            get(get_chat).post(send_chat).delete(reset_chat),
        )
        .route("/api/v1/chat/cancel", post(cancel_chat))
        .route("/api/v1/insight", get(get_insight))
}

// -- Request / response types --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Create the account instead of signing in.
    #[serde(default)]
    pub register: bool,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub authenticated: bool,
    /// Set when only the local session could be cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateParams {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub action: &'static str,
    pub route: Route,
    pub path: &'static str,
    /// Route that finally renders after following redirects.
    pub destination: Route,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub insight: String,
}

fn require_session(state: &AppState) -> Result<(), ApiError> {
    if state.gate.is_authenticated() {
        Ok(())
    } else {
        Err(ApiError::unauthorized())
    }
}

// -- Handlers --

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    Json(state.gate.state())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionState>, ApiError> {
    if state.gate.is_authenticated() {
        return Err(ApiError::bad_request("already signed in"));
    }
    let credentials = Credentials::new(req.email.trim(), req.password);
    if req.register {
        state.gate.register(&credentials).await?;
    } else {
        state.gate.login(&credentials).await?;
    }
    Ok(Json(state.gate.state()))
}

async fn logout(State(state): State<Arc<AppState>>) -> Json<LogoutResponse> {
    let warning = match state.gate.logout().await {
        LogoutOutcome::Clean => None,
        LogoutOutcome::LocalOnly { reason } => Some(reason),
    };
    if state.assistant.end_session() {
        tracing::debug!("pending reply discarded at sign-out");
    }
    Json(LogoutResponse {
        authenticated: false,
        warning,
    })
}

async fn navigate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NavigateParams>,
) -> Json<NavigateResponse> {
    let session = state.gate.state();
    let (action, route) = match state.gate.resolve(&params.path) {
        Navigation::Render(route) => ("render", route),
        Navigation::Redirect(route) => ("redirect", route),
    };
    Json(NavigateResponse {
        action,
        route,
        path: route.path(),
        destination: destination(&session, &params.path),
    })
}

async fn get_chat(State(state): State<Arc<AppState>>) -> Result<Json<Conversation>, ApiError> {
    require_session(&state)?;
    Ok(Json(state.assistant.snapshot()))
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    require_session(&state)?;
    let reply = state.assistant.send(&req.message).await?;
    Ok(Json(reply))
}

async fn cancel_chat(State(state): State<Arc<AppState>>) -> Result<Json<FlagResponse>, ApiError> {
    require_session(&state)?;
    Ok(Json(FlagResponse {
        ok: state.assistant.cancel(),
    }))
}

async fn reset_chat(State(state): State<Arc<AppState>>) -> Result<Json<FlagResponse>, ApiError> {
    require_session(&state)?;
    Ok(Json(FlagResponse {
        ok: state.assistant.reset(),
    }))
}

async fn get_insight(State(state): State<Arc<AppState>>) -> Result<Json<InsightResponse>, ApiError> {
    require_session(&state)?;
    let insight = state.insight.get_insight(&daily_summary()).await;
    Ok(Json(InsightResponse { insight }))
}
