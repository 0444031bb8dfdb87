use std::sync::Arc;

use askama::Template;
use aura_core::gate::{LogoutOutcome, Route, DEFAULT_ROUTE};
use aura_core::model::Credentials;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::guard;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
}

// -- Templates --

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    register: bool,
    email: String,
    error: Option<String>,
}

// -- Params --

#[derive(Deserialize)]
pub struct LoginParams {
    mode: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    mode: Option<String>,
}

fn is_register(mode: Option<&str>) -> bool {
    mode == Some("register")
}

// -- Handlers --

async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Response, AppError> {
    if let Some(redirect) = guard(&state, Route::Login) {
        return Ok(redirect);
    }
    let tmpl = LoginTemplate {
        register: is_register(params.mode.as_deref()),
        email: String::new(),
        error: None,
    };
    Ok(Html(tmpl.render()?).into_response())
}

async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(redirect) = guard(&state, Route::Login) {
        return Ok(redirect);
    }

    let register = is_register(form.mode.as_deref());
    let credentials = Credentials::new(form.email.trim(), form.password);
    let result = if register {
        state.gate.register(&credentials).await
    } else {
        state.gate.login(&credentials).await
    };

    match result {
        Ok(_) => Ok(Redirect::to(DEFAULT_ROUTE.path()).into_response()),
        Err(e) => {
            let tmpl = LoginTemplate {
                register,
                email: credentials.email,
                error: Some(e.to_string()),
            };
            Ok((StatusCode::UNAUTHORIZED, Html(tmpl.render()?)).into_response())
        }
    }
}

/// Sign out and start the next session with a fresh transcript.
async fn logout(State(state): State<Arc<AppState>>) -> Redirect {
    if let LogoutOutcome::LocalOnly { reason } = state.gate.logout().await {
        tracing::warn!(%reason, "signed out locally only");
    }
    state.assistant.end_session();
    Redirect::to(Route::Login.path())
}
