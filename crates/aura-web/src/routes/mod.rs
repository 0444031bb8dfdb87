pub mod api;
pub mod assistant;
pub mod auth;
pub mod pages;

use std::sync::Arc;

use aura_core::gate::{resolve_route, Navigation, Route};
use aura_core::store::{KeyValueStore, AUTH_FLAG_KEY};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(pages::routes())
        .merge(assistant::routes())
        .merge(api::routes())
        .fallback(fallback)
}

/// Side navigation entry.
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

/// Chrome shared by every signed-in page.
pub struct Layout {
    pub title: &'static str,
    pub nav: Vec<NavItem>,
    pub user_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Layout {
    pub fn new(state: &AppState, current: Route) -> Self {
        let user = state.gate.current_user();
        let nav = [Route::Dashboard, Route::Vitals, Route::Assistant]
            .into_iter()
            .map(|route| NavItem {
                label: route.title(),
                path: route.path(),
                active: route == current,
            })
            .collect();
        Self {
            title: current.title(),
            nav,
            user_name: user.as_ref().and_then(|u| u.display_name.clone()),
            photo_url: user.and_then(|u| u.photo_url),
        }
    }
}

/// Redirect when the session may not see `route`; `None` means render it.
pub fn guard(state: &AppState, route: Route) -> Option<Response> {
    match resolve_route(&state.gate.state(), route) {
        Navigation::Render(_) => None,
        Navigation::Redirect(to) => Some(Redirect::to(to.path()).into_response()),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = state.gate.store().get(AUTH_FLAG_KEY).await.is_ok();
    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if store_ok { "ok" } else { "degraded" },
            "storage": state.gate.store().backend_name(),
            "authenticated": state.gate.is_authenticated(),
            "llm_configured": state.insight.is_configured(),
        })),
    )
}

/// Unknown API paths get a JSON 404; every other unknown path lands on the
/// default view, which the gate then resolves again.
async fn fallback(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return ApiError::not_found(format!("no such endpoint: {}", uri.path())).into_response();
    }
    match state.gate.resolve(uri.path()) {
        Navigation::Render(route) | Navigation::Redirect(route) => {
            Redirect::to(route.path()).into_response()
        }
    }
}
