use aura_core::auth::AuthError;
use aura_core::conversation::SendError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};

/// Application error type that renders as an HTML error page.
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("web error: {:#}", self.0);

        let body = format!(
            r#"<!doctype html>
<html><head><title>Error | Aura</title>
<style>body{{font-family:system-ui;background:#f5f5f7;color:#1d1d1f;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}}
.err{{background:#fff;padding:2rem;border-radius:16px;border-left:4px solid #ff3b30;max-width:600px;box-shadow:0 4px 12px rgba(0,0,0,0.08)}}
h1{{color:#ff3b30;margin-top:0}}pre{{white-space:pre-wrap;color:#6e6e73}}</style>
</head><body><div class="err"><h1>Something went wrong</h1><pre>{}</pre>
<p><a href="/" style="color:#007aff">Back to summary</a></p></div></body></html>"#,
            html_escape(&format!("{:#}", self.0))
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// JSON API error type for REST endpoints.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not signed in")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        let status = match &err {
            SendError::EmptyMessage => StatusCode::BAD_REQUEST,
            SendError::RequestPending => StatusCode::CONFLICT,
            SendError::Backend(_) => StatusCode::BAD_GATEWAY,
            SendError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            SendError::Cancelled => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
