use std::sync::Arc;

use askama::Template;
use aura_core::gate::Route;
use aura_core::model::{daily_summary, dashboard_readings, HealthMetricType, MetricReading};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Local;

use crate::error::AppError;
use crate::routes::{guard, Layout};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/vitals", get(vitals))
}

// -- Templates --

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    layout: Layout,
    today: String,
    insight: String,
    cards: Vec<MetricCard>,
}

struct MetricCard {
    label: String,
    value: String,
    unit: &'static str,
    accent: &'static str,
}

impl From<&MetricReading> for MetricCard {
    fn from(reading: &MetricReading) -> Self {
        let (unit, accent) = match HealthMetricType::from_label(&reading.kind) {
            Some(HealthMetricType::Steps) => ("steps", "orange"),
            Some(HealthMetricType::HeartRate) => ("BPM", "rose"),
            Some(HealthMetricType::Sleep) => ("", "blue"),
            Some(HealthMetricType::Calories) => ("kcal", "green"),
            None => ("", "gray"),
        };
        Self {
            label: reading.kind.clone(),
            value: reading.value.to_string(),
            unit,
            accent,
        }
    }
}

#[derive(Template)]
#[template(path = "vitals.html")]
struct VitalsTemplate {
    layout: Layout,
}

// -- Handlers --

/// Daily summary. The insight is requested on every render.
async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if let Some(redirect) = guard(&state, Route::Dashboard) {
        return Ok(redirect);
    }

    let insight = state.insight.get_insight(&daily_summary()).await;

    let tmpl = DashboardTemplate {
        layout: Layout::new(&state, Route::Dashboard),
        today: Local::now().format("%A, %b %-d").to_string(),
        insight,
        cards: dashboard_readings().iter().map(MetricCard::from).collect(),
    };
    Ok(Html(tmpl.render()?).into_response())
}

async fn vitals(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if let Some(redirect) = guard(&state, Route::Vitals) {
        return Ok(redirect);
    }
    let tmpl = VitalsTemplate {
        layout: Layout::new(&state, Route::Vitals),
    };
    Ok(Html(tmpl.render()?).into_response())
}
