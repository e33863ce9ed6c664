//! HTTP trigger for scheduled runs

use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineReport, RunOptions};
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State shared with the cron handler.
#[derive(Clone)]
pub struct CronState {
    pipeline: Arc<Mutex<Pipeline>>,
    secret: Option<String>,
}

impl CronState {
    pub fn new(pipeline: Pipeline, secret: Option<String>) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = &self.secret else {
            return true;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", secret))
            .unwrap_or(false)
    }
}

pub fn router(state: CronState) -> Router {
    Router::new()
        .route("/api/cron", get(handle_cron))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .with_state(state)
}

async fn handle_cron(State(state): State<CronState>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        warn!("Rejected cron trigger with missing or wrong secret");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
    }

    // A second trigger must not start a parallel pass.
    let Ok(pipeline) = state.pipeline.try_lock() else {
        warn!("Cron trigger arrived while a run is in progress");
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Conflict", "message": "A run is already in progress" })),
        )
            .into_response();
    };

    info!("Starting cron job execution...");
    match pipeline.run(RunOptions::default()).await {
        Ok(report) => (StatusCode::OK, Json(cron_body(&report))).into_response(),
        Err(e) => {
            error!("Error in cron job: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Response body for a finished pass; `results` only once something was dispatched.
pub fn cron_body(report: &PipelineReport) -> serde_json::Value {
    let mut body = json!({
        "success": report.success,
        "message": report.message,
        "jobsScraped": report.jobs_scraped,
        "jobsMatched": report.jobs_matched,
        "jobsApplied": report.jobs_applied,
    });
    if let Some(receipt) = &report.receipt {
        body["results"] = json!(receipt);
    }
    body
}

pub async fn serve(bind: &str, state: CronState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", bind);
    info!("Trigger: GET http://{}/api/cron", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
