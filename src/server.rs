// src/server.rs
// =============================================================================
// The HTTP API around the batch runner.
//
// Routes:
// - POST /scrape-emails  run a batch job, answer with results + counters
// - GET  /health         liveness probe
//
// The handlers only validate the request and translate to/from JSON. All of
// the crawling happens in crate::batch.
// =============================================================================

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode as HttpStatus,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::batch::BatchRunner;
use crate::config::CrawlSettings;
use crate::models::{BatchJob, BatchSummary};

#[derive(Clone)]
pub struct AppState {
    pub runner: BatchRunner,
    pub settings: CrawlSettings,
    /// Fired on shutdown so in-flight batches wind down
    pub shutdown: CancellationToken,
}

// A request we refuse to run, rendered as {"error": "..."} with a 400
#[derive(Debug)]
pub struct BadRequest(String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (HttpStatus::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/scrape-emails", post(scrape_emails))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "email-scout"
    }))
}

async fn scrape_emails(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchSummary>, BadRequest> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable batch request");
        BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    })?;
    let job = parse_job(body)?;
    let settings = job.settings(&state.settings);

    info!(
        websites = job.websites.len(),
        max_workers = settings.max_workers,
        page_budget = settings.page_budget,
        "batch request received"
    );

    let summary = state
        .runner
        .run(&job.websites, &settings, &state.shutdown)
        .await;

    Ok(Json(summary))
}

// Validates the raw body, with a specific message for the common mistakes
fn parse_job(body: Value) -> Result<BatchJob, BadRequest> {
    match body.get("websites") {
        None | Some(Value::Null) => {
            return Err(BadRequest("Missing websites data".to_string()));
        }
        Some(Value::Array(_)) => {}
        Some(_) => return Err(BadRequest("Websites must be a list".to_string())),
    }

    serde_json::from_value(body).map_err(|e| {
        warn!(error = %e, "rejected batch request");
        BadRequest(format!("Invalid batch request: {}", e))
    })
}

// Binds the listener and serves until Ctrl+C
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    info!("Starting server on {}", bind);
    info!("Health check: http://{}/health", bind);

    let shutdown = state.shutdown.clone();
    let app = build_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeFetcher;
    use crate::fetch::HtmlAnchorParser;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(fetcher: FakeFetcher) -> Router {
        build_app(AppState {
            runner: BatchRunner::new(Arc::new(fetcher), Arc::new(HtmlAnchorParser)),
            settings: CrawlSettings::default(),
            shutdown: CancellationToken::new(),
        })
    }

    async fn post_json(app: Router, body: &str) -> (HttpStatus, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape-emails")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(FakeFetcher::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatus::OK);
    }

    #[tokio::test]
    async fn test_scrape_emails_returns_summary() {
        let fetcher = FakeFetcher::new().page("https://acme.test", "<footer>sales@acme.test</footer>");
        let body = r#"{
            "websites": [
                {"Name": "Acme", "Website": "https://acme.test", "Email": null, "Description": "Tools"},
                {"Name": "Known", "Website": "https://known.test", "Email": "hi@known.test"}
            ],
            "max_workers": 2
        }"#;

        let (status, json) = post_json(app(fetcher), body).await;

        assert_eq!(status, HttpStatus::OK);
        assert_eq!(json["total_websites"], 2);
        assert_eq!(json["found_emails"], 2);
        assert_eq!(json["errors"], 0);
        assert_eq!(json["results"][0]["email"], "sales@acme.test");
        assert_eq!(json["results"][0]["status"], "found_via_known_page");
        assert_eq!(json["results"][1]["status"], "already_known");
        assert!(json["processing_time_seconds"].is_number());
    }

    #[tokio::test]
    async fn test_missing_websites_is_rejected() {
        let (status, json) = post_json(app(FakeFetcher::new()), r#"{"max_workers": 2}"#).await;
        assert_eq!(status, HttpStatus::BAD_REQUEST);
        assert_eq!(json["error"], "Missing websites data");
    }

    #[tokio::test]
    async fn test_non_list_websites_is_rejected() {
        let (status, json) = post_json(app(FakeFetcher::new()), r#"{"websites": "nope"}"#).await;
        assert_eq!(status, HttpStatus::BAD_REQUEST);
        assert_eq!(json["error"], "Websites must be a list");
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_body() {
        let (status, json) = post_json(app(FakeFetcher::new()), r#"{"websites": ["#).await;
        assert_eq!(status, HttpStatus::BAD_REQUEST);

        let message = json["error"].as_str().unwrap_or_default();
        assert!(message.starts_with("Invalid JSON body"), "got {:?}", message);
    }
}
