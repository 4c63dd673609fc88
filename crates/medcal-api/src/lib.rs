//! medcal-api - HTTP routes for classification and bulk reclassification.
//!
//! The binary in `main.rs` wires storage, the job worker, and logging; this
//! library holds the router so it can be exercised without a socket.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, warn};
use uuid::Uuid;

use medcal_core::{defaults, ClassifyEventRequest, JobStatusResponse, ReclassifyFilter};
use medcal_jobs::{ReclassifyService, WorkerEvent};

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub service: ReclassifyService,
}

impl AppState {
    pub fn new(service: ReclassifyService) -> Self {
        Self { service }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/calendar/reclassify", post(submit_reclassify))
        .route("/api/calendar/reclassify/jobs", get(list_jobs))
        .route("/api/calendar/reclassify/jobs/:id", get(get_job))
        .route("/api/calendar/classify", post(classify_event))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .with_state(state)
}

/// CORS origin whitelist from `ALLOWED_ORIGINS` (comma-separated).
pub fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
    if origins_str.trim().is_empty() {
        return vec![HeaderValue::from_static("http://localhost:3000")];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

/// Log every failed job reported by the worker until the worker stops.
/// Returns how many failures were logged.
pub async fn log_failed_jobs(mut events: broadcast::Receiver<WorkerEvent>) -> usize {
    let mut failures = 0;
    loop {
        match events.recv().await {
            Ok(WorkerEvent::JobFailed { job_id, error, .. }) => {
                failures += 1;
                warn!(%job_id, %error, "Reclassification job failed; resubmit to recover");
            }
            Ok(_) => {}
            // A burst of progress events can overflow the channel; keep listening.
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Worker event listener lagged");
            }
            Err(RecvError::Closed) => return failures,
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn submit_reclassify(
    State(state): State<AppState>,
    body: Result<Json<ReclassifyFilter>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(filter) = body?;
    let submitted = state.service.submit(filter).await?;
    Ok((StatusCode::ACCEPTED, Json(submitted)))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.service.status(id).await?;
    Ok(Json(JobStatusResponse { job }))
}

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    limit: Option<usize>,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(defaults::JOB_LIST_LIMIT)
        .clamp(1, defaults::JOB_LIST_LIMIT);
    let jobs = state.service.list_recent(limit).await?;
    Ok(Json(serde_json::json!({ "jobs": jobs })))
}

async fn classify_event(
    State(state): State<AppState>,
    body: Result<Json<ClassifyEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let response = state.service.classify_single_event(request).await?;
    Ok(Json(response))
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by route handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(medcal_core::Error),
    NotFound(String),
    BadRequest(String),
}

impl From<medcal_core::Error> for ApiError {
    fn from(err: medcal_core::Error) -> Self {
        match &err {
            medcal_core::Error::EventNotFound(_)
            | medcal_core::Error::JobNotFound(_) => ApiError::NotFound(err.to_string()),
            medcal_core::Error::Validation(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
