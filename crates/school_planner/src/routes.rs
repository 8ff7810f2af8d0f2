//! HTTP surface of the planner.

use std::sync::Arc;

use axum::body::Bytes;
use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

use school_api_client::{AssociationType, FileModel, SchoolApiError};

use crate::PlannerService;
use crate::domains::calendar::CalendarPayload;
use crate::domains::upload::SubmissionUpload;
use crate::domains::videoconference::{StartOptions, messages};
use crate::error::PlannerError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct AppState {
    pub planner: PlannerService,
    /// `None` when no recorder is installed (tests).
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub school_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub filename: String,
    #[serde(default)]
    pub association_type: AssociationType,
    /// Comma separated user ids.
    #[serde(default)]
    pub team_members: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConferenceLink {
    pub url: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/planner/calendar", get(calendar))
        .route("/videoconference/event/{id}", get(videoconference_state))
        .route("/videoconference/event/{id}/start", post(start_conference))
        .route("/videoconference/event/{id}/join", post(join_conference))
        .route("/homework/submit/{submission_id}/upload", post(upload_file))
        .with_state(state)
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarPayload>, (StatusCode, String)> {
    state
        .planner
        .calendar(&query.school_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn videoconference_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let ui = state
        .planner
        .videoconference_ui(&id)
        .await
        .map_err(map_videoconference_err)?;
    Ok(match ui {
        Some(action) => Json(action).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[debug_handler]
async fn start_conference(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(options): Json<StartOptions>,
) -> Result<Json<ConferenceLink>, (StatusCode, String)> {
    state
        .planner
        .start_conference(&id, options)
        .await
        .map(|url| Json(ConferenceLink { url }))
        .map_err(map_videoconference_err)
}

#[debug_handler]
async fn join_conference(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConferenceLink>, (StatusCode, String)> {
    state
        .planner
        .join_conference(&id)
        .await
        .map(|url| Json(ConferenceLink { url }))
        .map_err(map_videoconference_err)
}

#[debug_handler]
async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FileModel>, (StatusCode, String)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let upload = SubmissionUpload {
        filename: query.filename,
        content_type,
        bytes: body.to_vec(),
        owner: non_empty(query.owner),
        parent: non_empty(query.parent),
        submission_id,
        association: query.association_type,
        team_members: split_members(query.team_members.as_deref()),
    };
    state
        .planner
        .upload_submission_file(upload)
        .await
        .map(Json)
        .map_err(map_err)
}

/// Empty query values such as `parent=` count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_members(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub fn status_for(e: &PlannerError) -> StatusCode {
    match e {
        PlannerError::SchoolNotFound(_) | PlannerError::StateUnresolved(_) => {
            StatusCode::NOT_FOUND
        }
        PlannerError::Validation(_) => StatusCode::BAD_REQUEST,
        PlannerError::UpstreamUnavailable(inner) => match inner {
            SchoolApiError::NotFound(_) => StatusCode::NOT_FOUND,
            SchoolApiError::Auth(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_GATEWAY,
        },
        PlannerError::HolidayDataMissing { .. }
        | PlannerError::SchoolYearNotFound(_)
        | PlannerError::InvalidDate(_)
        | PlannerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn map_err(e: PlannerError) -> (StatusCode, String) {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(error = %e, %status, "request failed");
    }
    (status, e.to_string())
}

/// Upstream failures show the generic conference message instead of details.
fn map_videoconference_err(e: PlannerError) -> (StatusCode, String) {
    let status = status_for(&e);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => (status, e.to_string()),
        StatusCode::FORBIDDEN => (status, messages::NO_PERMISSION.to_string()),
        _ => {
            tracing::error!(error = %e, %status, "videoconference request failed");
            (status, messages::GENERAL_ERROR.to_string())
        }
    }
}
