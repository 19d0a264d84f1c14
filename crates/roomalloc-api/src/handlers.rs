//! REST API handlers.
//!
//! Lifecycle commands go through the `RoundOrchestrator`; everything else
//! is a read through the `QueryService`. All responses share the
//! `{success, data, error}` envelope.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use roomalloc_query::QueryError;
use roomalloc_round::{RoundError, RoundStatus};
use roomalloc_state::{AllocationRound, RoomId, RoundId, SubjectId};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn round_error(e: RoundError) -> Response {
    let status = match &e {
        RoundError::Validation(_) => StatusCode::BAD_REQUEST,
        RoundError::NotFound(_) => StatusCode::NOT_FOUND,
        RoundError::InvalidState { .. } => StatusCode::CONFLICT,
        RoundError::Store(_) => {
            error!(error = %e, "round command failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(&e.to_string(), status)
}

fn query_error(e: QueryError) -> Response {
    let status = match &e {
        QueryError::Validation(_) => StatusCode::BAD_REQUEST,
        QueryError::NotFound(_) => StatusCode::NOT_FOUND,
        QueryError::Store(_) => {
            error!(error = %e, "query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(&e.to_string(), status)
}

fn respond<T: serde::Serialize>(result: Result<T, QueryError>) -> Response {
    match result {
        Ok(data) => ApiResponse::ok(data).into_response(),
        Err(e) => query_error(e),
    }
}

// ── Rounds ─────────────────────────────────────────────────────

/// A round together with its lifecycle status.
#[derive(serde::Serialize)]
pub struct RoundDetail {
    pub round: AllocationRound,
    pub status: RoundStatus,
}

/// GET /api/v1/allocation
pub async fn list_rounds(State(state): State<ApiState>) -> Response {
    respond(state.queries.list_rounds())
}

/// GET /api/v1/allocation/{id}
pub async fn get_round(State(state): State<ApiState>, Path(id): Path<RoundId>) -> Response {
    let round = match state.queries.get_round(id) {
        Ok(round) => round,
        Err(e) => return query_error(e),
    };
    match state.orchestrator.status(id).await {
        Ok(status) => ApiResponse::ok(RoundDetail { round, status }).into_response(),
        Err(e) => round_error(e),
    }
}

/// GET /api/v1/allocation/{id}/state
pub async fn round_state(State(state): State<ApiState>, Path(id): Path<RoundId>) -> Response {
    match state.orchestrator.status(id).await {
        Ok(status) => ApiResponse::ok(status).into_response(),
        Err(e) => round_error(e),
    }
}

// ── Commands ───────────────────────────────────────────────────

/// Body of the start/abort/reset commands.
#[derive(Debug, serde::Deserialize)]
pub struct RoundRequest {
    #[serde(rename = "allocRound", default)]
    pub alloc_round: Option<RoundId>,
}

/// Pull `allocRound` out of a command body. Empty, malformed and missing
/// values are all rejected as bad requests.
fn parse_round_request(body: &Bytes, command: &str) -> Result<RoundId, Response> {
    let request: RoundRequest = serde_json::from_slice(body).map_err(|e| {
        error_response(
            &format!("invalid {command} request body: {e}"),
            StatusCode::BAD_REQUEST,
        )
    })?;
    request.alloc_round.ok_or_else(|| {
        error_response(
            &format!("missing required parameter allocRound ({command})"),
            StatusCode::BAD_REQUEST,
        )
    })
}

/// POST /api/v1/allocation/start
pub async fn start_round(State(state): State<ApiState>, body: Bytes) -> Response {
    let round_id = match parse_round_request(&body, "start") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = state.orchestrator.start(round_id).await {
        return round_error(e);
    }
    match state.orchestrator.status(round_id).await {
        Ok(status) => (StatusCode::ACCEPTED, ApiResponse::ok(status)).into_response(),
        Err(e) => round_error(e),
    }
}

/// POST /api/v1/allocation/abort
pub async fn abort_round(State(state): State<ApiState>, body: Bytes) -> Response {
    let round_id = match parse_round_request(&body, "abort") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = state.orchestrator.abort(round_id).await {
        return round_error(e);
    }
    match state.orchestrator.status(round_id).await {
        Ok(status) => (StatusCode::ACCEPTED, ApiResponse::ok(status)).into_response(),
        Err(e) => round_error(e),
    }
}

/// POST /api/v1/allocation/reset
pub async fn reset_round(State(state): State<ApiState>, body: Bytes) -> Response {
    let round_id = match parse_round_request(&body, "reset") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.orchestrator.reset(round_id).await {
        Ok(deleted) => ApiResponse::ok(serde_json::json!({
            "allocRound": round_id,
            "deleted": deleted,
            "status": "reset"
        }))
        .into_response(),
        Err(e) => round_error(e),
    }
}

// ── Rooms ──────────────────────────────────────────────────────

/// GET /api/v1/allocation/{id}/rooms
pub async fn allocated_rooms(State(state): State<ApiState>, Path(id): Path<RoundId>) -> Response {
    respond(state.queries.allocated_rooms(id))
}

/// GET /api/v1/allocation/{id}/program
pub async fn rooms_by_program(State(state): State<ApiState>, Path(id): Path<RoundId>) -> Response {
    respond(state.queries.rooms_by_program(id))
}

/// GET /api/v1/allocation/{id}/rooms/{subject_id}
pub async fn rooms_for_subject(
    State(state): State<ApiState>,
    Path((id, subject_id)): Path<(RoundId, SubjectId)>,
) -> Response {
    respond(state.queries.allocated_rooms_for_subject(id, subject_id))
}

// ── Subjects ───────────────────────────────────────────────────

/// GET /api/v1/allocation/{id}/subjects/{room_id}
pub async fn subjects_in_room(
    State(state): State<ApiState>,
    Path((id, room_id)): Path<(RoundId, RoomId)>,
) -> Response {
    respond(state.queries.subjects_in_room(id, room_id))
}

/// GET /api/v1/allocation/{id}/subject/unallocated
pub async fn unallocated_subjects(
    State(state): State<ApiState>,
    Path(id): Path<RoundId>,
) -> Response {
    respond(state.queries.unallocated_subjects(id))
}

/// GET /api/v1/allocation/{id}/subject/{subject_id}/rooms
pub async fn eligible_rooms(
    State(state): State<ApiState>,
    Path((id, subject_id)): Path<(RoundId, SubjectId)>,
) -> Response {
    respond(state.queries.eligible_rooms_for_subject(id, subject_id))
}

// ── Equipment ──────────────────────────────────────────────────

/// GET /api/v1/allocation/{id}/subject/{subject_id}/near-misses
pub async fn equipment_near_misses(
    State(state): State<ApiState>,
    Path((id, subject_id)): Path<(RoundId, SubjectId)>,
) -> Response {
    respond(state.queries.equipment_near_misses(id, subject_id))
}

/// GET /api/v1/missing-equipment/subject/{subject_id}/room/{room_id}
pub async fn missing_equipment(
    State(state): State<ApiState>,
    Path((subject_id, room_id)): Path<(SubjectId, RoomId)>,
) -> Response {
    respond(state.queries.missing_equipment(subject_id, room_id))
}
