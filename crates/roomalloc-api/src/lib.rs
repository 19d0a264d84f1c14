//! roomalloc-api — REST API for RoomAlloc.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/allocation` | List allocation rounds |
//! | GET | `/api/v1/allocation/{id}` | Round with its lifecycle status |
//! | GET | `/api/v1/allocation/{id}/state` | Lifecycle status only |
//! | GET | `/api/v1/allocation/{id}/rooms` | Rooms with allocated hours |
//! | GET | `/api/v1/allocation/{id}/program` | Rooms and subjects per program |
//! | GET | `/api/v1/allocation/{id}/rooms/{subject_id}` | Rooms a subject is allocated to |
//! | GET | `/api/v1/allocation/{id}/subjects/{room_id}` | Subjects allocated to a room |
//! | GET | `/api/v1/allocation/{id}/subject/unallocated` | Subjects without a room |
//! | GET | `/api/v1/allocation/{id}/subject/{subject_id}/rooms` | Eligible rooms for a subject |
//! | GET | `/api/v1/allocation/{id}/subject/{subject_id}/near-misses` | Rooms short only on equipment |
//! | POST | `/api/v1/allocation/start` | Start a round (`{"allocRound": n}`) |
//! | POST | `/api/v1/allocation/abort` | Abort a running round |
//! | POST | `/api/v1/allocation/reset` | Reset a round |
//! | GET | `/api/v1/missing-equipment/subject/{sid}/room/{rid}` | Equipment a room lacks |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use roomalloc_query::QueryService;
use roomalloc_round::RoundOrchestrator;
use roomalloc_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: RoundOrchestrator<StateStore>,
    pub queries: QueryService<StateStore>,
}

impl ApiState {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            orchestrator: RoundOrchestrator::new(store.clone()),
            queries: QueryService::new(store),
        }
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/allocation", get(handlers::list_rounds))
        .route("/allocation/start", post(handlers::start_round))
        .route("/allocation/abort", post(handlers::abort_round))
        .route("/allocation/reset", post(handlers::reset_round))
        .route("/allocation/{id}", get(handlers::get_round))
        .route("/allocation/{id}/state", get(handlers::round_state))
        .route("/allocation/{id}/rooms", get(handlers::allocated_rooms))
        .route("/allocation/{id}/program", get(handlers::rooms_by_program))
        .route("/allocation/{id}/rooms/{subject_id}", get(handlers::rooms_for_subject))
        .route("/allocation/{id}/subjects/{room_id}", get(handlers::subjects_in_room))
        .route("/allocation/{id}/subject/unallocated", get(handlers::unallocated_subjects))
        .route("/allocation/{id}/subject/{subject_id}/rooms", get(handlers::eligible_rooms))
        .route(
            "/allocation/{id}/subject/{subject_id}/near-misses",
            get(handlers::equipment_near_misses),
        )
        .route(
            "/missing-equipment/subject/{subject_id}/room/{room_id}",
            get(handlers::missing_equipment),
        )
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
