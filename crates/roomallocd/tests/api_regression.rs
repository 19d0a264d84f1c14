//! API regression tests.
//!
//! Exercises the full router the daemon serves: round listing, lifecycle
//! commands, query routes and error mapping.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use roomalloc_api::{ApiState, build_router};
use roomalloc_state::*;

fn test_state() -> ApiState {
    let store = StateStore::open_in_memory().unwrap();
    store
        .load_dataset(&Dataset {
            rounds: vec![AllocationRound {
                id: 1,
                name: "spring".into(),
                description: None,
                created_at: 1000,
            }],
            programs: vec![Program {
                id: 7,
                name: "Music".into(),
            }],
            equipment: vec![Equipment {
                id: 1,
                name: "Projector".into(),
            }],
            rooms: vec![
                Room {
                    id: 1,
                    name: "A".into(),
                    capacity: 20,
                    equipment: [1].into(),
                    hour_budget: 5,
                },
                Room {
                    id: 2,
                    name: "B".into(),
                    capacity: 40,
                    equipment: Default::default(),
                    hour_budget: 5,
                },
            ],
            subjects: vec![
                Subject {
                    id: 1,
                    name: "S1".into(),
                    program_id: 7,
                    group_size: 10,
                    equipment: [1].into(),
                    hours: 5,
                    priority: 1,
                },
                Subject {
                    id: 2,
                    name: "S2".into(),
                    program_id: 7,
                    group_size: 30,
                    equipment: Default::default(),
                    hours: 5,
                    priority: 2,
                },
            ],
        })
        .unwrap();
    ApiState::new(Arc::new(store))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Start round 1 and wait for the pass to finish.
async fn allocate(router: &Router, state: &ApiState) {
    let (status, _) = call(router, post("/api/v1/allocation/start", r#"{"allocRound":1}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    state.orchestrator.join(1).await.unwrap();
}

#[tokio::test]
async fn list_and_get_rounds() {
    let router = build_router(test_state());

    let (status, json) = call(&router, get("/api/v1/allocation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"][0]["id"], 1);

    let (status, json) = call(&router, get("/api/v1/allocation/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["round"]["name"], "spring");
    assert_eq!(json["data"]["status"]["phase"], "idle");

    let (status, json) = call(&router, get("/api/v1/allocation/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn start_allocates_and_queries_reflect_it() {
    let state = test_state();
    let router = build_router(state.clone());
    allocate(&router, &state).await;

    let (_, json) = call(&router, get("/api/v1/allocation/1/state")).await;
    assert_eq!(json["data"]["phase"], "completed");

    let (status, json) = call(&router, get("/api/v1/allocation/1/rooms/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["room_id"], 1);

    let (_, json) = call(&router, get("/api/v1/allocation/1/subjects/2")).await;
    assert_eq!(json["data"][0]["subject_id"], 2);

    let (_, json) = call(&router, get("/api/v1/allocation/1/rooms")).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][0]["remaining_hours"], 0);

    let (_, json) = call(&router, get("/api/v1/allocation/1/program")).await;
    assert_eq!(json["data"][0]["name"], "Music");
    assert_eq!(json["data"][0]["rooms"].as_array().unwrap().len(), 2);

    let (_, json) = call(&router, get("/api/v1/allocation/1/subject/unallocated")).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn commands_validate_alloc_round() {
    let router = build_router(test_state());

    for command in ["start", "abort", "reset"] {
        let uri = format!("/api/v1/allocation/{command}");
        let (status, json) = call(&router, post(&uri, "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{command}");
        assert!(json["error"].as_str().unwrap().contains("allocRound"));

        let (status, _) = call(&router, post(&uri, r#"{"allocRound":0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{command}");

        let (status, _) = call(&router, post(&uri, r#"{"allocRound":42}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{command}");
    }
}

#[tokio::test]
async fn lifecycle_conflicts_are_409() {
    let state = test_state();
    let router = build_router(state.clone());

    let (status, _) = call(&router, post("/api/v1/allocation/abort", r#"{"allocRound":1}"#)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    allocate(&router, &state).await;
    let (status, _) = call(&router, post("/api/v1/allocation/abort", r#"{"allocRound":1}"#)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reset_clears_allocations() {
    let state = test_state();
    let router = build_router(state.clone());
    allocate(&router, &state).await;

    let (status, json) = call(&router, post("/api/v1/allocation/reset", r#"{"allocRound":1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deleted"], 2);

    let (_, json) = call(&router, get("/api/v1/allocation/1/rooms")).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = call(&router, get("/api/v1/allocation/1/state")).await;
    assert_eq!(json["data"]["phase"], "idle");

    // Idempotent.
    let (status, json) = call(&router, post("/api/v1/allocation/reset", r#"{"allocRound":1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deleted"], 0);
}

#[tokio::test]
async fn eligibility_and_equipment_routes() {
    let router = build_router(test_state());

    // Before allocation both rooms are open to S2's budget, but only B seats 30.
    let (status, json) = call(&router, get("/api/v1/allocation/1/subject/2/rooms")).await;
    assert_eq!(status, StatusCode::OK);
    let rooms = json["data"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["room_id"], 2);

    // S1 would fit B on seats and hours, but B has no projector.
    let (_, json) = call(&router, get("/api/v1/allocation/1/subject/1/near-misses")).await;
    assert_eq!(json["data"][0]["room_id"], 2);
    assert_eq!(json["data"][0]["missing"][0]["name"], "Projector");

    let (status, json) = call(&router, get("/api/v1/missing-equipment/subject/1/room/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["missing"][0]["equipment_id"], 1);

    let (status, _) = call(&router, get("/api/v1/missing-equipment/subject/1/room/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_ids_are_rejected() {
    let router = build_router(test_state());
    let (status, _) = call(&router, get("/api/v1/allocation/abc/rooms")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
