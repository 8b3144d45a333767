//! Integration tests for the HTTP API.
//!
//! Every test runs against a fresh in-memory repository.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use be_server::api::{AppState, create_router};
use bracket_engine::bracket::{AdvancementOutcome, BracketSummary, Match};
use bracket_engine::{BracketManager, config::EngineConfig, db::InMemoryMatchRepository};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Helper to create a router over an empty in-memory store
fn create_test_server() -> axum::Router {
    let repository = Arc::new(InMemoryMatchRepository::new());
    let manager = Arc::new(BracketManager::new(repository, EngineConfig::default()));
    create_router(AppState { manager })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Register `n` seeded entrants and generate a bracket of the given format
async fn setup_bracket(app: &axum::Router, tournament_id: i64, n: i64, format: &str) {
    for id in 1..=n {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/tournaments/{tournament_id}/registrations"),
                json!({ "entrant_id": id, "seed": id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/tournaments/{tournament_id}/bracket"),
            json!({ "format": format, "ordering": "seeded_draw" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn list_matches(app: &axum::Router, tournament_id: i64) -> Vec<Match> {
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/v1/tournaments/{tournament_id}/matches"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn first_ready(matches: &[Match]) -> &Match {
    matches
        .iter()
        .find(|m| m.is_ready() && !m.is_completed())
        .unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

// ============================================================================
// Tournament Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_generate_and_list_matches() {
    let app = create_test_server();
    setup_bracket(&app, 1, 4, "single_elimination").await;

    let matches = list_matches(&app, 1).await;
    assert_eq!(matches.len(), 3);
    assert_eq!(matches.iter().filter(|m| m.round == 1).count(), 2);
    assert!(matches.iter().all(|m| m.tournament_id == 1));
}

#[tokio::test]
async fn test_generate_returns_summary() {
    let app = create_test_server();
    for id in 1..=8 {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/tournaments/3/registrations",
                json!({ "entrant_id": id }),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/3/bracket",
            json!({ "format": "double_elimination", "ordering": "random_draw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let summary: BracketSummary = body_json(response).await;
    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.preserved_count, 0);
}

#[tokio::test]
async fn test_unsupported_format_is_bad_request() {
    let app = create_test_server();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/1/bracket",
            json!({ "format": "swiss", "ordering": "seeded_draw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("swiss"));
}

#[tokio::test]
async fn test_insufficient_entrants_is_bad_request() {
    let app = create_test_server();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/5/registrations",
            json!({ "entrant_id": 1 }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/5/bracket",
            json!({ "format": "single_elimination", "ordering": "seeded_draw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regenerate_before_generate_is_not_found() {
    let app = create_test_server();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/9/bracket/regenerate",
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_regenerate_keeps_results() {
    let app = create_test_server();
    setup_bracket(&app, 4, 4, "single_elimination").await;

    let matches = list_matches(&app, 4).await;
    let target = first_ready(&matches);
    let winner = target.slot_a.entrant().unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", target.id),
            json!({ "score_a": 2, "score_b": 0, "winner_id": winner }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/tournaments/4/bracket/regenerate",
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary: BracketSummary = body_json(response).await;
    assert_eq!(summary.matches, 3);
    assert_eq!(summary.preserved_count, 1);
}

// ============================================================================
// Match Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_report_result_advances_winner() {
    let app = create_test_server();
    setup_bracket(&app, 2, 4, "single_elimination").await;

    let matches = list_matches(&app, 2).await;
    let target = first_ready(&matches).clone();
    let winner = target.slot_a.entrant().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", target.id),
            json!({ "score_a": 3, "score_b": 1, "winner_id": winner }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome: AdvancementOutcome = body_json(response).await;
    assert_eq!(outcome.winner_id, winner);
    assert_eq!(outcome.loser_id, target.slot_b.entrant());
    assert_eq!(outcome.champion, None);

    let matches = list_matches(&app, 2).await;
    let next_id = target.next_match_id().unwrap();
    let next = matches.iter().find(|m| m.id == next_id).unwrap();
    assert!(next.side_of(winner).is_some());

    // Second report of the same match conflicts
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", target.id),
            json!({ "score_a": 3, "score_b": 1, "winner_id": winner }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request("/api/v1/tournaments/2/standings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let standings: Value = body_json(response).await;
    assert_eq!(standings["standings"].as_array().unwrap().len(), 2);
    assert!(standings["champion"].is_null());
}

#[tokio::test]
async fn test_large_scores_are_kept_exactly() {
    let app = create_test_server();
    setup_bracket(&app, 8, 2, "single_elimination").await;

    let matches = list_matches(&app, 8).await;
    let target = first_ready(&matches);
    let winner = target.slot_a.entrant().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", target.id),
            json!({ "score_a": u32::MAX, "score_b": 3_000_000_000u32, "winner_id": winner }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: AdvancementOutcome = body_json(response).await;
    assert_eq!(outcome.champion, Some(winner));

    let matches = list_matches(&app, 8).await;
    assert_eq!(matches[0].score_a, u32::MAX);
    assert_eq!(matches[0].score_b, 3_000_000_000);
}

#[tokio::test]
async fn test_invalid_winner_is_bad_request() {
    let app = create_test_server();
    setup_bracket(&app, 6, 4, "single_elimination").await;

    let matches = list_matches(&app, 6).await;
    let target = first_ready(&matches);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", target.id),
            json!({ "score_a": 1, "score_b": 0, "winner_id": 999 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_match_is_not_found() {
    let app = create_test_server();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{}/result", uuid::Uuid::new_v4()),
            json!({ "score_a": 1, "score_b": 0, "winner_id": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_match_and_assign_table() {
    let app = create_test_server();
    setup_bracket(&app, 7, 4, "single_elimination").await;

    let matches = list_matches(&app, 7).await;
    let target_id = first_ready(&matches).id;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/matches/{target_id}/start"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/matches/{target_id}/table"),
            json!({ "table_number": 4 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let matches = list_matches(&app, 7).await;
    let target = matches.iter().find(|m| m.id == target_id).unwrap();
    assert_eq!(target.table_number, Some(4));
    assert!(!target.is_completed());
}

#[tokio::test]
async fn test_404_for_invalid_endpoint() {
    let app = create_test_server();

    let response = app
        .oneshot(get_request("/api/v1/invalid/endpoint"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
