//! HTTP API for the bracket engine.
//!
//! # Modules
//!
//! - [`tournaments`]: Registration, generation, match listing and standings
//! - [`matches`]: Starting matches, reporting results and table assignment
//!
//! # Errors
//!
//! Every handler answers failures with `{"error": "..."}`. Caller mistakes
//! map to `400`, unknown matches or brackets to `404`, state conflicts to
//! `409` and everything else to `500` with storage details withheld.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod matches;
pub mod tournaments;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use bracket_engine::{BracketError, BracketManager};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BracketManager>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an engine error to its HTTP status and a client-safe message
pub fn api_error(err: BracketError) -> ApiError {
    let status = match &err {
        BracketError::InsufficientEntrants { .. }
        | BracketError::UnsupportedFormat(_)
        | BracketError::UnsupportedOrdering(_)
        | BracketError::InvalidWinner { .. }
        | BracketError::MatchNotReady(_) => StatusCode::BAD_REQUEST,
        BracketError::MatchNotFound(_) | BracketError::NotGenerated(_) => StatusCode::NOT_FOUND,
        BracketError::MatchAlreadyCompleted(_)
        | BracketError::SlotAlreadyOccupied { .. }
        | BracketError::PreservedLayoutConflict { .. } => StatusCode::CONFLICT,
        BracketError::NoOpenDestinationSlot { .. }
        | BracketError::InvalidBracket(_)
        | BracketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Create the API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                   - Health check
/// POST /api/v1/tournaments/{id}/registrations    - Register or check in an entrant
/// POST /api/v1/tournaments/{id}/bracket          - Generate a bracket
/// POST /api/v1/tournaments/{id}/bracket/regenerate - Rebuild around completed results
/// GET  /api/v1/tournaments/{id}/matches          - List matches
/// GET  /api/v1/tournaments/{id}/standings        - Per-entrant statistics and champion
/// POST /api/v1/matches/{id}/start                - Start a ready match
/// POST /api/v1/matches/{id}/result               - Report a result
/// PUT  /api/v1/matches/{id}/table                - Assign or clear a table
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/registrations",
            post(tournaments::register),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            post(tournaments::generate_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/bracket/regenerate",
            post(tournaments::regenerate_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/matches",
            get(tournaments::list_matches),
        )
        .route(
            "/tournaments/{tournament_id}/standings",
            get(tournaments::standings),
        )
        .route("/matches/{match_id}/start", post(matches::start_match))
        .route("/matches/{match_id}/result", post(matches::report_result))
        .route("/matches/{match_id}/table", put(matches::assign_table));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
