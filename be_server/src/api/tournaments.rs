//! Tournament-level API handlers.
//!
//! Registration, bracket generation and regeneration, match listing and
//! standings.
//!
//! # Examples
//!
//! Register an entrant:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/registrations \
//!   -H "Content-Type: application/json" \
//!   -d '{"entrant_id": 7, "seed": 2}'
//! ```
//!
//! Generate a double elimination bracket:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/bracket \
//!   -H "Content-Type: application/json" \
//!   -d '{"format": "double_elimination", "ordering": "seeded_draw"}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bracket_engine::bracket::{
    BracketError, BracketSummary, EntrantId, Match, OrderingMode, PlayerStats, Registration,
    TournamentFormat, TournamentId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{ApiError, AppState, api_error};
use crate::logging::{log_bracket_event, log_performance};

fn default_checked_in() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub entrant_id: EntrantId,
    pub seed: Option<u32>,
    #[serde(default = "default_checked_in")]
    pub checked_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub format: String,
    pub ordering: String,
}

#[derive(Debug, Serialize)]
pub struct StandingsResponse {
    pub standings: Vec<PlayerStats>,
    pub champion: Option<EntrantId>,
}

/// Register an entrant, or update an existing registration
pub async fn register(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(req): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let registration = Registration {
        entrant_id: req.entrant_id,
        seed: req.seed,
        checked_in: req.checked_in,
        registered_at: Utc::now(),
    };

    state
        .manager
        .register(tournament_id, &registration)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::CREATED)
}

/// Generate a bracket from the checked-in entrants
pub async fn generate_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<BracketSummary>), ApiError> {
    let format: TournamentFormat = req.format.parse().map_err(api_error)?;
    let ordering: OrderingMode = req.ordering.parse().map_err(api_error)?;

    let start = Instant::now();
    let summary = state
        .manager
        .generate_bracket(tournament_id, format, ordering)
        .await
        .map_err(api_error)?;

    log_performance(
        "generate_bracket",
        start.elapsed().as_millis() as u64,
        Some(format.as_str()),
    );
    log_bracket_event(
        "generated",
        tournament_id,
        &format!("{}, {} matches", format, summary.matches),
    );

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Rebuild the bracket with its stored settings around completed results
pub async fn regenerate_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketSummary>, ApiError> {
    let start = Instant::now();
    let summary = state
        .manager
        .regenerate_bracket(tournament_id)
        .await
        .map_err(api_error)?;

    log_performance(
        "regenerate_bracket",
        start.elapsed().as_millis() as u64,
        None,
    );
    log_bracket_event(
        "regenerated",
        tournament_id,
        &format!(
            "{} matches, {} preserved",
            summary.matches, summary.preserved_count
        ),
    );

    Ok(Json(summary))
}

/// List every match of a tournament in bracket order
pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Match>>, ApiError> {
    let matches = state
        .manager
        .list_matches(tournament_id)
        .await
        .map_err(api_error)?;
    Ok(Json(matches))
}

/// Per-entrant statistics plus the champion once decided
pub async fn standings(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<StandingsResponse>, ApiError> {
    let standings = state
        .manager
        .standings(tournament_id)
        .await
        .map_err(api_error)?;

    let champion = match state.manager.champion(tournament_id).await {
        Ok(champion) => champion,
        Err(BracketError::NotGenerated(_)) => None,
        Err(e) => return Err(api_error(e)),
    };

    Ok(Json(StandingsResponse {
        standings,
        champion,
    }))
}
