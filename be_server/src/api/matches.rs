//! Match-level API handlers.
//!
//! Results move the winner (and in double elimination the loser) into their
//! destination matches in the same request.
//!
//! # Examples
//!
//! Report a result:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches/MATCH_ID/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"score_a": 3, "score_b": 1, "winner_id": 7}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bracket_engine::bracket::{AdvancementOutcome, EntrantId, MatchId, MatchReport};
use serde::Deserialize;

use super::{ApiError, AppState, api_error};
use crate::logging::log_bracket_event;

#[derive(Debug, Deserialize)]
pub struct ResultRequest {
    pub score_a: u32,
    pub score_b: u32,
    pub winner_id: EntrantId,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub table_number: Option<u32>,
}

/// Mark a ready match as in progress
pub async fn start_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .start_match(match_id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::OK)
}

/// Report the result of a match and advance both entrants
pub async fn report_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(req): Json<ResultRequest>,
) -> Result<Json<AdvancementOutcome>, ApiError> {
    let outcome = state
        .manager
        .report_result(MatchReport {
            match_id,
            score_a: req.score_a,
            score_b: req.score_b,
            winner_id: req.winner_id,
        })
        .await
        .map_err(api_error)?;

    if outcome.reset_created.is_some() || outcome.champion.is_some() {
        let tournament_id = state
            .manager
            .get_match(match_id)
            .await
            .map(|m| m.tournament_id)
            .map_err(api_error)?;

        if outcome.reset_created.is_some() {
            log_bracket_event(
                "reset",
                tournament_id,
                &format!("grand final reset after entrant {} won", outcome.winner_id),
            );
        }
        if let Some(champion) = outcome.champion {
            log_bracket_event("champion", tournament_id, &format!("entrant {champion}"));
        }
    }

    Ok(Json(outcome))
}

/// Assign a table to a match, or clear it with `null`
pub async fn assign_table(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(req): Json<TableRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .assign_table(match_id, req.table_number)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::OK)
}
