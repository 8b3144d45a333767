//! Regeneration: rebuild a bracket around its completed results.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{
    advancement::Advancer,
    board::{Board, BoardChanges},
    errors::{BracketError, BracketResult},
    generator, linker,
    models::{
        BracketSummary, EntrantId, Match, MatchId, MatchKey, TournamentFormat, TournamentId,
    },
    validation::validate_bracket,
};

/// A validated bracket ready to be written
#[derive(Debug, Clone)]
pub struct Rebuild {
    pub changes: BoardChanges,
    /// Existing matches that survive; every other stored match is dropped
    pub retained: Vec<MatchId>,
    pub summary: BracketSummary,
}

/// Split stored matches into the ones that must survive and the rest.
///
/// Played matches always survive. A bye survives only when its winner went
/// on to play a later match; otherwise the bye is rebuilt and may go to
/// another entrant after the new draw.
pub fn freeze(existing: Vec<Match>) -> (Vec<Match>, Vec<Match>) {
    // Latest played match of every entrant
    let mut latest: HashMap<EntrantId, MatchKey> = HashMap::new();
    for m in existing.iter().filter(|m| m.is_completed() && !m.is_bye()) {
        for entrant in m.entrants() {
            let key = latest.entry(entrant).or_insert(m.key());
            *key = (*key).max(m.key());
        }
    }

    existing.into_iter().partition(|m| {
        m.is_completed()
            && (!m.is_bye()
                || m.winner_id
                    .and_then(|winner| latest.get(&winner))
                    .is_some_and(|key| *key > m.key()))
    })
}

/// Generate, link, seat and validate a bracket around preserved matches
///
/// # Arguments
///
/// * `tournament_id` - Tournament being rebuilt
/// * `format` - Tournament format
/// * `ordered` - Checked-in entrants in placement order
/// * `existing` - Every stored match of the tournament
/// * `now` - Completion time stamped on new byes
pub fn rebuild(
    tournament_id: TournamentId,
    format: TournamentFormat,
    ordered: &[EntrantId],
    existing: Vec<Match>,
    now: DateTime<Utc>,
) -> BracketResult<Rebuild> {
    let (frozen, dropped) = freeze(existing);
    let retained: Vec<MatchId> = frozen.iter().map(|m| m.id).collect();
    if !frozen.is_empty() || !dropped.is_empty() {
        log::debug!(
            "Tournament {}: preserving {} completed matches, dropping {}",
            tournament_id,
            frozen.len(),
            dropped.len()
        );
    }

    let tables: HashMap<MatchKey, u32> = dropped
        .iter()
        .filter(|m| !m.is_completed())
        .filter_map(|m| m.table_number.map(|table| (m.key(), table)))
        .collect();

    let mut board = Board::new(tournament_id, frozen)?;
    let layout = generator::generate(format, &mut board, ordered, now)?;
    linker::link(&mut board, format).map_err(|e| blame_preserved(&board, &retained, e))?;
    let reseated = Advancer::new(&mut board, format, now).reseat_completed();
    reseated.map_err(|e| blame_preserved(&board, &retained, e))?;
    validate_bracket(&board, format)?;
    carry_tables(&mut board, &tables);

    let summary = BracketSummary {
        format,
        rounds: layout.rounds(),
        loser_rounds: layout.loser_round_count(),
        matches: board.len(),
        preserved_count: retained.len(),
    };

    Ok(Rebuild {
        changes: board.into_changes(),
        retained,
        summary,
    })
}

/// Report a destination that preserved results already fill as a layout
/// conflict at the first preserved match blocking it
fn blame_preserved(board: &Board, retained: &[MatchId], err: BracketError) -> BracketError {
    let blocker = match &err {
        BracketError::NoOpenDestinationSlot { bracket, round } => board
            .round(*bracket, *round)
            .into_iter()
            .find(|m| retained.contains(&m.id))
            .map(Match::key),
        BracketError::SlotAlreadyOccupied { match_id, .. } if retained.contains(match_id) => {
            board.get(*match_id).map(Match::key)
        }
        _ => None,
    };

    match blocker {
        Some(MatchKey {
            bracket,
            round,
            position,
        }) => {
            log::warn!(
                "Tournament {}: {} blocked by preserved match at {}",
                board.tournament_id(),
                err,
                MatchKey::new(bracket, round, position)
            );
            BracketError::PreservedLayoutConflict {
                bracket,
                round,
                position,
            }
        }
        None => err,
    }
}

/// Give rebuilt open matches the table of the match they replace
fn carry_tables(board: &mut Board, tables: &HashMap<MatchKey, u32>) {
    for (key, table) in tables {
        if let Some(m) = board
            .id_at(*key)
            .and_then(|id| board.get_mut(id))
            .filter(|m| !m.is_completed() && m.table_number.is_none())
        {
            m.table_number = Some(*table);
        }
    }
}
