//! Format generators.
//!
//! Each generator adds the matches of its format to a [`Board`] that already
//! holds the preserved (completed) matches. Generators never touch preserved
//! matches; they skip occupied `(bracket, round, position)` keys and leave
//! linkage to the [`linker`](super::linker).

pub mod double;
pub mod round_robin;
pub mod single;

use chrono::{DateTime, Utc};

use super::{
    board::Board,
    errors::{BracketError, BracketResult},
    models::{BracketType, EntrantId, Match, MatchKey, TournamentFormat},
};

/// Shape of a generated bracket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Match count of each winner-bracket round, round 1 first
    pub winner_rounds: Vec<u32>,
    /// Match count of each loser-bracket round
    pub loser_rounds: Vec<u32>,
}

impl Layout {
    pub fn rounds(&self) -> u32 {
        self.winner_rounds.len() as u32
    }

    pub fn loser_round_count(&self) -> u32 {
        self.loser_rounds.len() as u32
    }
}

/// Run the generator for `format`
///
/// # Arguments
///
/// * `format` - Tournament format
/// * `board` - Board holding the preserved matches; new matches are added to it
/// * `ordered` - Entrants in placement order
/// * `now` - Completion time stamped on byes
pub fn generate(
    format: TournamentFormat,
    board: &mut Board,
    ordered: &[EntrantId],
    now: DateTime<Utc>,
) -> BracketResult<Layout> {
    match format {
        TournamentFormat::SingleElimination => single::generate(board, ordered, now),
        TournamentFormat::DoubleElimination => double::generate(board, ordered, now),
        TournamentFormat::RoundRobin => round_robin::generate(board, ordered),
    }
}

/// Insert `m` unless a preserved match already occupies its key
pub(crate) fn insert_unless_preserved(board: &mut Board, m: Match) -> BracketResult<bool> {
    if board.at(m.key()).is_some() {
        return Ok(false);
    }
    board.insert(m)?;
    Ok(true)
}

/// Fail when a preserved match of `bracket` falls outside the new layout
pub(crate) fn check_preserved_fit(
    board: &Board,
    bracket: BracketType,
    round_sizes: &[u32],
) -> BracketResult<()> {
    let outside = board.matches().map(Match::key).find(|key| {
        key.bracket == bracket
            && (key.round as usize)
                .checked_sub(1)
                .and_then(|index| round_sizes.get(index))
                .is_none_or(|&size| key.position >= size)
    });

    match outside {
        Some(MatchKey {
            bracket,
            round,
            position,
        }) => Err(BracketError::PreservedLayoutConflict {
            bracket,
            round,
            position,
        }),
        None => Ok(()),
    }
}

/// Next round size when halving a field; odd fields leave a bye at the end
pub(crate) fn halve(size: u32) -> u32 {
    size.div_ceil(2)
}
