//! Single elimination, and the winner bracket of double elimination.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{Layout, check_preserved_fit, halve, insert_unless_preserved};
use crate::bracket::{
    board::Board,
    errors::{BracketError, BracketResult},
    models::{Bracket, BracketType, EntrantId, Match, MatchStatus, Slot, TournamentId},
};

pub fn generate(
    board: &mut Board,
    ordered: &[EntrantId],
    now: DateTime<Utc>,
) -> BracketResult<Layout> {
    let winner_rounds = build_winner_bracket(board, ordered, now)?;
    Ok(Layout {
        winner_rounds,
        loser_rounds: Vec::new(),
    })
}

/// Build the winner bracket and return the match count of every round.
///
/// Round 1 holds `ceil(N/2)` matches, where `N` counts the entrants still to
/// be placed plus two per preserved round-1 match. With an odd number of
/// entrants to place, the first of them receives the bye and the rest pair
/// off in order. Each later round halves the previous one, rounding up; a
/// match whose second feeder does not exist gets a bye in slot B.
pub(crate) fn build_winner_bracket(
    board: &mut Board,
    ordered: &[EntrantId],
    now: DateTime<Utc>,
) -> BracketResult<Vec<u32>> {
    let tournament_id = board.tournament_id();

    // Entrants already seated in preserved matches never re-enter the draw
    let seated: HashSet<EntrantId> = board.matches().flat_map(|m| m.entrants()).collect();
    let mut pool: VecDeque<EntrantId> = ordered
        .iter()
        .copied()
        .filter(|id| !seated.contains(id))
        .collect();

    let preserved_first: BTreeSet<u32> = board
        .matches()
        .filter(|m| m.bracket_type() == BracketType::Winner && m.round == 1)
        .map(|m| m.position)
        .collect();

    let slots = pool.len() + 2 * preserved_first.len();
    if slots < 2 {
        return Err(BracketError::InsufficientEntrants {
            needed: 2,
            current: slots,
        });
    }

    let mut sizes = vec![halve(slots as u32)];
    while let Some(&last) = sizes.last()
        && last > 1
    {
        sizes.push(halve(last));
    }
    check_preserved_fit(board, BracketType::Winner, &sizes)?;

    let mut open = (0..sizes[0]).filter(|position| !preserved_first.contains(position));

    if pool.len() % 2 == 1
        && let (Some(position), Some(entrant)) = (open.next(), pool.pop_front())
    {
        board.insert(bye(tournament_id, position, entrant, now))?;
        log::debug!(
            "Tournament {}: entrant {} receives a round 1 bye",
            tournament_id,
            entrant
        );
    }

    for position in open {
        let (Some(a), Some(b)) = (pool.pop_front(), pool.pop_front()) else {
            return Err(BracketError::InvalidBracket(format!(
                "round 1 position {position} has no entrants left to place"
            )));
        };
        board.insert(
            Match::new(tournament_id, Bracket::winner(), 1, position)
                .with_slots(Slot::Entrant(a), Slot::Entrant(b)),
        )?;
    }

    for (index, &size) in sizes.iter().enumerate().skip(1) {
        let round = index as u32 + 1;
        let feeders = sizes[index - 1];
        for position in 0..size {
            let mut m = Match::new(tournament_id, Bracket::winner(), round, position);
            if 2 * position + 1 >= feeders {
                m.slot_b = Slot::Bye;
            }
            insert_unless_preserved(board, m)?;
        }
    }

    Ok(sizes)
}

/// A round-1 match decided by a bye
fn bye(tournament_id: TournamentId, position: u32, entrant: EntrantId, now: DateTime<Utc>) -> Match {
    let mut m = Match::new(tournament_id, Bracket::winner(), 1, position)
        .with_slots(Slot::Entrant(entrant), Slot::Bye);
    m.status = MatchStatus::Completed;
    m.winner_id = Some(entrant);
    m.completed_at = Some(now);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::MatchKey;

    fn build(entrants: &[EntrantId]) -> (Board, Vec<u32>) {
        let mut board = Board::new(1, Vec::new()).unwrap();
        let sizes = build_winner_bracket(&mut board, entrants, Utc::now()).unwrap();
        (board, sizes)
    }

    #[test]
    fn test_power_of_two_field() {
        let (board, sizes) = build(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(sizes, vec![4, 2, 1]);
        assert_eq!(board.len(), 7);
        assert!(board.matches().all(|m| !m.is_bye()));

        let first = board.at(MatchKey::new(BracketType::Winner, 1, 2)).unwrap();
        assert_eq!(first.slot_a, Slot::Entrant(5));
        assert_eq!(first.slot_b, Slot::Entrant(6));
    }

    #[test]
    fn test_odd_field_gives_first_entrant_the_bye() {
        let (board, sizes) = build(&[1, 2, 3, 4, 5]);
        assert_eq!(sizes, vec![3, 2, 1]);

        let bye = board.at(MatchKey::new(BracketType::Winner, 1, 0)).unwrap();
        assert_eq!(bye.status, MatchStatus::Completed);
        assert_eq!(bye.winner_id, Some(1));
        assert_eq!(bye.slot_b, Slot::Bye);

        let second = board.at(MatchKey::new(BracketType::Winner, 1, 1)).unwrap();
        assert_eq!((second.slot_a, second.slot_b), (Slot::Entrant(2), Slot::Entrant(3)));

        // Round 2 position 1 only has one feeder
        let structural = board.at(MatchKey::new(BracketType::Winner, 2, 1)).unwrap();
        assert_eq!(structural.slot_b, Slot::Bye);
        assert_eq!(structural.slot_a, Slot::Empty);
    }

    #[test]
    fn test_two_entrants_is_a_single_final() {
        let (board, sizes) = build(&[7, 9]);
        assert_eq!(sizes, vec![1]);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_preserved_entrants_are_not_redrawn() {
        let mut played = Match::new(1, Bracket::winner(), 1, 0)
            .with_slots(Slot::Entrant(1), Slot::Entrant(2));
        played.status = MatchStatus::Completed;
        played.winner_id = Some(1);

        let mut board = Board::new(1, vec![played]).unwrap();
        let sizes = build_winner_bracket(&mut board, &[1, 2, 3, 4, 5], Utc::now()).unwrap();
        assert_eq!(sizes, vec![3, 2, 1]);

        let bye = board.at(MatchKey::new(BracketType::Winner, 1, 1)).unwrap();
        assert_eq!(bye.slot_a, Slot::Entrant(3));
        assert_eq!(bye.slot_b, Slot::Bye);

        let last = board.at(MatchKey::new(BracketType::Winner, 1, 2)).unwrap();
        assert_eq!((last.slot_a, last.slot_b), (Slot::Entrant(4), Slot::Entrant(5)));
    }

    #[test]
    fn test_preserved_match_outside_layout_is_rejected() {
        let mut stray = Match::new(1, Bracket::winner(), 1, 5)
            .with_slots(Slot::Entrant(1), Slot::Entrant(2));
        stray.status = MatchStatus::Completed;
        stray.winner_id = Some(1);

        let mut board = Board::new(1, vec![stray]).unwrap();
        let err = build_winner_bracket(&mut board, &[1, 2, 3, 4], Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            BracketError::PreservedLayoutConflict { round: 1, position: 5, .. }
        ));
    }
}
