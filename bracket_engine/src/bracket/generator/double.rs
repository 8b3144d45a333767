//! Double elimination: winner bracket, loser bracket and grand final.
//!
//! With `W` winner-bracket rounds the loser bracket has `2 * (W - 1)` rounds.
//! Round 1 pairs the winner-bracket round-1 losers two-to-one. After that,
//! even rounds are drop-in rounds, where the loser-bracket survivor (slot A)
//! meets a fresh loser from winner-bracket round `k / 2 + 1` (slot B), and odd
//! rounds halve the surviving field. The last drop-in round holds a single
//! match, the loser-bracket final, which receives the winner-bracket final's
//! loser.

use chrono::{DateTime, Utc};

use super::{Layout, check_preserved_fit, halve, insert_unless_preserved, single};
use crate::bracket::{
    board::Board,
    errors::BracketResult,
    models::{Bracket, BracketType, EntrantId, Match, MatchKey, Slot, SlotSide},
};

pub fn generate(
    board: &mut Board,
    ordered: &[EntrantId],
    now: DateTime<Utc>,
) -> BracketResult<Layout> {
    let winner_rounds = single::build_winner_bracket(board, ordered, now)?;
    let loser_rounds = build_loser_bracket(board, &winner_rounds)?;
    build_grand_final(board)?;

    Ok(Layout {
        winner_rounds,
        loser_rounds,
    })
}

/// Where a loser-bracket slot gets its entrant from
#[derive(Debug, Clone, Copy)]
enum Feeder {
    /// Loser of a winner-bracket match
    Dropped { round: u32, position: u32 },
    /// Winner of a loser-bracket match
    Survivor { position: u32 },
}

/// Build the loser bracket and return the match count of every round.
///
/// A feeder that can never produce an entrant (a bye, a missing position, or
/// a loser-bracket match that was itself never created) turns the slot it
/// would feed into a bye. A match with no live feeder at all is not created.
fn build_loser_bracket(board: &mut Board, winner_rounds: &[u32]) -> BracketResult<Vec<u32>> {
    let tournament_id = board.tournament_id();
    let rounds = winner_rounds.len().saturating_sub(1) * 2;

    let mut sizes = Vec::with_capacity(rounds);
    // Whether each match of the previous loser round exists
    let mut previous: Vec<bool> = Vec::new();

    for round in 1..=rounds as u32 {
        let size = if round == 1 {
            halve(winner_rounds[0])
        } else if round % 2 == 0 {
            winner_rounds[(round / 2) as usize]
        } else {
            halve(previous.len() as u32)
        };

        let mut current = Vec::with_capacity(size as usize);
        for position in 0..size {
            let key = MatchKey::new(BracketType::Loser, round, position);
            if board.at(key).is_some() {
                current.push(true);
                continue;
            }

            let (a, b) = feeders(round, position);
            let a_live = is_live(board, &previous, a);
            let b_live = is_live(board, &previous, b);
            if !a_live && !b_live {
                current.push(false);
                continue;
            }

            let mut m = Match::new(tournament_id, Bracket::Loser, round, position);
            if !a_live {
                m.slot_a = Slot::Bye;
            }
            if !b_live {
                m.slot_b = Slot::Bye;
            }
            board.insert(m)?;
            current.push(true);
        }

        sizes.push(size);
        previous = current;
    }

    check_preserved_fit(board, BracketType::Loser, &sizes)?;
    Ok(sizes)
}

/// Feeders of slot A and slot B of a loser-bracket match
fn feeders(round: u32, position: u32) -> (Feeder, Feeder) {
    if round == 1 {
        (
            Feeder::Dropped { round: 1, position: 2 * position },
            Feeder::Dropped { round: 1, position: 2 * position + 1 },
        )
    } else if round % 2 == 0 {
        (
            Feeder::Survivor { position },
            Feeder::Dropped { round: round / 2 + 1, position },
        )
    } else {
        (
            Feeder::Survivor { position: 2 * position },
            Feeder::Survivor { position: 2 * position + 1 },
        )
    }
}

fn is_live(board: &Board, previous: &[bool], feeder: Feeder) -> bool {
    match feeder {
        Feeder::Dropped { round, position } => board
            .at(MatchKey::new(BracketType::Winner, round, position))
            .is_some_and(|m| !m.is_bye()),
        Feeder::Survivor { position } => previous.get(position as usize).copied().unwrap_or(false),
    }
}

/// Create the grand final, and recreate a pending reset when a preserved
/// grand final was won from the loser-bracket side
fn build_grand_final(board: &mut Board) -> BracketResult<()> {
    let tournament_id = board.tournament_id();
    insert_unless_preserved(
        board,
        Match::new(tournament_id, Bracket::GrandFinal, 1, 0),
    )?;

    let reset_key = MatchKey::new(BracketType::GrandFinal, 2, 0);
    let reset = board
        .at(MatchKey::new(BracketType::GrandFinal, 1, 0))
        .filter(|gf| gf.is_completed() && board.at(reset_key).is_none())
        .and_then(reset_match);
    if let Some(reset) = reset {
        board.insert(reset)?;
    }

    Ok(())
}

/// The second grand final forced when the loser-bracket champion wins the
/// first one. `None` when the first grand final was won from slot A.
pub(crate) fn reset_match(grand_final: &Match) -> Option<Match> {
    let winner = grand_final.winner_id?;
    if grand_final.round != 1 || grand_final.side_of(winner)? != SlotSide::B {
        return None;
    }
    let previous_a = grand_final.slot_a.entrant()?;

    Some(
        Match::new(grand_final.tournament_id, Bracket::GrandFinal, 2, 0)
            .with_slots(Slot::Entrant(winner), Slot::Entrant(previous_a)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::MatchStatus;

    fn build(entrants: &[EntrantId]) -> (Board, Layout) {
        let mut board = Board::new(1, Vec::new()).unwrap();
        let layout = generate(&mut board, entrants, Utc::now()).unwrap();
        (board, layout)
    }

    #[test]
    fn test_eight_entrants_layout() {
        let (board, layout) = build(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(layout.winner_rounds, vec![4, 2, 1]);
        assert_eq!(layout.loser_rounds, vec![2, 2, 1, 1]);
        // 7 winner + 6 loser + grand final
        assert_eq!(board.len(), 14);
        assert!(board.matches().all(|m| !m.is_bye()));
    }

    #[test]
    fn test_four_entrants_layout() {
        let (board, layout) = build(&[1, 2, 3, 4]);
        assert_eq!(layout.winner_rounds, vec![2, 1]);
        assert_eq!(layout.loser_rounds, vec![1, 1]);
        // 3 winner + 2 loser + grand final
        assert_eq!(board.len(), 6);
        assert!(board.at(MatchKey::new(BracketType::GrandFinal, 1, 0)).is_some());
    }

    #[test]
    fn test_two_entrants_have_no_loser_bracket() {
        let (board, layout) = build(&[1, 2]);
        assert!(layout.loser_rounds.is_empty());
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_byes_propagate_into_loser_bracket() {
        let (board, layout) = build(&[1, 2, 3, 4, 5]);
        assert_eq!(layout.loser_rounds, vec![2, 2, 1, 1]);

        // Winner-bracket round 1 position 0 is a bye and drops nobody
        let first = board.at(MatchKey::new(BracketType::Loser, 1, 0)).unwrap();
        assert_eq!(first.slot_a, Slot::Bye);
        assert_eq!(first.slot_b, Slot::Empty);

        // Winner-bracket round 2 position 1 is a structural bye as well
        let drop_in = board.at(MatchKey::new(BracketType::Loser, 2, 1)).unwrap();
        assert_eq!(drop_in.slot_a, Slot::Empty);
        assert_eq!(drop_in.slot_b, Slot::Bye);
    }

    #[test]
    fn test_reset_match_swaps_sides() {
        let mut gf = Match::new(1, Bracket::GrandFinal, 1, 0)
            .with_slots(Slot::Entrant(1), Slot::Entrant(2));
        gf.status = MatchStatus::Completed;
        gf.winner_id = Some(2);

        let reset = reset_match(&gf).unwrap();
        assert_eq!(reset.round, 2);
        assert_eq!(reset.slot_a, Slot::Entrant(2));
        assert_eq!(reset.slot_b, Slot::Entrant(1));

        gf.winner_id = Some(1);
        assert!(reset_match(&gf).is_none());
    }
}
