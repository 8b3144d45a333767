//! Round robin: every entrant meets every other entrant once.

use std::collections::{BTreeSet, HashSet};

use super::Layout;
use crate::bracket::{
    board::Board,
    errors::{BracketError, BracketResult},
    models::{Bracket, BracketType, EntrantId, Match, Slot},
};

/// Create one round-1 match per unordered pair, in enumeration order.
///
/// Pairs already played in a preserved match are skipped in either order.
/// Positions run sequentially and step over positions held by preserved
/// matches, so a regenerated schedule never collides with a played one.
pub fn generate(board: &mut Board, ordered: &[EntrantId]) -> BracketResult<Layout> {
    let tournament_id = board.tournament_id();

    let mut entrants: Vec<EntrantId> = Vec::with_capacity(ordered.len());
    for id in ordered {
        if !entrants.contains(id) {
            entrants.push(*id);
        }
    }
    if entrants.len() < 2 {
        return Err(BracketError::InsufficientEntrants {
            needed: 2,
            current: entrants.len(),
        });
    }

    let played: HashSet<(EntrantId, EntrantId)> =
        board.matches().filter_map(Match::pairing).collect();
    let taken: BTreeSet<u32> = board
        .matches()
        .filter(|m| m.bracket_type() == BracketType::Winner && m.round == 1)
        .map(|m| m.position)
        .collect();

    let mut positions = (0u32..).filter(|position| !taken.contains(position));
    let mut created = 0usize;

    for (i, &a) in entrants.iter().enumerate() {
        for &b in &entrants[i + 1..] {
            if played.contains(&(a.min(b), a.max(b))) {
                continue;
            }
            let Some(position) = positions.next() else {
                break;
            };
            board.insert(
                Match::new(tournament_id, Bracket::winner(), 1, position)
                    .with_slots(Slot::Entrant(a), Slot::Entrant(b)),
            )?;
            created += 1;
        }
    }

    log::debug!(
        "Tournament {}: {} round robin pairings scheduled, {} already played",
        tournament_id,
        created,
        played.len()
    );

    Ok(Layout {
        winner_rounds: vec![board.len() as u32],
        loser_rounds: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::MatchStatus;

    #[test]
    fn test_every_pair_once() {
        let mut board = Board::new(1, Vec::new()).unwrap();
        let layout = generate(&mut board, &[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(board.len(), 10);
        assert_eq!(layout.rounds(), 1);
        let pairs: HashSet<_> = board.matches().filter_map(Match::pairing).collect();
        assert_eq!(pairs.len(), 10);
        assert!(board.matches().all(|m| m.round == 1 && m.next.is_none()));
    }

    #[test]
    fn test_positions_follow_enumeration_order() {
        let mut board = Board::new(1, Vec::new()).unwrap();
        generate(&mut board, &[3, 1, 2]).unwrap();

        let round = board.round(BracketType::Winner, 1);
        let pairs: Vec<_> = round
            .iter()
            .map(|m| (m.slot_a.entrant().unwrap(), m.slot_b.entrant().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(3, 1), (3, 2), (1, 2)]);
    }

    #[test]
    fn test_played_pairs_are_skipped_in_either_order() {
        let mut played = Match::new(1, Bracket::winner(), 1, 0)
            .with_slots(Slot::Entrant(2), Slot::Entrant(1));
        played.status = MatchStatus::Completed;
        played.winner_id = Some(2);

        let mut board = Board::new(1, vec![played]).unwrap();
        generate(&mut board, &[1, 2, 3]).unwrap();

        assert_eq!(board.len(), 3);
        let positions: BTreeSet<u32> = board.matches().map(|m| m.position).collect();
        assert_eq!(positions, BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn test_single_entrant_is_rejected() {
        let mut board = Board::new(1, Vec::new()).unwrap();
        assert!(matches!(
            generate(&mut board, &[1]),
            Err(BracketError::InsufficientEntrants { current: 1, .. })
        ));
    }
}
