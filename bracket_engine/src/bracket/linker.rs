//! Bracket linker.
//!
//! Wires every match of an elimination bracket to the slot its winner moves
//! into and, in double elimination, every winner-bracket match to the slot its
//! loser drops into. Linking runs in two passes: positional successors first,
//! then a fallback search for feeders whose positional slot is missing or
//! already taken after partial preservation.

use std::collections::{HashMap, HashSet};

use super::{
    board::Board,
    errors::{BracketError, BracketResult},
    models::{
        Bracket, BracketType, EntrantId, Link, Match, MatchId, MatchKey, Slot, SlotSide,
        TournamentFormat,
    },
};

/// Which participant of a match a link carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Winner,
    Loser,
}

/// One outgoing edge to resolve
#[derive(Debug, Clone, Copy)]
struct Feed {
    source: MatchId,
    role: Role,
    /// Positional destination, `None` for a terminal edge
    target: Option<(MatchKey, SlotSide)>,
    /// Entrant already decided for this edge, if the source is completed
    result: Option<EntrantId>,
}

/// Link every match on the board for `format`
///
/// Existing links are recomputed from scratch. Preserved matches keep the
/// destination that already holds their result whenever that slot is still
/// available.
pub fn link(board: &mut Board, format: TournamentFormat) -> BracketResult<()> {
    if format == TournamentFormat::RoundRobin {
        for id in board.sorted_ids() {
            if let Some(m) = board.get_mut(id) {
                m.next = None;
                m.bracket = Bracket::from_parts(m.bracket_type(), None);
            }
        }
        return Ok(());
    }

    let double = format == TournamentFormat::DoubleElimination;
    let mut claimed: HashSet<(MatchId, SlotSide)> = HashSet::new();
    if double && let Some(special) = board.final_loser_destination() {
        claimed.insert((special.match_id, special.slot));
    }

    let mut resolved: Vec<(MatchId, Role, Option<Link>)> = Vec::with_capacity(board.len() * 2);
    let mut pending: Vec<(Feed, MatchKey)> = Vec::new();

    for feed in feeds(board, double) {
        let Some((key, slot)) = feed.target else {
            resolved.push((feed.source, feed.role, None));
            continue;
        };

        match board
            .link_to(key, slot)
            .filter(|link| is_open(board, &claimed, *link, feed.result))
        {
            Some(link) => {
                claimed.insert((link.match_id, link.slot));
                resolved.push((feed.source, feed.role, Some(link)));
            }
            None => pending.push((feed, key)),
        }
    }

    for (feed, key) in pending {
        let link = fallback(board, &claimed, key, feed.result)?;
        log::warn!(
            "Tournament {}: positional successor {} unavailable for match {}, linked to match {} slot {}",
            board.tournament_id(),
            key,
            feed.source,
            link.match_id,
            link.slot.as_str()
        );
        claimed.insert((link.match_id, link.slot));
        resolved.push((feed.source, feed.role, Some(link)));
    }

    for (source, role, link) in resolved {
        let Some(m) = board.get_mut(source) else {
            return Err(BracketError::MatchNotFound(source));
        };
        match role {
            Role::Winner => m.next = link,
            Role::Loser => m.bracket = Bracket::from_parts(m.bracket_type(), link),
        }
    }

    Ok(())
}

/// Outgoing edges of every match, in key order
fn feeds(board: &Board, double: bool) -> Vec<Feed> {
    let winner_final = board.max_round(BracketType::Winner).unwrap_or(0);
    let loser_final = board.max_round(BracketType::Loser);

    let mut feeds = Vec::with_capacity(board.len() * 2);
    for id in board.sorted_ids() {
        let Some(m) = board.get(id) else {
            continue;
        };

        feeds.push(Feed {
            source: m.id,
            role: Role::Winner,
            target: winner_target(m, double, winner_final, loser_final),
            result: m.winner_id,
        });

        if double && m.bracket_type() == BracketType::Winner {
            feeds.push(Feed {
                source: m.id,
                role: Role::Loser,
                target: loser_target(m, winner_final),
                result: m.loser_id(),
            });
        }
    }
    feeds
}

/// Positional destination of a match's winner
fn winner_target(
    m: &Match,
    double: bool,
    winner_final: u32,
    loser_final: Option<u32>,
) -> Option<(MatchKey, SlotSide)> {
    let parity = SlotSide::for_position(m.position);
    match m.bracket_type() {
        BracketType::Winner if m.round < winner_final => Some((
            MatchKey::new(BracketType::Winner, m.round + 1, m.position / 2),
            parity,
        )),
        BracketType::Winner if double => Some((grand_final(), SlotSide::A)),
        BracketType::Winner => None,
        BracketType::Loser => match loser_final {
            // Drop-in rounds follow odd rounds one to one
            Some(last) if m.round < last && m.round % 2 == 1 => Some((
                MatchKey::new(BracketType::Loser, m.round + 1, m.position),
                SlotSide::A,
            )),
            Some(last) if m.round < last => Some((
                MatchKey::new(BracketType::Loser, m.round + 1, m.position / 2),
                parity,
            )),
            _ => Some((grand_final(), SlotSide::B)),
        },
        BracketType::GrandFinal => None,
    }
}

/// Positional destination of a winner-bracket match's loser.
///
/// Byes produce no loser and the final's loser is resolved through
/// [`Board::final_loser_destination`].
fn loser_target(m: &Match, winner_final: u32) -> Option<(MatchKey, SlotSide)> {
    if m.is_bye() || m.round >= winner_final {
        return None;
    }
    if m.round == 1 {
        Some((
            MatchKey::new(BracketType::Loser, 1, m.position / 2),
            SlotSide::for_position(m.position),
        ))
    } else {
        Some((
            MatchKey::new(BracketType::Loser, 2 * (m.round - 1), m.position),
            SlotSide::B,
        ))
    }
}

fn grand_final() -> MatchKey {
    MatchKey::new(BracketType::GrandFinal, 1, 0)
}

/// Whether `link` can take a feeder whose decided entrant is `result`
fn is_open(
    board: &Board,
    claimed: &HashSet<(MatchId, SlotSide)>,
    link: Link,
    result: Option<EntrantId>,
) -> bool {
    if claimed.contains(&(link.match_id, link.slot)) {
        return false;
    }
    match board.get(link.match_id).map(|m| m.slot(link.slot)) {
        Some(Slot::Empty) => true,
        Some(Slot::Entrant(id)) => result == Some(id),
        _ => false,
    }
}

/// Lowest-position slot of the target round able to take the feeder.
///
/// A slot already holding the feeder's result wins over an empty one.
fn fallback(
    board: &Board,
    claimed: &HashSet<(MatchId, SlotSide)>,
    key: MatchKey,
    result: Option<EntrantId>,
) -> BracketResult<Link> {
    let candidates: Vec<(Link, Slot, bool)> = board
        .round(key.bracket, key.round)
        .into_iter()
        .flat_map(|m| {
            [
                (Link::new(m.id, SlotSide::A), m.slot_a, m.is_completed()),
                (Link::new(m.id, SlotSide::B), m.slot_b, m.is_completed()),
            ]
        })
        .filter(|(link, _, _)| !claimed.contains(&(link.match_id, link.slot)))
        .collect();

    let holding = result.and_then(|id| {
        candidates
            .iter()
            .find(|(_, slot, _)| *slot == Slot::Entrant(id))
    });
    let chosen = holding.or_else(|| {
        candidates
            .iter()
            .find(|(_, slot, completed)| !completed && slot.is_empty())
    });

    chosen
        .map(|(link, _, _)| *link)
        .ok_or(BracketError::NoOpenDestinationSlot {
            bracket: key.bracket,
            round: key.round,
        })
}

/// How many links point at each slot, counting the winner-bracket final's
/// special loser destination in double elimination
pub(crate) fn claims(board: &Board, format: TournamentFormat) -> HashMap<(MatchId, SlotSide), usize> {
    let mut counts: HashMap<(MatchId, SlotSide), usize> = HashMap::new();
    for m in board.matches() {
        for link in [m.next, m.bracket.loser_link()].into_iter().flatten() {
            *counts.entry((link.match_id, link.slot)).or_default() += 1;
        }
    }
    if format == TournamentFormat::DoubleElimination
        && let Some(special) = board.final_loser_destination()
    {
        *counts.entry((special.match_id, special.slot)).or_default() += 1;
    }
    counts
}
