//! Structural validation run before a generated bracket is written.

use std::collections::HashSet;

use super::{
    board::Board,
    errors::{BracketError, BracketResult},
    linker,
    models::{BracketType, Link, Match, MatchKey, SlotSide, TournamentFormat},
};

/// Check a linked board exhaustively.
///
/// Verifies terminals, link targets, that every open slot is fed exactly
/// once, that byes are never fed, and that winners sit in their own match.
pub fn validate_bracket(board: &Board, format: TournamentFormat) -> BracketResult<()> {
    for m in board.matches() {
        if let Some(winner) = m.winner_id
            && m.side_of(winner).is_none()
        {
            return invalid(format!("winner {winner} is not seated in {}", m.key()));
        }
    }

    match format {
        TournamentFormat::RoundRobin => validate_round_robin(board),
        TournamentFormat::SingleElimination => {
            if let Some(m) = board
                .matches()
                .find(|m| m.bracket_type() != BracketType::Winner)
            {
                return invalid(format!("single elimination holds {}", m.key()));
            }
            let terminals = board.matches().filter(|m| m.next.is_none()).count();
            if terminals != 1 {
                return invalid(format!("expected one terminal match, found {terminals}"));
            }
            validate_links(board, format)
        }
        TournamentFormat::DoubleElimination => {
            if board.at(MatchKey::new(BracketType::GrandFinal, 1, 0)).is_none() {
                return invalid("double elimination without a grand final".to_string());
            }
            for m in board.matches() {
                let terminal = m.bracket_type() == BracketType::GrandFinal;
                if terminal != m.next.is_none() {
                    return invalid(format!("{} has an unexpected successor link", m.key()));
                }
                if m.bracket_type() == BracketType::Winner
                    && !m.is_bye()
                    && !board.is_winner_final(m)
                    && m.bracket.loser_link().is_none()
                {
                    return invalid(format!("{} drops its loser nowhere", m.key()));
                }
            }
            validate_links(board, format)
        }
    }
}

fn validate_round_robin(board: &Board) -> BracketResult<()> {
    let mut pairs = HashSet::with_capacity(board.len());
    for m in board.matches() {
        if m.bracket_type() != BracketType::Winner || m.round != 1 {
            return invalid(format!("round robin holds {}", m.key()));
        }
        if m.next.is_some() || m.bracket.loser_link().is_some() {
            return invalid(format!("round robin match {} is linked", m.key()));
        }
        let Some(pair) = m.pairing() else {
            return invalid(format!("round robin match {} is missing an entrant", m.key()));
        };
        if !pairs.insert(pair) {
            return invalid(format!("pair {pair:?} is scheduled twice"));
        }
    }
    Ok(())
}

fn validate_links(board: &Board, format: TournamentFormat) -> BracketResult<()> {
    for m in board.matches() {
        if let Some(link) = m.next {
            check_target(board, m, link, false)?;
        }
        if let Some(link) = m.bracket.loser_link() {
            check_target(board, m, link, true)?;
        }
    }

    let counts = linker::claims(board, format);
    if let Some(((id, side), count)) = counts.iter().find(|(_, count)| **count > 1) {
        return invalid(format!(
            "slot {} of match {id} is fed {count} times",
            side.as_str()
        ));
    }

    for m in board.matches() {
        for side in [SlotSide::A, SlotSide::B] {
            let fed = counts.contains_key(&(m.id, side));
            let slot = m.slot(side);
            if slot.is_bye() && fed {
                return invalid(format!("bye slot {} of {} is fed", side.as_str(), m.key()));
            }
            if slot.is_empty() && !m.is_completed() && !fed {
                return invalid(format!(
                    "slot {} of {} is never fed",
                    side.as_str(),
                    m.key()
                ));
            }
        }
    }

    Ok(())
}

/// Links must point at an existing match further along the bracket
fn check_target(board: &Board, source: &Match, link: Link, loser: bool) -> BracketResult<()> {
    let Some(target) = board.get(link.match_id) else {
        return invalid(format!(
            "{} links to missing match {}",
            source.key(),
            link.match_id
        ));
    };

    let forward = match target.bracket_type() {
        BracketType::GrandFinal => source.bracket_type() != BracketType::GrandFinal,
        BracketType::Loser if loser => source.bracket_type() == BracketType::Winner,
        bracket => bracket == source.bracket_type() && target.round > source.round,
    };
    if !forward {
        return invalid(format!("{} links backwards to {}", source.key(), target.key()));
    }
    Ok(())
}

fn invalid(message: String) -> BracketResult<()> {
    Err(BracketError::InvalidBracket(message))
}
