//! In-memory view of a tournament's matches, indexed for successor lookups.

use std::collections::HashMap;

use super::{
    errors::{BracketError, BracketResult},
    models::{
        BracketType, EntrantId, Link, Match, MatchId, MatchKey, MatchPatch, SlotSide, TournamentId,
    },
};

/// Matches of one tournament keyed by id and by `(bracket, round, position)`.
///
/// Loaded matches are snapshotted so the board can report exactly which
/// fields an operation changed.
pub struct Board {
    tournament_id: TournamentId,
    matches: HashMap<MatchId, Match>,
    keys: HashMap<MatchKey, MatchId>,
    snapshot: HashMap<MatchId, Match>,
    created: Vec<MatchId>,
    decided: Vec<Decided>,
}

/// Participants of a decisive result, counted in player statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decided {
    pub winner: EntrantId,
    pub loser: EntrantId,
}

/// Writes produced by an operation on a board
#[derive(Debug, Clone, Default)]
pub struct BoardChanges {
    pub tournament_id: TournamentId,
    /// Matches that did not exist before, in creation order
    pub inserted: Vec<Match>,
    /// Field-level updates to matches that existed before
    pub patched: Vec<(MatchId, MatchPatch)>,
    /// Results to add to player statistics in the same write
    pub decided: Vec<Decided>,
}

impl BoardChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.patched.is_empty() && self.decided.is_empty()
    }
}

impl Board {
    /// Build a board from stored matches
    pub fn new(tournament_id: TournamentId, matches: Vec<Match>) -> BracketResult<Self> {
        let mut board = Self {
            tournament_id,
            matches: HashMap::with_capacity(matches.len()),
            keys: HashMap::with_capacity(matches.len()),
            snapshot: HashMap::with_capacity(matches.len()),
            created: Vec::new(),
            decided: Vec::new(),
        };

        for m in matches {
            if m.tournament_id != tournament_id {
                return Err(BracketError::InvalidBracket(format!(
                    "match {} belongs to tournament {}, not {}",
                    m.id, m.tournament_id, tournament_id
                )));
            }
            board.index(&m)?;
            board.snapshot.insert(m.id, m.clone());
            board.matches.insert(m.id, m);
        }

        Ok(board)
    }

    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    /// Add a match created during this operation
    pub fn insert(&mut self, m: Match) -> BracketResult<MatchId> {
        self.index(&m)?;
        let id = m.id;
        self.created.push(id);
        self.matches.insert(id, m);
        Ok(id)
    }

    fn index(&mut self, m: &Match) -> BracketResult<()> {
        let key = m.key();
        if self.keys.contains_key(&key) {
            return Err(BracketError::InvalidBracket(format!(
                "duplicate match at {key}"
            )));
        }
        self.keys.insert(key, m.id);
        Ok(())
    }

    /// Count a decisive result once the board is written back
    pub fn record_decided(&mut self, winner: EntrantId, loser: EntrantId) {
        self.decided.push(Decided { winner, loser });
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&id)
    }

    pub fn at(&self, key: MatchKey) -> Option<&Match> {
        self.keys.get(&key).and_then(|id| self.matches.get(id))
    }

    pub fn id_at(&self, key: MatchKey) -> Option<MatchId> {
        self.keys.get(&key).copied()
    }

    /// Link to the given slot of the match at `key`, if that match exists
    pub fn link_to(&self, key: MatchKey, slot: SlotSide) -> Option<Link> {
        self.id_at(key).map(|id| Link::new(id, slot))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    /// Ids ordered by bracket, round and position
    pub fn sorted_ids(&self) -> Vec<MatchId> {
        let mut keys: Vec<(&MatchKey, &MatchId)> = self.keys.iter().collect();
        keys.sort_by_key(|(key, _)| **key);
        keys.into_iter().map(|(_, id)| *id).collect()
    }

    /// Matches of one round ordered by position
    pub fn round(&self, bracket: BracketType, round: u32) -> Vec<&Match> {
        let mut found: Vec<&Match> = self
            .matches
            .values()
            .filter(|m| m.bracket_type() == bracket && m.round == round)
            .collect();
        found.sort_by_key(|m| m.position);
        found
    }

    /// Highest round present in a bracket
    pub fn max_round(&self, bracket: BracketType) -> Option<u32> {
        self.keys
            .keys()
            .filter(|key| key.bracket == bracket)
            .map(|key| key.round)
            .max()
    }

    /// Where the winner-bracket final's loser drops: the loser-bracket
    /// final's slot B, or the grand final's slot B when there is no loser
    /// bracket.
    pub fn final_loser_destination(&self) -> Option<Link> {
        match self.max_round(BracketType::Loser) {
            Some(round) => self.link_to(MatchKey::new(BracketType::Loser, round, 0), SlotSide::B),
            None => self.link_to(MatchKey::new(BracketType::GrandFinal, 1, 0), SlotSide::B),
        }
    }

    /// Whether a winner-bracket match is the winner-bracket final
    pub fn is_winner_final(&self, m: &Match) -> bool {
        m.bracket_type() == BracketType::Winner
            && Some(m.round) == self.max_round(BracketType::Winner)
            && self.max_round(BracketType::GrandFinal).is_some()
    }

    /// Consume the board, returning inserts, patches and decided results
    pub fn into_changes(mut self) -> BoardChanges {
        let mut inserted = Vec::with_capacity(self.created.len());
        for id in &self.created {
            if let Some(m) = self.matches.remove(id) {
                inserted.push(m);
            }
        }

        let mut patched: Vec<(MatchId, MatchPatch)> = self
            .snapshot
            .iter()
            .filter_map(|(id, before)| {
                let after = self.matches.get(id)?;
                let patch = MatchPatch::between(before, after);
                (!patch.is_empty()).then_some((*id, patch))
            })
            .collect();
        patched.sort_by_key(|(id, _)| self.snapshot.get(id).map(|m| m.key()));

        BoardChanges {
            tournament_id: self.tournament_id,
            inserted,
            patched,
            decided: self.decided,
        }
    }
}
