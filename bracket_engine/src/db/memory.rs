//! In-memory match store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{
    errors::{StorageError, StorageResult},
    repository::MatchRepository,
};
use crate::bracket::{
    BoardChanges, BracketSettings, Entrant, EntrantId, Match, MatchId, MatchPatch, PlayerStats,
    Registration, TournamentId,
};

#[derive(Default)]
struct MemoryState {
    matches: HashMap<MatchId, Match>,
    settings: HashMap<TournamentId, BracketSettings>,
    registrations: HashMap<TournamentId, Vec<Registration>>,
    stats: HashMap<TournamentId, HashMap<EntrantId, PlayerStats>>,
}

impl MemoryState {
    /// Apply a batch only after every patched match is known to exist
    fn write(&mut self, changes: &BoardChanges) -> StorageResult<()> {
        if let Some((missing, _)) = changes
            .patched
            .iter()
            .find(|(id, _)| !self.matches.contains_key(id))
        {
            return Err(StorageError::NotFound(format!("match {missing}")));
        }
        if let Some(duplicate) = changes
            .inserted
            .iter()
            .find(|m| self.matches.contains_key(&m.id))
        {
            return Err(StorageError::Conflict(format!(
                "match {} already exists",
                duplicate.id
            )));
        }

        for (id, patch) in &changes.patched {
            if let Some(m) = self.matches.get_mut(id) {
                m.apply(patch);
            }
        }
        for m in &changes.inserted {
            self.matches.insert(m.id, m.clone());
        }

        let table = self.stats.entry(changes.tournament_id).or_default();
        for decided in &changes.decided {
            let stats = table
                .entry(decided.winner)
                .or_insert_with(|| PlayerStats::new(decided.winner));
            stats.matches_played += 1;
            stats.wins += 1;

            let stats = table
                .entry(decided.loser)
                .or_insert_with(|| PlayerStats::new(decided.loser));
            stats.matches_played += 1;
            stats.losses += 1;
        }
        Ok(())
    }
}

/// Match store backed by hash maps, for tests and the `memory` backend
#[derive(Default)]
pub struct InMemoryMatchRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn list_matches(&self, tournament_id: TournamentId) -> StorageResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(Match::key);
        Ok(matches)
    }

    async fn get_match(&self, match_id: MatchId) -> StorageResult<Option<Match>> {
        Ok(self.state.read().await.matches.get(&match_id).cloned())
    }

    async fn insert_match(&self, m: &Match) -> StorageResult<MatchId> {
        let mut state = self.state.write().await;
        if state.matches.contains_key(&m.id) {
            return Err(StorageError::Conflict(format!("match {} already exists", m.id)));
        }
        state.matches.insert(m.id, m.clone());
        Ok(m.id)
    }

    async fn patch_match(&self, match_id: MatchId, patch: &MatchPatch) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let m = state
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| StorageError::NotFound(format!("match {match_id}")))?;
        m.apply(patch);
        Ok(())
    }

    async fn apply_changes(&self, changes: &BoardChanges) -> StorageResult<()> {
        self.state.write().await.write(changes)
    }

    async fn replace_open_matches(
        &self,
        tournament_id: TournamentId,
        retained: &[MatchId],
        changes: &BoardChanges,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let retained: HashSet<&MatchId> = retained.iter().collect();

        // Stage on a copy so a failed batch leaves the store untouched
        let mut staged: HashMap<MatchId, Match> = state
            .matches
            .iter()
            .filter(|(id, m)| m.tournament_id != tournament_id || retained.contains(id))
            .map(|(id, m)| (*id, m.clone()))
            .collect();
        std::mem::swap(&mut state.matches, &mut staged);

        if let Err(err) = state.write(changes) {
            std::mem::swap(&mut state.matches, &mut staged);
            return Err(err);
        }
        Ok(())
    }

    async fn get_registrations(&self, tournament_id: TournamentId) -> StorageResult<Vec<Entrant>> {
        let state = self.state.read().await;
        let mut registrations: Vec<&Registration> = state
            .registrations
            .get(&tournament_id)
            .map(|list| list.iter().filter(|r| r.checked_in).collect())
            .unwrap_or_default();
        registrations.sort_by_key(|r| (r.registered_at, r.entrant_id));
        Ok(registrations.into_iter().map(Registration::entrant).collect())
    }

    async fn upsert_registration(
        &self,
        tournament_id: TournamentId,
        registration: &Registration,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let list = state.registrations.entry(tournament_id).or_default();
        match list
            .iter_mut()
            .find(|r| r.entrant_id == registration.entrant_id)
        {
            Some(existing) => {
                existing.seed = registration.seed;
                existing.checked_in = registration.checked_in;
            }
            None => list.push(registration.clone()),
        }
        Ok(())
    }

    async fn get_settings(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Option<BracketSettings>> {
        Ok(self.state.read().await.settings.get(&tournament_id).copied())
    }

    async fn save_settings(
        &self,
        tournament_id: TournamentId,
        settings: BracketSettings,
    ) -> StorageResult<()> {
        self.state
            .write()
            .await
            .settings
            .insert(tournament_id, settings);
        Ok(())
    }

    async fn get_player_stats(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<PlayerStats>> {
        let state = self.state.read().await;
        let mut stats: Vec<PlayerStats> = state
            .stats
            .get(&tournament_id)
            .map(|table| table.values().copied().collect())
            .unwrap_or_default();
        stats.sort_by_key(|s| (std::cmp::Reverse(s.wins), s.losses, s.entrant_id));
        Ok(stats)
    }
}
