//! Bracket manager: the entry points that load a tournament, run the engine
//! and write the result back.

use chrono::Utc;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::Mutex;

use super::{
    advancement::{AdvancementOutcome, Advancer, MatchReport, champion},
    board::Board,
    errors::{BracketError, BracketResult},
    models::{
        BracketSettings, BracketSummary, Entrant, EntrantId, Match, MatchId, MatchPatch,
        OrderingMode, PlayerStats, Registration, TournamentFormat, TournamentId,
    },
    ordering::EntrantOrdering,
    regeneration,
};
use crate::{config::EngineConfig, db::MatchRepository};

/// Bracket manager
///
/// Generation, regeneration and advancement of one tournament are
/// serialized; different tournaments proceed independently.
pub struct BracketManager {
    repository: Arc<dyn MatchRepository>,
    config: EngineConfig,
    ordering: Mutex<EntrantOrdering>,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl BracketManager {
    /// Create a new bracket manager
    pub fn new(repository: Arc<dyn MatchRepository>, config: EngineConfig) -> Self {
        let ordering = match config.draw_seed {
            Some(seed) => EntrantOrdering::seeded(seed),
            None => EntrantOrdering::new(),
        };

        Self {
            repository,
            config,
            ordering: Mutex::new(ordering),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lock serializing work on one tournament.
    ///
    /// Entries nobody holds are pruned here; a caller can only reach a lock
    /// through this map, so pruning never splits a tournament across two.
    async fn tournament_lock(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|id, lock| *id == tournament_id || Arc::strong_count(lock) > 1);
        locks.entry(tournament_id).or_default().clone()
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Register or update an entrant
    pub async fn register(
        &self,
        tournament_id: TournamentId,
        registration: &Registration,
    ) -> BracketResult<()> {
        self.repository
            .upsert_registration(tournament_id, registration)
            .await?;
        Ok(())
    }

    /// Generate a bracket from the checked-in entrants
    ///
    /// Completed matches already stored for the tournament are preserved and
    /// everything else is replaced. Nothing is written unless the whole new
    /// bracket validates.
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament to generate
    /// * `format` - Tournament format
    /// * `ordering` - How entrants are ordered before placement
    ///
    /// # Returns
    ///
    /// * `BracketResult<BracketSummary>` - Rounds, match count and preserved count
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
        format: TournamentFormat,
        ordering: OrderingMode,
    ) -> BracketResult<BracketSummary> {
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let summary = self
            .rebuild(tournament_id, BracketSettings { format, ordering })
            .await?;
        log::info!(
            "Generated {} bracket for tournament {}: {} rounds, {} matches",
            format,
            tournament_id,
            summary.rounds,
            summary.matches
        );
        Ok(summary)
    }

    /// Rebuild a bracket with its stored settings, keeping completed results
    pub async fn regenerate_bracket(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<BracketSummary> {
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let settings = self.settings(tournament_id).await?;
        let summary = self.rebuild(tournament_id, settings).await?;
        log::info!(
            "Regenerated bracket for tournament {}: {} matches, {} preserved",
            tournament_id,
            summary.matches,
            summary.preserved_count
        );
        Ok(summary)
    }

    async fn rebuild(
        &self,
        tournament_id: TournamentId,
        settings: BracketSettings,
    ) -> BracketResult<BracketSummary> {
        let entrants = unique(self.repository.get_registrations(tournament_id).await?);
        if entrants.len() < self.config.min_entrants {
            return Err(BracketError::InsufficientEntrants {
                needed: self.config.min_entrants,
                current: entrants.len(),
            });
        }

        let ordered = self
            .ordering
            .lock()
            .await
            .order(&entrants, settings.ordering);
        let existing = self.repository.list_matches(tournament_id).await?;

        let rebuilt = regeneration::rebuild(
            tournament_id,
            settings.format,
            &ordered,
            existing,
            Utc::now(),
        )?;

        self.repository
            .replace_open_matches(tournament_id, &rebuilt.retained, &rebuilt.changes)
            .await?;
        self.repository
            .save_settings(tournament_id, settings)
            .await?;

        Ok(rebuilt.summary)
    }

    /// Record a result and advance its participants
    ///
    /// # Returns
    ///
    /// * `BracketResult<AdvancementOutcome>` - Loser, champion and any grand
    ///   final reset or bye completions the result caused
    pub async fn report_result(&self, report: MatchReport) -> BracketResult<AdvancementOutcome> {
        let tournament_id = self.tournament_of(report.match_id).await?;
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let settings = self.settings(tournament_id).await?;
        let mut board = self.board(tournament_id).await?;
        let outcome =
            Advancer::new(&mut board, settings.format, Utc::now()).report(&report)?;

        // Match updates and player statistics land in one batch
        self.repository.apply_changes(&board.into_changes()).await?;

        if let Some(champion) = outcome.champion {
            log::info!("Tournament {} won by entrant {}", tournament_id, champion);
        }
        Ok(outcome)
    }

    /// Mark a ready match as in progress
    pub async fn start_match(&self, match_id: MatchId) -> BracketResult<()> {
        let tournament_id = self.tournament_of(match_id).await?;
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let settings = self.settings(tournament_id).await?;
        let mut board = self.board(tournament_id).await?;
        Advancer::new(&mut board, settings.format, Utc::now()).start(match_id)?;

        let changes = board.into_changes();
        if !changes.is_empty() {
            self.repository.apply_changes(&changes).await?;
        }
        Ok(())
    }

    /// Set or clear the physical table a match is played at
    pub async fn assign_table(
        &self,
        match_id: MatchId,
        table_number: Option<u32>,
    ) -> BracketResult<()> {
        self.tournament_of(match_id).await?;
        self.repository
            .patch_match(match_id, &MatchPatch::table(table_number))
            .await?;
        Ok(())
    }

    /// Look up a single match
    pub async fn get_match(&self, match_id: MatchId) -> BracketResult<Match> {
        self.repository
            .get_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    /// All matches of a tournament ordered by bracket, round and position
    pub async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        Ok(self.repository.list_matches(tournament_id).await?)
    }

    /// Per-entrant statistics, most wins first
    pub async fn standings(&self, tournament_id: TournamentId) -> BracketResult<Vec<PlayerStats>> {
        Ok(self.repository.get_player_stats(tournament_id).await?)
    }

    /// Tournament winner, once the terminal match is decided
    pub async fn champion(&self, tournament_id: TournamentId) -> BracketResult<Option<EntrantId>> {
        let settings = self.settings(tournament_id).await?;
        let board = self.board(tournament_id).await?;
        Ok(champion(&board, settings.format))
    }

    /// Settings the bracket was generated with
    pub async fn settings(&self, tournament_id: TournamentId) -> BracketResult<BracketSettings> {
        self.repository
            .get_settings(tournament_id)
            .await?
            .ok_or(BracketError::NotGenerated(tournament_id))
    }

    async fn tournament_of(&self, match_id: MatchId) -> BracketResult<TournamentId> {
        Ok(self.get_match(match_id).await?.tournament_id)
    }

    async fn board(&self, tournament_id: TournamentId) -> BracketResult<Board> {
        Board::new(
            tournament_id,
            self.repository.list_matches(tournament_id).await?,
        )
    }
}

/// Drop repeated registrations of the same entrant, keeping the first
fn unique(entrants: Vec<Entrant>) -> Vec<Entrant> {
    let mut seen = HashSet::with_capacity(entrants.len());
    entrants.into_iter().filter(|e| seen.insert(e.id)).collect()
}
