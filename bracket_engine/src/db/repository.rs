//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket engine talks to storage only through [`MatchRepository`], so
//! the same manager runs against PostgreSQL in production and against the
//! in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::errors::{StorageError, StorageResult};
use crate::bracket::{
    BoardChanges, Bracket, BracketSettings, BracketType, Decided, Entrant, Link, Match, MatchId,
    MatchPatch, MatchStatus, OrderingMode, PlayerStats, Registration, Slot, SlotSide,
    TournamentFormat, TournamentId,
};

/// Trait for match storage operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// All matches of a tournament ordered by bracket, round and position
    async fn list_matches(&self, tournament_id: TournamentId) -> StorageResult<Vec<Match>>;

    /// Find a match by ID
    async fn get_match(&self, match_id: MatchId) -> StorageResult<Option<Match>>;

    /// Insert a new match
    async fn insert_match(&self, m: &Match) -> StorageResult<MatchId>;

    /// Update some fields of a match
    async fn patch_match(&self, match_id: MatchId, patch: &MatchPatch) -> StorageResult<()>;

    /// Apply inserts, patches and player statistics as one batch
    async fn apply_changes(&self, changes: &BoardChanges) -> StorageResult<()>;

    /// Atomically delete every match of the tournament not listed in
    /// `retained`, then apply `changes`
    async fn replace_open_matches(
        &self,
        tournament_id: TournamentId,
        retained: &[MatchId],
        changes: &BoardChanges,
    ) -> StorageResult<()>;

    /// Checked-in entrants in registration order
    async fn get_registrations(&self, tournament_id: TournamentId) -> StorageResult<Vec<Entrant>>;

    /// Create or update a registration
    async fn upsert_registration(
        &self,
        tournament_id: TournamentId,
        registration: &Registration,
    ) -> StorageResult<()>;

    /// Settings the bracket was last generated with
    async fn get_settings(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Option<BracketSettings>>;

    /// Store generation settings
    async fn save_settings(
        &self,
        tournament_id: TournamentId,
        settings: BracketSettings,
    ) -> StorageResult<()>;

    /// Per-entrant statistics, most wins first
    async fn get_player_stats(&self, tournament_id: TournamentId)
    -> StorageResult<Vec<PlayerStats>>;
}

/// Default PostgreSQL implementation of `MatchRepository`
pub struct PgMatchRepository {
    pool: PgPool,
}

impl PgMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MATCH_COLUMNS: &str = "id, tournament_id, bracket_type, round, position, slot_a, slot_b,
    score_a, score_b, status, winner_id, next_match_id, next_slot, loser_match_id, loser_slot,
    table_number, completed_at";

#[async_trait]
impl MatchRepository for PgMatchRepository {
    async fn list_matches(&self, tournament_id: TournamentId) -> StorageResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM bracket_matches WHERE tournament_id = $1
             ORDER BY CASE bracket_type WHEN 'winner' THEN 0 WHEN 'loser' THEN 1 ELSE 2 END,
                      round, position"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn get_match(&self, match_id: MatchId) -> StorageResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM bracket_matches WHERE id = $1"
        ))
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn insert_match(&self, m: &Match) -> StorageResult<MatchId> {
        let mut tx = self.pool.begin().await?;
        insert(&mut tx, m).await?;
        tx.commit().await?;
        Ok(m.id)
    }

    async fn patch_match(&self, match_id: MatchId, patch: &MatchPatch) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        apply_patch(&mut tx, match_id, patch).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_changes(&self, changes: &BoardChanges) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        write_changes(&mut tx, changes).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_open_matches(
        &self,
        tournament_id: TournamentId,
        retained: &[MatchId],
        changes: &BoardChanges,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bracket_matches WHERE tournament_id = $1 AND NOT (id = ANY($2))")
            .bind(tournament_id)
            .bind(retained)
            .execute(&mut *tx)
            .await?;

        write_changes(&mut tx, changes).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_registrations(&self, tournament_id: TournamentId) -> StorageResult<Vec<Entrant>> {
        let rows = sqlx::query(
            "SELECT entrant_id, seed FROM bracket_registrations
             WHERE tournament_id = $1 AND checked_in
             ORDER BY registered_at, entrant_id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> StorageResult<Entrant> {
                let seed: Option<i64> = r.try_get("seed")?;
                Ok(Entrant::new(
                    r.try_get("entrant_id")?,
                    seed.map(|s| to_u32(s, "seed")).transpose()?,
                ))
            })
            .collect()
    }

    async fn upsert_registration(
        &self,
        tournament_id: TournamentId,
        registration: &Registration,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bracket_registrations (tournament_id, entrant_id, seed, checked_in, registered_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tournament_id, entrant_id)
            DO UPDATE SET seed = EXCLUDED.seed, checked_in = EXCLUDED.checked_in
            "#,
        )
        .bind(tournament_id)
        .bind(registration.entrant_id)
        .bind(registration.seed.map(i64::from))
        .bind(registration.checked_in)
        .bind(registration.registered_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_settings(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Option<BracketSettings>> {
        let row = sqlx::query(
            "SELECT format, ordering FROM bracket_settings WHERE tournament_id = $1",
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> StorageResult<BracketSettings> {
            let format: String = r.try_get("format")?;
            let ordering: String = r.try_get("ordering")?;
            Ok(BracketSettings {
                format: format.parse::<TournamentFormat>().map_err(corrupt)?,
                ordering: ordering.parse::<OrderingMode>().map_err(corrupt)?,
            })
        })
        .transpose()
    }

    async fn save_settings(
        &self,
        tournament_id: TournamentId,
        settings: BracketSettings,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bracket_settings (tournament_id, format, ordering, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (tournament_id)
            DO UPDATE SET format = EXCLUDED.format, ordering = EXCLUDED.ordering, updated_at = NOW()
            "#,
        )
        .bind(tournament_id)
        .bind(settings.format.as_str())
        .bind(settings.ordering.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_player_stats(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<PlayerStats>> {
        let rows = sqlx::query(
            "SELECT entrant_id, matches_played, wins, losses FROM bracket_player_stats
             WHERE tournament_id = $1
             ORDER BY wins DESC, losses ASC, entrant_id ASC",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> StorageResult<PlayerStats> {
                Ok(PlayerStats {
                    entrant_id: r.try_get("entrant_id")?,
                    matches_played: to_u32(r.try_get("matches_played")?, "matches_played")?,
                    wins: to_u32(r.try_get("wins")?, "wins")?,
                    losses: to_u32(r.try_get("losses")?, "losses")?,
                })
            })
            .collect()
    }
}

async fn write_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: &BoardChanges,
) -> StorageResult<()> {
    for (match_id, patch) in &changes.patched {
        apply_patch(tx, *match_id, patch).await?;
    }
    for m in &changes.inserted {
        insert(tx, m).await?;
    }
    for decided in &changes.decided {
        record_decided(tx, changes.tournament_id, decided).await?;
    }
    Ok(())
}

/// Count a decisive result for both participants
async fn record_decided(
    tx: &mut Transaction<'_, Postgres>,
    tournament_id: TournamentId,
    decided: &Decided,
) -> StorageResult<()> {
    for (entrant, won) in [(decided.winner, 1i64), (decided.loser, 0i64)] {
        sqlx::query(
            r#"
            INSERT INTO bracket_player_stats (tournament_id, entrant_id, matches_played, wins, losses)
            VALUES ($1, $2, 1, $3, 1 - $3)
            ON CONFLICT (tournament_id, entrant_id)
            DO UPDATE SET matches_played = bracket_player_stats.matches_played + 1,
                          wins = bracket_player_stats.wins + $3,
                          losses = bracket_player_stats.losses + 1 - $3
            "#,
        )
        .bind(tournament_id)
        .bind(entrant)
        .bind(won)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert(tx: &mut Transaction<'_, Postgres>, m: &Match) -> StorageResult<()> {
    let next = m.next;
    let loser = m.bracket.loser_link();

    sqlx::query(
        r#"
        INSERT INTO bracket_matches (id, tournament_id, bracket_type, round, position, slot_a,
            slot_b, score_a, score_b, status, winner_id, next_match_id, next_slot, loser_match_id,
            loser_slot, table_number, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(m.id)
    .bind(m.tournament_id)
    .bind(m.bracket_type().as_str())
    .bind(i64::from(m.round))
    .bind(i64::from(m.position))
    .bind(serde_json::to_value(m.slot_a)?)
    .bind(serde_json::to_value(m.slot_b)?)
    .bind(i64::from(m.score_a))
    .bind(i64::from(m.score_b))
    .bind(m.status.as_str())
    .bind(m.winner_id)
    .bind(next.map(|link| link.match_id))
    .bind(next.map(|link| link.slot.as_str()))
    .bind(loser.map(|link| link.match_id))
    .bind(loser.map(|link| link.slot.as_str()))
    .bind(m.table_number.map(i64::from))
    .bind(m.completed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Load, patch and rewrite a match under a row lock
async fn apply_patch(
    tx: &mut Transaction<'_, Postgres>,
    match_id: MatchId,
    patch: &MatchPatch,
) -> StorageResult<()> {
    let row = sqlx::query(&format!(
        "SELECT {MATCH_COLUMNS} FROM bracket_matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(match_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| StorageError::NotFound(format!("match {match_id}")))?;

    let mut m = match_from_row(&row)?;
    m.apply(patch);
    let next = m.next;
    let loser = m.bracket.loser_link();

    sqlx::query(
        r#"
        UPDATE bracket_matches
        SET slot_a = $2, slot_b = $3, score_a = $4, score_b = $5, status = $6, winner_id = $7,
            next_match_id = $8, next_slot = $9, loser_match_id = $10, loser_slot = $11,
            table_number = $12, completed_at = $13
        WHERE id = $1
        "#,
    )
    .bind(m.id)
    .bind(serde_json::to_value(m.slot_a)?)
    .bind(serde_json::to_value(m.slot_b)?)
    .bind(i64::from(m.score_a))
    .bind(i64::from(m.score_b))
    .bind(m.status.as_str())
    .bind(m.winner_id)
    .bind(next.map(|link| link.match_id))
    .bind(next.map(|link| link.slot.as_str()))
    .bind(loser.map(|link| link.match_id))
    .bind(loser.map(|link| link.slot.as_str()))
    .bind(m.table_number.map(i64::from))
    .bind(m.completed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn match_from_row(r: &PgRow) -> StorageResult<Match> {
    let bracket_type: String = r.try_get("bracket_type")?;
    let status: String = r.try_get("status")?;
    let slot_a: serde_json::Value = r.try_get("slot_a")?;
    let slot_b: serde_json::Value = r.try_get("slot_b")?;
    let table_number: Option<i64> = r.try_get("table_number")?;
    let completed_at: Option<DateTime<Utc>> = r.try_get("completed_at")?;

    let loser_link = link(r.try_get("loser_match_id")?, r.try_get("loser_slot")?)?;

    Ok(Match {
        id: r.try_get("id")?,
        tournament_id: r.try_get("tournament_id")?,
        round: to_u32(r.try_get("round")?, "round")?,
        position: to_u32(r.try_get("position")?, "position")?,
        bracket: Bracket::from_parts(
            bracket_type.parse::<BracketType>().map_err(corrupt)?,
            loser_link,
        ),
        slot_a: serde_json::from_value::<Slot>(slot_a)?,
        slot_b: serde_json::from_value::<Slot>(slot_b)?,
        score_a: to_u32(r.try_get("score_a")?, "score_a")?,
        score_b: to_u32(r.try_get("score_b")?, "score_b")?,
        status: status.parse::<MatchStatus>().map_err(corrupt)?,
        winner_id: r.try_get("winner_id")?,
        next: link(r.try_get("next_match_id")?, r.try_get("next_slot")?)?,
        table_number: table_number
            .map(|t| to_u32(t, "table_number"))
            .transpose()?,
        completed_at,
    })
}

fn link(match_id: Option<Uuid>, slot: Option<String>) -> StorageResult<Option<Link>> {
    match (match_id, slot) {
        (Some(match_id), Some(slot)) => Ok(Some(Link::new(
            match_id,
            slot.parse::<SlotSide>().map_err(corrupt)?,
        ))),
        (None, None) => Ok(None),
        _ => Err(StorageError::Corrupt(
            "link stored without both match and slot".to_string(),
        )),
    }
}

fn to_u32(value: i64, column: &str) -> StorageResult<u32> {
    u32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{column} out of range: {value}")))
}

fn corrupt(err: impl std::fmt::Display) -> StorageError {
    StorageError::Corrupt(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_values_above_i32_range_round_trip() {
        let score = 3_000_000_000u32;
        assert_eq!(to_u32(i64::from(score), "score_a").unwrap(), score);
        assert_eq!(to_u32(i64::from(u32::MAX), "table_number").unwrap(), u32::MAX);
    }

    #[test]
    fn test_out_of_range_column_is_corrupt() {
        assert!(matches!(
            to_u32(-1, "round"),
            Err(StorageError::Corrupt(msg)) if msg.contains("round")
        ));
        assert!(to_u32(i64::from(u32::MAX) + 1, "wins").is_err());
    }
}
