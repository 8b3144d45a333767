//! Integration tests for round robin schedules and standings.

use bracket_engine::{
    bracket::{
        BracketManager, BracketType, EntrantId, MatchReport, MatchStatus, OrderingMode,
        Registration, TournamentFormat, TournamentId,
    },
    config::EngineConfig,
    db::InMemoryMatchRepository,
};
use chrono::Utc;
use std::{collections::HashSet, sync::Arc};

/// Helper to create a manager over a fresh in-memory store
fn manager() -> BracketManager {
    BracketManager::new(
        Arc::new(InMemoryMatchRepository::new()),
        EngineConfig::default(),
    )
}

async fn register_all(manager: &BracketManager, tournament_id: TournamentId, count: EntrantId) {
    for id in 1..=count {
        let registration = Registration {
            entrant_id: id,
            seed: Some(id as u32),
            checked_in: true,
            registered_at: Utc::now(),
        };
        manager.register(tournament_id, &registration).await.unwrap();
    }
}

#[tokio::test]
async fn test_schedule_covers_every_pair_once() {
    let manager = manager();
    register_all(&manager, 1, 6).await;

    let summary = manager
        .generate_bracket(1, TournamentFormat::RoundRobin, OrderingMode::SeededDraw)
        .await
        .unwrap();
    assert_eq!(summary.matches, 15);
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.loser_rounds, 0);

    let matches = manager.list_matches(1).await.unwrap();
    let pairs: HashSet<(EntrantId, EntrantId)> =
        matches.iter().filter_map(|m| m.pairing()).collect();
    assert_eq!(pairs.len(), 15);
    assert!(matches.iter().all(|m| {
        m.round == 1 && m.bracket_type() == BracketType::Winner && m.next.is_none()
    }));
}

#[tokio::test]
async fn test_results_feed_standings_without_advancing() {
    let manager = manager();
    register_all(&manager, 2, 4).await;
    manager
        .generate_bracket(2, TournamentFormat::RoundRobin, OrderingMode::SeededDraw)
        .await
        .unwrap();

    // Lower id wins every pairing
    for m in manager.list_matches(2).await.unwrap() {
        let winner_id = m.entrants().min().unwrap();
        let outcome = manager
            .report_result(MatchReport {
                match_id: m.id,
                score_a: 1,
                score_b: 0,
                winner_id,
            })
            .await
            .unwrap();
        assert_eq!(outcome.champion, None);
        assert!(outcome.auto_completed.is_empty());
    }

    let matches = manager.list_matches(2).await.unwrap();
    assert_eq!(matches.len(), 6);
    assert!(matches.iter().all(|m| m.status == MatchStatus::Completed));

    let standings = manager.standings(2).await.unwrap();
    let order: Vec<(EntrantId, u32, u32)> = standings
        .iter()
        .map(|s| (s.entrant_id, s.wins, s.losses))
        .collect();
    assert_eq!(order, vec![(1, 3, 0), (2, 2, 1), (3, 1, 2), (4, 0, 3)]);
    assert!(standings.iter().all(|s| s.matches_played == 3));
}

#[tokio::test]
async fn test_late_entrant_gets_only_new_pairings() {
    let manager = manager();
    register_all(&manager, 3, 3).await;
    manager
        .generate_bracket(3, TournamentFormat::RoundRobin, OrderingMode::SeededDraw)
        .await
        .unwrap();

    let played = manager.list_matches(3).await.unwrap()[0].clone();
    manager
        .report_result(MatchReport {
            match_id: played.id,
            score_a: 0,
            score_b: 2,
            winner_id: played.slot_b.entrant().unwrap(),
        })
        .await
        .unwrap();

    register_all(&manager, 3, 4).await;
    let summary = manager.regenerate_bracket(3).await.unwrap();
    assert_eq!(summary.matches, 6);
    assert_eq!(summary.preserved_count, 1);

    let matches = manager.list_matches(3).await.unwrap();
    let pairs: HashSet<(EntrantId, EntrantId)> =
        matches.iter().filter_map(|m| m.pairing()).collect();
    assert_eq!(pairs.len(), 6);

    let kept = matches.iter().find(|m| m.id == played.id).unwrap();
    assert_eq!(kept.status, MatchStatus::Completed);
    let positions: HashSet<u32> = matches.iter().map(|m| m.position).collect();
    assert_eq!(positions.len(), 6);
}
