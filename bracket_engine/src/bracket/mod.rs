//! Bracket module for single elimination, double elimination and round
//! robin events.
//!
//! This module provides:
//! - Entrant ordering (random or seeded draw)
//! - Format generators and successor linking
//! - Result reporting with winner advancement and loser drops
//! - Regeneration that keeps completed results
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::bracket::{BracketManager, OrderingMode, TournamentFormat};
//! use bracket_engine::config::EngineConfig;
//! use bracket_engine::db::{Database, DatabaseConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let manager = BracketManager::new(Arc::new(db.repository()), EngineConfig::from_env()?);
//!
//!     let summary = manager
//!         .generate_bracket(42, TournamentFormat::DoubleElimination, OrderingMode::SeededDraw)
//!         .await?;
//!     println!("{} rounds, {} matches", summary.rounds, summary.matches);
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod board;
pub mod errors;
pub mod generator;
pub mod linker;
pub mod manager;
pub mod models;
pub mod ordering;
pub mod regeneration;
pub mod validation;

pub use advancement::{AdvancementOutcome, Advancer, MatchReport, champion};
pub use board::{Board, BoardChanges, Decided};
pub use errors::{BracketError, BracketResult};
pub use manager::BracketManager;
pub use models::{
    Bracket, BracketSettings, BracketSummary, BracketType, Entrant, EntrantId, Link, Match,
    MatchId, MatchKey, MatchPatch, MatchStatus, OrderingMode, PlayerStats, Registration, Slot,
    SlotSide, TournamentFormat, TournamentId,
};
pub use ordering::EntrantOrdering;
pub use validation::validate_bracket;
