//! # Bracket Engine
//!
//! Bracket generation and match advancement for competitive events.
//!
//! Given the checked-in entrants of a tournament, the engine builds a
//! single elimination, double elimination or round robin bracket, links
//! every match to the slot its winner (and, in double elimination, its
//! loser) moves into, and advances entrants as results are reported.
//! Brackets can be regenerated at any point without losing completed
//! results.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Models, generators, linker, advancement and the manager
//! - [`db`]: Match storage (PostgreSQL and in-memory)
//! - [`config`]: Engine configuration
//!
//! ## Example
//!
//! ```
//! use bracket_engine::bracket::{Board, TournamentFormat, generator, linker};
//! use chrono::Utc;
//!
//! let mut board = Board::new(1, Vec::new()).unwrap();
//! let format = TournamentFormat::SingleElimination;
//! let layout = generator::generate(format, &mut board, &[1, 2, 3, 4, 5], Utc::now()).unwrap();
//! linker::link(&mut board, format).unwrap();
//!
//! assert_eq!(layout.rounds(), 3);
//! ```

/// Bracket models, generation and advancement.
pub mod bracket;
pub use bracket::{
    BracketError, BracketManager, BracketResult, BracketSummary, Match, MatchReport,
    OrderingMode, TournamentFormat,
};

/// Engine configuration.
pub mod config;
pub use config::{ConfigError, EngineConfig};

/// Match storage.
pub mod db;
