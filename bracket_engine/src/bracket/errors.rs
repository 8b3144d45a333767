//! Bracket error types.

use thiserror::Error;

use super::models::{BracketType, EntrantId, MatchId, SlotSide, TournamentId};
use crate::db::StorageError;

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Fewer checked-in entrants than a bracket needs
    #[error("Insufficient entrants: need {needed}, have {current}")]
    InsufficientEntrants { needed: usize, current: usize },

    #[error("Unsupported tournament format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported ordering mode: {0}")]
    UnsupportedOrdering(String),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Two results raced for the same destination, or a generator defect
    #[error("Slot {slot:?} of match {match_id} is already occupied")]
    SlotAlreadyOccupied { match_id: MatchId, slot: SlotSide },

    /// Bracket linkage defect
    #[error("No open destination slot in {bracket} bracket round {round}")]
    NoOpenDestinationSlot { bracket: BracketType, round: u32 },

    #[error("Entrant {winner_id} is not a participant of match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner_id: EntrantId,
    },

    #[error("Match already completed: {0}")]
    MatchAlreadyCompleted(MatchId),

    #[error("Match {0} does not have two entrants yet")]
    MatchNotReady(MatchId),

    #[error("No bracket has been generated for tournament {0}")]
    NotGenerated(TournamentId),

    #[error(
        "Completed match at {bracket} round {round} position {position} does not fit the regenerated layout"
    )]
    PreservedLayoutConflict {
        bracket: BracketType,
        round: u32,
        position: u32,
    },

    /// Structural validation failure
    #[error("Invalid bracket: {0}")]
    InvalidBracket(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BracketError {
    /// Get a client-safe error message
    ///
    /// Storage errors are sanitized so driver details never reach callers.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Storage(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Errors caused by the caller rather than by bracket state
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            BracketError::InsufficientEntrants { .. }
                | BracketError::UnsupportedFormat(_)
                | BracketError::UnsupportedOrdering(_)
                | BracketError::MatchNotFound(_)
                | BracketError::InvalidWinner { .. }
                | BracketError::MatchAlreadyCompleted(_)
                | BracketError::MatchNotReady(_)
                | BracketError::NotGenerated(_)
        )
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_sanitized() {
        let err = BracketError::Storage(StorageError::NotFound("match 42".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_caller_errors_keep_their_message() {
        let err = BracketError::InsufficientEntrants {
            needed: 2,
            current: 1,
        };
        assert!(err.is_caller_error());
        assert_eq!(err.client_message(), "Insufficient entrants: need 2, have 1");
    }
}
