//! Match advancement: results move winners forward and drop losers into the
//! loser bracket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    board::Board,
    errors::{BracketError, BracketResult},
    generator::double,
    models::{
        BracketType, EntrantId, Link, Match, MatchId, MatchKey, MatchStatus, Slot, SlotSide,
        TournamentFormat,
    },
};

/// A reported result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub match_id: MatchId,
    pub score_a: u32,
    pub score_b: u32,
    pub winner_id: EntrantId,
}

/// What a reported result changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancementOutcome {
    pub winner_id: EntrantId,
    pub loser_id: Option<EntrantId>,
    /// Set once the terminal match is decided
    pub champion: Option<EntrantId>,
    /// Grand final reset created by this result
    pub reset_created: Option<MatchId>,
    /// Bye matches completed as entrants moved through them
    pub auto_completed: Vec<MatchId>,
}

/// Applies results to a board.
///
/// Every change stays on the board until the caller writes it back, so a
/// failed advancement leaves storage untouched.
pub struct Advancer<'a> {
    board: &'a mut Board,
    format: TournamentFormat,
    now: DateTime<Utc>,
    auto_completed: Vec<MatchId>,
}

impl<'a> Advancer<'a> {
    /// Create a new advancer
    pub fn new(board: &'a mut Board, format: TournamentFormat, now: DateTime<Utc>) -> Self {
        Self {
            board,
            format,
            now,
            auto_completed: Vec::new(),
        }
    }

    /// Move a ready match to `InProgress`
    pub fn start(&mut self, match_id: MatchId) -> BracketResult<()> {
        let m = self
            .board
            .get_mut(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        match m.status {
            MatchStatus::Completed => Err(BracketError::MatchAlreadyCompleted(match_id)),
            MatchStatus::InProgress => Ok(()),
            MatchStatus::Pending if !m.is_ready() => Err(BracketError::MatchNotReady(match_id)),
            MatchStatus::Pending => {
                m.status = MatchStatus::InProgress;
                Ok(())
            }
        }
    }

    /// Complete a match and propagate its participants
    ///
    /// # Arguments
    ///
    /// * `report` - Scores and winner of the match
    ///
    /// # Returns
    ///
    /// * `BracketResult<AdvancementOutcome>` - Loser, champion and any reset
    ///   or bye completions caused by the result
    pub fn report(&mut self, report: &MatchReport) -> BracketResult<AdvancementOutcome> {
        let match_id = report.match_id;
        let m = self
            .board
            .get(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if m.is_completed() {
            return Err(BracketError::MatchAlreadyCompleted(match_id));
        }
        if !m.is_ready() {
            return Err(BracketError::MatchNotReady(match_id));
        }
        if m.side_of(report.winner_id).is_none() {
            return Err(BracketError::InvalidWinner {
                match_id,
                winner_id: report.winner_id,
            });
        }

        let now = self.now;
        let m = self
            .board
            .get_mut(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;
        m.score_a = report.score_a;
        m.score_b = report.score_b;
        m.winner_id = Some(report.winner_id);
        m.status = MatchStatus::Completed;
        m.completed_at = Some(now);
        let loser_id = m.loser_id();
        if let Some(loser) = loser_id {
            self.board.record_decided(report.winner_id, loser);
        }

        self.advance_winner(match_id)?;
        self.drop_loser(match_id)?;
        let reset_created = self.create_reset(match_id)?;

        Ok(AdvancementOutcome {
            winner_id: report.winner_id,
            loser_id,
            champion: champion(self.board, self.format),
            reset_created,
            auto_completed: std::mem::take(&mut self.auto_completed),
        })
    }

    /// Seat the participants of completed matches in their successors.
    ///
    /// Used after (re)generation, when preserved results and fresh byes point
    /// at newly created matches. Participants already seated are skipped.
    pub fn reseat_completed(&mut self) -> BracketResult<Vec<MatchId>> {
        for id in self.board.sorted_ids() {
            if self.board.get(id).is_some_and(Match::is_completed) {
                self.advance_winner(id)?;
                self.drop_loser(id)?;
            }
        }
        Ok(std::mem::take(&mut self.auto_completed))
    }

    fn advance_winner(&mut self, match_id: MatchId) -> BracketResult<()> {
        let m = self
            .board
            .get(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;

        match (m.winner_id, m.next) {
            (Some(winner), Some(link)) => self.place(link, winner),
            _ => Ok(()),
        }
    }

    fn drop_loser(&mut self, match_id: MatchId) -> BracketResult<()> {
        if self.format != TournamentFormat::DoubleElimination {
            return Ok(());
        }
        let m = self
            .board
            .get(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;
        if m.bracket_type() != BracketType::Winner {
            return Ok(());
        }
        let Some(loser) = m.loser_id() else {
            return Ok(());
        };

        let link = match m.bracket.loser_link() {
            Some(link) => link,
            None if self.board.is_winner_final(m) => self.board.final_loser_destination().ok_or(
                BracketError::NoOpenDestinationSlot {
                    bracket: BracketType::GrandFinal,
                    round: 1,
                },
            )?,
            None => open_loser_slot(self.board, m.round)?,
        };

        self.place(link, loser)
    }

    /// Seat `entrant` in the linked slot, completing bye matches it lands in
    fn place(&mut self, link: Link, entrant: EntrantId) -> BracketResult<()> {
        let now = self.now;
        let target = self
            .board
            .get_mut(link.match_id)
            .ok_or(BracketError::MatchNotFound(link.match_id))?;

        match target.slot(link.slot) {
            Slot::Empty => *target.slot_mut(link.slot) = Slot::Entrant(entrant),
            Slot::Entrant(id) if id == entrant => return Ok(()),
            _ => {
                return Err(BracketError::SlotAlreadyOccupied {
                    match_id: link.match_id,
                    slot: link.slot,
                });
            }
        }

        if target.is_completed() || !target.slot(link.slot.opposite()).is_bye() {
            return Ok(());
        }

        target.status = MatchStatus::Completed;
        target.winner_id = Some(entrant);
        target.completed_at = Some(now);
        log::debug!(
            "Tournament {}: entrant {} advances through bye at {}",
            target.tournament_id,
            entrant,
            target.key()
        );
        self.auto_completed.push(link.match_id);
        self.advance_winner(link.match_id)
    }

    /// Create the reset final when the first grand final went to slot B
    fn create_reset(&mut self, match_id: MatchId) -> BracketResult<Option<MatchId>> {
        let reset_key = MatchKey::new(BracketType::GrandFinal, 2, 0);
        let Some(reset) = self
            .board
            .get(match_id)
            .filter(|m| m.bracket_type() == BracketType::GrandFinal)
            .and_then(double::reset_match)
        else {
            return Ok(None);
        };
        if self.board.at(reset_key).is_some() {
            return Ok(None);
        }

        log::info!(
            "Tournament {}: loser-bracket champion {:?} forced a grand final reset",
            reset.tournament_id,
            reset.slot_a.entrant()
        );
        self.board.insert(reset).map(Some)
    }
}

/// Lowest-position open slot of the loser-bracket round that absorbs losers
/// of winner-bracket round `winner_round`
fn open_loser_slot(board: &Board, winner_round: u32) -> BracketResult<Link> {
    let round = if winner_round == 1 {
        1
    } else {
        2 * (winner_round - 1)
    };

    board
        .round(BracketType::Loser, round)
        .into_iter()
        .filter(|m| !m.is_completed())
        .flat_map(|m| [(m, SlotSide::A), (m, SlotSide::B)])
        .find(|(m, side)| m.slot(*side).is_empty())
        .map(|(m, side)| Link::new(m.id, side))
        .ok_or(BracketError::NoOpenDestinationSlot {
            bracket: BracketType::Loser,
            round,
        })
}

/// Tournament winner, once the terminal match is decided.
///
/// Round robin has no terminal match and never reports a champion here.
pub fn champion(board: &Board, format: TournamentFormat) -> Option<EntrantId> {
    match format {
        TournamentFormat::SingleElimination => {
            let last = board.max_round(BracketType::Winner)?;
            board
                .at(MatchKey::new(BracketType::Winner, last, 0))
                .filter(|m| m.is_completed() && m.next.is_none())
                .and_then(|m| m.winner_id)
        }
        TournamentFormat::DoubleElimination => {
            if let Some(reset) = board.at(MatchKey::new(BracketType::GrandFinal, 2, 0)) {
                return reset.winner_id.filter(|_| reset.is_completed());
            }
            board
                .at(MatchKey::new(BracketType::GrandFinal, 1, 0))
                .filter(|gf| gf.is_completed() && double::reset_match(gf).is_none())
                .and_then(|gf| gf.winner_id)
        }
        TournamentFormat::RoundRobin => None,
    }
}
