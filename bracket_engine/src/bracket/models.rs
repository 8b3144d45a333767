//! Bracket data models: entrants, matches, slots and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::errors::BracketError;

/// Tournament ID type
pub type TournamentId = i64;

/// Entrant ID type (opaque competitor identifier)
pub type EntrantId = i64;

/// Match ID type
pub type MatchId = Uuid;

/// Which bracket of a tournament a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    Winner,
    Loser,
    GrandFinal,
}

impl BracketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketType::Winner => "winner",
            BracketType::Loser => "loser",
            BracketType::GrandFinal => "grand_final",
        }
    }
}

impl fmt::Display for BracketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BracketType {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "winner" => Ok(BracketType::Winner),
            "loser" => Ok(BracketType::Loser),
            "grand_final" => Ok(BracketType::GrandFinal),
            other => Err(BracketError::InvalidBracket(format!(
                "unknown bracket type '{other}'"
            ))),
        }
    }
}

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "single_elimination",
            TournamentFormat::DoubleElimination => "double_elimination",
            TournamentFormat::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentFormat {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single_elimination" | "single" => Ok(TournamentFormat::SingleElimination),
            "double_elimination" | "double" => Ok(TournamentFormat::DoubleElimination),
            "round_robin" => Ok(TournamentFormat::RoundRobin),
            _ => Err(BracketError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// How registrations are ordered before they are placed into round 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    /// Uniform random permutation
    RandomDraw,
    /// Ascending seed, unseeded entrants last
    SeededDraw,
}

impl OrderingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingMode::RandomDraw => "random_draw",
            OrderingMode::SeededDraw => "seeded_draw",
        }
    }
}

impl FromStr for OrderingMode {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random_draw" | "random" => Ok(OrderingMode::RandomDraw),
            "seeded_draw" | "seeded" => Ok(OrderingMode::SeededDraw),
            _ => Err(BracketError::UnsupportedOrdering(s.to_string())),
        }
    }
}

/// Per-tournament generation settings, stored so regeneration can reuse them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSettings {
    pub format: TournamentFormat,
    pub ordering: OrderingMode,
}

/// A checked-in competitor as consumed by generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    /// Lower is stronger
    pub seed: Option<u32>,
}

impl Entrant {
    pub fn new(id: EntrantId, seed: Option<u32>) -> Self {
        Self { id, seed }
    }
}

/// Registration record kept by the surrounding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub entrant_id: EntrantId,
    pub seed: Option<u32>,
    pub checked_in: bool,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn entrant(&self) -> Entrant {
        Entrant::new(self.entrant_id, self.seed)
    }
}

/// Content of one side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "entrant_id", rename_all = "snake_case")]
pub enum Slot {
    Empty,
    Entrant(EntrantId),
    /// No opponent will ever arrive here
    Bye,
}

impl Slot {
    pub fn entrant(&self) -> Option<EntrantId> {
        match self {
            Slot::Entrant(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye)
    }
}

/// Slot A or slot B of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotSide {
    A,
    B,
}

impl SlotSide {
    /// Even positions feed slot A, odd positions feed slot B
    pub fn for_position(position: u32) -> Self {
        if position % 2 == 0 {
            SlotSide::A
        } else {
            SlotSide::B
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            SlotSide::A => SlotSide::B,
            SlotSide::B => SlotSide::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotSide::A => "a",
            SlotSide::B => "b",
        }
    }
}

impl FromStr for SlotSide {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(SlotSide::A),
            "b" | "B" => Ok(SlotSide::B),
            other => Err(BracketError::InvalidBracket(format!(
                "unknown slot side '{other}'"
            ))),
        }
    }
}

/// Reference from a match to the slot one of its participants moves into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub match_id: MatchId,
    pub slot: SlotSide,
}

impl Link {
    pub fn new(match_id: MatchId, slot: SlotSide) -> Self {
        Self { match_id, slot }
    }
}

/// Bracket membership. Only winner-bracket matches can drop a loser elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bracket {
    Winner { loser_link: Option<Link> },
    Loser,
    GrandFinal,
}

impl Bracket {
    pub fn winner() -> Self {
        Bracket::Winner { loser_link: None }
    }

    pub fn kind(&self) -> BracketType {
        match self {
            Bracket::Winner { .. } => BracketType::Winner,
            Bracket::Loser => BracketType::Loser,
            Bracket::GrandFinal => BracketType::GrandFinal,
        }
    }

    pub fn loser_link(&self) -> Option<Link> {
        match self {
            Bracket::Winner { loser_link } => *loser_link,
            _ => None,
        }
    }

    pub fn from_parts(kind: BracketType, loser_link: Option<Link>) -> Self {
        match kind {
            BracketType::Winner => Bracket::Winner { loser_link },
            BracketType::Loser => Bracket::Loser,
            BracketType::GrandFinal => Bracket::GrandFinal,
        }
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(BracketError::InvalidBracket(format!(
                "unknown match status '{other}'"
            ))),
        }
    }
}

/// Unique position of a match inside a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    pub bracket: BracketType,
    pub round: u32,
    pub position: u32,
}

impl MatchKey {
    pub fn new(bracket: BracketType, round: u32, position: u32) -> Self {
        Self {
            bracket,
            round,
            position,
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} round {} position {}",
            self.bracket, self.round, self.position
        )
    }
}

/// A single match of a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based
    pub round: u32,
    /// 0-based index within the round
    pub position: u32,
    pub bracket: Bracket,
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub score_a: u32,
    pub score_b: u32,
    pub status: MatchStatus,
    pub winner_id: Option<EntrantId>,
    /// Where the winner advances; `None` for a terminal match
    pub next: Option<Link>,
    pub table_number: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create an empty pending match
    pub fn new(tournament_id: TournamentId, bracket: Bracket, round: u32, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            position,
            bracket,
            slot_a: Slot::Empty,
            slot_b: Slot::Empty,
            score_a: 0,
            score_b: 0,
            status: MatchStatus::Pending,
            winner_id: None,
            next: None,
            table_number: None,
            completed_at: None,
        }
    }

    pub fn with_slots(mut self, slot_a: Slot, slot_b: Slot) -> Self {
        self.slot_a = slot_a;
        self.slot_b = slot_b;
        self
    }

    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.bracket.kind(), self.round, self.position)
    }

    pub fn bracket_type(&self) -> BracketType {
        self.bracket.kind()
    }

    pub fn next_match_id(&self) -> Option<MatchId> {
        self.next.map(|link| link.match_id)
    }

    pub fn next_loser_match_id(&self) -> Option<MatchId> {
        self.bracket.loser_link().map(|link| link.match_id)
    }

    pub fn slot(&self, side: SlotSide) -> Slot {
        match side {
            SlotSide::A => self.slot_a,
            SlotSide::B => self.slot_b,
        }
    }

    pub fn slot_mut(&mut self, side: SlotSide) -> &mut Slot {
        match side {
            SlotSide::A => &mut self.slot_a,
            SlotSide::B => &mut self.slot_b,
        }
    }

    /// Entrants currently seated in the match
    pub fn entrants(&self) -> impl Iterator<Item = EntrantId> + '_ {
        [self.slot_a, self.slot_b]
            .into_iter()
            .filter_map(|slot| slot.entrant())
    }

    pub fn side_of(&self, entrant: EntrantId) -> Option<SlotSide> {
        if self.slot_a == Slot::Entrant(entrant) {
            Some(SlotSide::A)
        } else if self.slot_b == Slot::Entrant(entrant) {
            Some(SlotSide::B)
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Either slot is a bye
    pub fn is_bye(&self) -> bool {
        self.slot_a.is_bye() || self.slot_b.is_bye()
    }

    /// Both slots hold entrants
    pub fn is_ready(&self) -> bool {
        self.slot_a.entrant().is_some() && self.slot_b.entrant().is_some()
    }

    /// The eliminated side of a decided, non-bye match
    pub fn loser_id(&self) -> Option<EntrantId> {
        let winner = self.winner_id?;
        match self.side_of(winner)? {
            SlotSide::A => self.slot_b.entrant(),
            SlotSide::B => self.slot_a.entrant(),
        }
    }

    /// The unordered pair of entrants, smaller id first
    pub fn pairing(&self) -> Option<(EntrantId, EntrantId)> {
        let a = self.slot_a.entrant()?;
        let b = self.slot_b.entrant()?;
        Some((a.min(b), a.max(b)))
    }

    pub fn apply(&mut self, patch: &MatchPatch) {
        if let Some(slot) = patch.slot_a {
            self.slot_a = slot;
        }
        if let Some(slot) = patch.slot_b {
            self.slot_b = slot;
        }
        if let Some(score) = patch.score_a {
            self.score_a = score;
        }
        if let Some(score) = patch.score_b {
            self.score_b = score;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(winner) = patch.winner_id {
            self.winner_id = winner;
        }
        if let Some(next) = patch.next {
            self.next = next;
        }
        if let Some(link) = patch.loser_link
            && let Bracket::Winner { loser_link } = &mut self.bracket
        {
            *loser_link = link;
        }
        if let Some(table) = patch.table_number {
            self.table_number = table;
        }
        if let Some(at) = patch.completed_at {
            self.completed_at = at;
        }
    }
}

/// Partial update of a match; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPatch {
    pub slot_a: Option<Slot>,
    pub slot_b: Option<Slot>,
    pub score_a: Option<u32>,
    pub score_b: Option<u32>,
    pub status: Option<MatchStatus>,
    pub winner_id: Option<Option<EntrantId>>,
    pub next: Option<Option<Link>>,
    pub loser_link: Option<Option<Link>>,
    pub table_number: Option<Option<u32>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl MatchPatch {
    /// The patch that turns `before` into `after`
    pub fn between(before: &Match, after: &Match) -> Self {
        fn changed<T: PartialEq + Copy>(old: T, new: T) -> Option<T> {
            (old != new).then_some(new)
        }

        Self {
            slot_a: changed(before.slot_a, after.slot_a),
            slot_b: changed(before.slot_b, after.slot_b),
            score_a: changed(before.score_a, after.score_a),
            score_b: changed(before.score_b, after.score_b),
            status: changed(before.status, after.status),
            winner_id: changed(before.winner_id, after.winner_id),
            next: changed(before.next, after.next),
            loser_link: changed(before.bracket.loser_link(), after.bracket.loser_link()),
            table_number: changed(before.table_number, after.table_number),
            completed_at: changed(before.completed_at, after.completed_at),
        }
    }

    pub fn table(table_number: Option<u32>) -> Self {
        Self {
            table_number: Some(table_number),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a generation or regeneration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSummary {
    pub format: TournamentFormat,
    /// Winner-bracket rounds (1 for round robin)
    pub rounds: u32,
    pub loser_rounds: u32,
    /// Total matches in the tournament after the run
    pub matches: usize,
    pub preserved_count: usize,
}

/// Per-entrant record within a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub entrant_id: EntrantId,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
}

impl PlayerStats {
    pub fn new(entrant_id: EntrantId) -> Self {
        Self {
            entrant_id,
            matches_played: 0,
            wins: 0,
            losses: 0,
        }
    }
}
