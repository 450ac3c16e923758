//! Common types used throughout the rating engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for players
pub type PlayerId = String;

/// Why a rating snapshot was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// Rating assigned from the trial matches at registration
    Initial,
    /// Rating after a settled match
    Match,
}

/// A point-in-time snapshot of a player's rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub rating: f64,
    pub kind: HistoryKind,
}

/// Rating-relevant view of a registered player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub rating: f64,
    /// Append-only; entries are never removed or reordered
    #[serde(default)]
    pub rating_history: Vec<RatingHistoryEntry>,
}

impl Player {
    /// Create a player with no history (e.g. one loaded from an external source)
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, rating: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rating,
            rating_history: Vec::new(),
        }
    }

    /// Create a freshly registered player whose history starts with the initial rating
    pub fn with_initial_rating(
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        rating: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut player = Self::new(id, name, rating);
        player.record_snapshot(now, HistoryKind::Initial);
        player
    }

    /// Append the current rating to the history
    pub fn record_snapshot(&mut self, timestamp: DateTime<Utc>, kind: HistoryKind) {
        self.rating_history.push(RatingHistoryEntry {
            timestamp,
            rating: self.rating,
            kind,
        });
    }
}

/// One side of a doubles match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Team1,
    Team2,
}

impl TeamSide {
    /// The other side of the net
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::Team1 => TeamSide::Team2,
            TeamSide::Team2 => TeamSide::Team1,
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::Team1 => write!(f, "team1"),
            TeamSide::Team2 => write!(f, "team2"),
        }
    }
}

/// A completed doubles match holding the participating player records.
///
/// The team vectors are expected to hold exactly two players each; the
/// engine rejects anything else before touching a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoublesMatch {
    pub team1: Vec<Player>,
    pub team2: Vec<Player>,
    pub winner: Option<TeamSide>,
}

impl DoublesMatch {
    pub fn new(team1: Vec<Player>, team2: Vec<Player>, winner: TeamSide) -> Self {
        Self {
            team1,
            team2,
            winner: Some(winner),
        }
    }

    pub fn team(&self, side: TeamSide) -> &[Player] {
        match side {
            TeamSide::Team1 => &self.team1,
            TeamSide::Team2 => &self.team2,
        }
    }

    pub fn team_mut(&mut self, side: TeamSide) -> &mut Vec<Player> {
        match side {
            TeamSide::Team1 => &mut self.team1,
            TeamSide::Team2 => &mut self.team2,
        }
    }
}

/// A match result as submitted by the match recorder, referencing players by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team1: Vec<PlayerId>,
    pub team2: Vec<PlayerId>,
    #[serde(default)]
    pub winner: Option<TeamSide>,
    /// When the match was played; recorders fall back to the current time
    #[serde(default)]
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    pub fn new(team1: [&str; 2], team2: [&str; 2], winner: TeamSide) -> Self {
        Self {
            team1: team1.iter().map(|id| id.to_string()).collect(),
            team2: team2.iter().map(|id| id.to_string()).collect(),
            winner: Some(winner),
            played_at: None,
        }
    }

    /// All player ids in team order
    pub fn player_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.team1.iter().chain(self.team2.iter())
    }
}

/// Outcome of one trial match played by a new player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub won: bool,
    /// Only consulted by the opponent-relative trial formula
    #[serde(default)]
    pub opponent_rating: Option<f64>,
}

impl TrialResult {
    pub fn won() -> Self {
        Self {
            won: true,
            opponent_rating: None,
        }
    }

    pub fn lost() -> Self {
        Self {
            won: false,
            opponent_rating: None,
        }
    }

    pub fn against(won: bool, opponent_rating: f64) -> Self {
        Self {
            won,
            opponent_rating: Some(opponent_rating),
        }
    }
}

/// Result of applying a proposed change through the daily cap and global bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub new_rating: f64,
    /// `new_rating - previous rating`
    pub actual_change: f64,
    /// Change left after the daily cap, before the global clamp
    pub effective_change: f64,
}

/// Rating movement of a single player within a settled match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatingUpdate {
    pub player_id: PlayerId,
    pub side: TeamSide,
    pub won: bool,
    pub old_rating: f64,
    pub new_rating: f64,
    /// Change from the outcome table, after the global pre-clamp
    pub proposed_change: f64,
    pub actual_change: f64,
}

/// Everything a caller needs to persist after settling a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub winner: TeamSide,
    pub team1_average: f64,
    pub team2_average: f64,
    pub updates: Vec<PlayerRatingUpdate>,
    pub settled_at: DateTime<Utc>,
}

impl SettlementResult {
    pub fn update_for(&self, player_id: &str) -> Option<&PlayerRatingUpdate> {
        self.updates.iter().find(|u| u.player_id == player_id)
    }
}
