use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status persisted on every live-scoring session row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Scorers may submit runs and advance innings.
    Active,
    /// Totals were written to the game record.
    Finalized,
    /// Scoring was abandoned on purpose by a scorer.
    Stopped,
    /// The process restarted while the session was still active.
    Abandoned,
}

impl SessionStatus {
    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    /// Stable upper-case name used by storage filters and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Finalized => "FINALIZED",
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One live-scoring attempt for a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntity {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Game being scored.
    pub game_id: Uuid,
    /// Account owning the game, copied at start for account-wide listings.
    pub account_id: Uuid,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Inning the scorers are currently working on (1-based).
    pub current_inning: u32,
    /// User who started the session.
    pub started_by: Uuid,
    /// When the session was started.
    pub started_at: SystemTime,
    /// When a terminal status was written, if any.
    pub ended_at: Option<SystemTime>,
}

/// Runs scored by one side in one inning of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InningScoreEntity {
    /// Owning session.
    pub session_id: Uuid,
    /// Inning number (1-based).
    pub inning_number: u32,
    /// `true` for the home team's half, `false` for the visitors'.
    pub is_home_team: bool,
    /// Runs scored in that half-inning.
    pub runs: u32,
    /// User who entered the value.
    pub entered_by: Uuid,
    /// When the value was entered.
    pub entered_at: SystemTime,
}

impl InningScoreEntity {
    /// Uniqueness key of an inning row inside its session.
    pub fn key(&self) -> (u32, bool) {
        (self.inning_number, self.is_home_team)
    }
}

/// Status of a game as recorded by the external schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Not yet played to completion.
    Scheduled,
    /// Final score recorded; live scoring is closed.
    Final,
}

impl GameStatus {
    /// Stable upper-case name used by storage filters.
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Scheduled => "SCHEDULED",
            GameStatus::Final => "FINAL",
        }
    }
}

/// Game metadata consumed from the external schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Stable identifier for the game.
    pub id: Uuid,
    /// Account the game belongs to.
    pub account_id: Uuid,
    /// Home team identifier.
    pub home_team_id: Uuid,
    /// Visiting team identifier.
    pub visitor_team_id: Uuid,
    /// Display name of the home team.
    pub home_team_name: String,
    /// Display name of the visiting team.
    pub visitor_team_name: String,
    /// Schedule status.
    pub status: GameStatus,
    /// Final home score once recorded.
    pub home_score: Option<u32>,
    /// Final visitor score once recorded.
    pub visitor_score: Option<u32>,
}

impl GameRecord {
    /// Whether the game already carries a final score.
    pub fn is_final(&self) -> bool {
        self.status == GameStatus::Final
    }
}
