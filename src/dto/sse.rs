use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::ConnectionRole;

#[derive(Clone, Debug)]
/// Named payload queued on SSE connections.
pub struct ServerEvent {
    pub event: String,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<T>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// First event sent on every subscription.
pub struct ConnectedEvent {
    pub client_id: String,
    pub game_id: Uuid,
    pub role: ConnectionRole,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Sent instead of a state snapshot when the game has no active session.
pub struct NoSessionEvent {
    pub game_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a scorer opens live scoring.
pub struct SessionStartedEvent {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub started_by: String,
    pub started_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever runs are recorded for a half-inning.
pub struct ScoreUpdateEvent {
    pub inning_number: u32,
    pub is_home_team: bool,
    pub runs: u32,
    pub entered_by: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the session moves to another inning.
pub struct InningAdvancedEvent {
    pub inning_number: u32,
    pub advanced_by: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast once totals have been written to the game.
pub struct SessionFinalizedEvent {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub finalized_by: String,
    pub timestamp: String,
    pub home_team_total: u32,
    pub visitor_team_total: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a scorer stops the session without finalizing.
pub struct SessionStoppedEvent {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub stopped_by: String,
    pub timestamp: String,
}
