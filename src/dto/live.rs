//! Request and response bodies of the live-scoring REST routes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SessionStatus,
    dto::validation::{validate_inning_number, validate_runs},
};

// `validator` hands numeric fields to custom validators by value.
fn inning_number_by_value(inning: u32) -> Result<(), validator::ValidationError> {
    validate_inning_number(&inning)
}

fn runs_by_value(runs: u32) -> Result<(), validator::ValidationError> {
    validate_runs(&runs)
}

/// Presence of a live session for a game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub has_active_session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_count: Option<usize>,
}

/// Runs recorded for one half-inning.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InningScoreResponse {
    pub inning_number: u32,
    pub is_home_team: bool,
    pub runs: u32,
    /// Display name of the scorer who entered the value.
    pub entered_by: String,
    pub entered_at: String,
}

/// Full snapshot of an active session, also pushed as the `state` SSE event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub status: SessionStatus,
    pub current_inning: u32,
    /// Display name of the scorer who started the session.
    pub started_by: String,
    pub started_at: String,
    pub innings: Vec<InningScoreResponse>,
    pub home_team_total: u32,
    pub visitor_team_total: u32,
    pub viewer_count: usize,
    pub scorer_count: usize,
}

/// Runs submitted by a scorer for one half-inning.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    #[validate(custom(function = "inning_number_by_value"))]
    pub inning_number: u32,
    pub is_home_team: bool,
    #[validate(custom(function = "runs_by_value"))]
    pub runs: u32,
}

/// Inning the session should move to.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceInningRequest {
    #[validate(custom(function = "inning_number_by_value"))]
    pub inning_number: u32,
}

/// Result of an inning advance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InningAdvancedResponse {
    pub session_id: Uuid,
    pub current_inning: u32,
}

/// Totals written to the game when a session is finalized.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub status: SessionStatus,
    pub home_team_total: u32,
    pub visitor_team_total: u32,
}

/// Acknowledgement of a stopped session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub session_id: Uuid,
    pub game_id: Uuid,
    pub status: SessionStatus,
}

/// Subscription ticket handed to an authenticated user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket: String,
    /// Seconds before the ticket stops being accepted.
    pub expires_in: u64,
}

/// Query string of the subscribe route.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscribeQuery {
    /// Ticket obtained from the ticket route.
    pub ticket: Option<String>,
}

/// Game of the account currently being scored live.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionItem {
    pub game_id: Uuid,
    pub session_id: Uuid,
}
