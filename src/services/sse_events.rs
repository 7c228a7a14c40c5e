use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        live::SessionStateResponse,
        sse::{
            ConnectedEvent, InningAdvancedEvent, NoSessionEvent, ScoreUpdateEvent, ServerEvent,
            SessionFinalizedEvent, SessionStartedEvent, SessionStoppedEvent,
        },
    },
    state::{BroadcastHub, ConnectionRole},
};

pub(crate) const EVENT_CONNECTED: &str = "connected";
pub(crate) const EVENT_STATE: &str = "state";
pub(crate) const EVENT_NO_SESSION: &str = "no_session";
pub(crate) const EVENT_SESSION_STARTED: &str = "session_started";
pub(crate) const EVENT_SCORE_UPDATE: &str = "score_update";
pub(crate) const EVENT_INNING_ADVANCED: &str = "inning_advanced";
pub(crate) const EVENT_SESSION_FINALIZED: &str = "session_finalized";
pub(crate) const EVENT_SESSION_STOPPED: &str = "session_stopped";

/// Greeting queued on a fresh connection before anything else.
pub fn connected_event(client_id: &str, game_id: Uuid, role: ConnectionRole) -> Option<ServerEvent> {
    let payload = ConnectedEvent {
        client_id: client_id.to_string(),
        game_id,
        role,
    };
    encode(EVENT_CONNECTED, &payload)
}

/// Snapshot queued on a fresh connection when the game is being scored.
pub fn state_event(snapshot: &SessionStateResponse) -> Option<ServerEvent> {
    encode(EVENT_STATE, snapshot)
}

/// Queued on a fresh connection when the game has no active session.
pub fn no_session_event(game_id: Uuid) -> Option<ServerEvent> {
    encode(EVENT_NO_SESSION, &NoSessionEvent { game_id })
}

/// Broadcast that a scorer opened live scoring for the game.
pub fn broadcast_session_started(hub: &BroadcastHub, game_id: Uuid, payload: SessionStartedEvent) {
    send_game_event(hub, game_id, EVENT_SESSION_STARTED, &payload);
}

/// Broadcast the runs just recorded for a half-inning.
pub fn broadcast_score_update(hub: &BroadcastHub, game_id: Uuid, payload: ScoreUpdateEvent) {
    send_game_event(hub, game_id, EVENT_SCORE_UPDATE, &payload);
}

/// Broadcast the inning the session moved to.
pub fn broadcast_inning_advanced(hub: &BroadcastHub, game_id: Uuid, payload: InningAdvancedEvent) {
    send_game_event(hub, game_id, EVENT_INNING_ADVANCED, &payload);
}

/// Broadcast the final totals written to the game.
pub fn broadcast_session_finalized(
    hub: &BroadcastHub,
    game_id: Uuid,
    payload: SessionFinalizedEvent,
) {
    send_game_event(hub, game_id, EVENT_SESSION_FINALIZED, &payload);
}

/// Broadcast that the session ended without a final score.
pub fn broadcast_session_stopped(hub: &BroadcastHub, game_id: Uuid, payload: SessionStoppedEvent) {
    send_game_event(hub, game_id, EVENT_SESSION_STOPPED, &payload);
}

fn send_game_event<T>(hub: &BroadcastHub, game_id: Uuid, event: &str, payload: &T)
where
    T: Serialize,
{
    if let Some(message) = encode(event, payload) {
        hub.broadcast(game_id, message);
    }
}

fn encode<T>(event: &str, payload: &T) -> Option<ServerEvent>
where
    T: Serialize,
{
    match ServerEvent::json(event, payload) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(event, error = %err, "failed to serialise SSE payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn score_updates_use_camel_case_payloads() {
        let hub = BroadcastHub::new();
        let game_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(4);
        hub.add_connection("c1", tx, Uuid::new_v4(), game_id, ConnectionRole::Viewer);

        broadcast_score_update(
            &hub,
            game_id,
            ScoreUpdateEvent {
                inning_number: 3,
                is_home_team: true,
                runs: 2,
                entered_by: "Pat".into(),
                timestamp: "2026-01-01T00:00:00Z".into(),
            },
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, EVENT_SCORE_UPDATE);
        let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(data["inningNumber"], 3);
        assert_eq!(data["isHomeTeam"], true);
        assert_eq!(data["enteredBy"], "Pat");
    }

    #[test]
    fn connected_event_carries_role() {
        let event = connected_event("c9", Uuid::nil(), ConnectionRole::Scorer).unwrap();
        let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(event.event, EVENT_CONNECTED);
        assert_eq!(data["clientId"], "c9");
        assert_eq!(data["role"], "scorer");
    }
}
