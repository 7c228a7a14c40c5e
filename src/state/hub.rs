use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Role of a push connection, derived from the user's scoring permission at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// Read-only spectator.
    Viewer,
    /// User allowed to enter scores for the game.
    Scorer,
}

struct Connection {
    game_id: Uuid,
    user_id: Uuid,
    role: ConnectionRole,
    sender: mpsc::Sender<ServerEvent>,
}

/// Process-wide registry of open SSE connections, grouped by game.
#[derive(Default)]
pub struct BroadcastHub {
    connections: DashMap<String, Connection>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Registering the same client id again replaces the previous entry.
    pub fn add_connection(
        &self,
        client_id: impl Into<String>,
        sender: mpsc::Sender<ServerEvent>,
        user_id: Uuid,
        game_id: Uuid,
        role: ConnectionRole,
    ) {
        let client_id = client_id.into();
        debug!(%client_id, %game_id, %user_id, ?role, "registering connection");
        self.connections.insert(
            client_id,
            Connection {
                game_id,
                user_id,
                role,
                sender,
            },
        );
    }

    /// Forget a connection. Returns whether it was registered.
    pub fn remove_connection(&self, client_id: &str) -> bool {
        match self.connections.remove(client_id) {
            Some((_, connection)) => {
                debug!(
                    client_id,
                    game_id = %connection.game_id,
                    user_id = %connection.user_id,
                    "connection removed"
                );
                true
            }
            None => false,
        }
    }

    /// Queue `event` on every connection subscribed to `game_id`.
    ///
    /// Each delivery is attempted independently and never waits: a connection whose buffer is
    /// full misses this event, a closed connection is pruned. Returns how many connections
    /// accepted the event.
    pub fn broadcast(&self, game_id: Uuid, event: ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.connections.iter() {
            let connection = entry.value();
            if connection.game_id != game_id {
                continue;
            }
            match connection.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        client_id = %entry.key(),
                        %game_id,
                        event = %event.event,
                        "connection buffer full; dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(entry.key().clone()),
            }
        }

        for client_id in closed {
            self.remove_connection(&client_id);
        }

        debug!(%game_id, event = %event.event, delivered, "event fanned out");
        delivered
    }

    /// Number of viewer connections open for `game_id`.
    pub fn viewer_count(&self, game_id: Uuid) -> usize {
        self.count(game_id, ConnectionRole::Viewer)
    }

    /// Number of scorer connections open for `game_id`.
    pub fn scorer_count(&self, game_id: Uuid) -> usize {
        self.count(game_id, ConnectionRole::Scorer)
    }

    /// Total number of open connections across every game.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn count(&self, game_id: Uuid, role: ConnectionRole) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.game_id == game_id && entry.role == role)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent::new(name, "{}")
    }

    #[test]
    fn broadcast_reaches_only_the_target_game() {
        let hub = BroadcastHub::new();
        let game = Uuid::new_v4();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        hub.add_connection("a", tx_a, Uuid::new_v4(), game, ConnectionRole::Viewer);
        hub.add_connection("b", tx_b, Uuid::new_v4(), Uuid::new_v4(), ConnectionRole::Viewer);

        assert_eq!(hub.broadcast(game, event("score_update")), 1);
        assert_eq!(rx_a.try_recv().unwrap().event, "score_update");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn full_connection_does_not_block_the_others() {
        let hub = BroadcastHub::new();
        let game = Uuid::new_v4();
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        hub.add_connection("slow", slow_tx, Uuid::new_v4(), game, ConnectionRole::Viewer);
        hub.add_connection("fast", fast_tx, Uuid::new_v4(), game, ConnectionRole::Viewer);

        assert_eq!(hub.broadcast(game, event("first")), 2);
        assert_eq!(hub.broadcast(game, event("second")), 1);

        assert_eq!(fast_rx.try_recv().unwrap().event, "first");
        assert_eq!(fast_rx.try_recv().unwrap().event, "second");
        assert_eq!(hub.connection_count(), 2);
    }

    #[test]
    fn closed_connections_are_pruned() {
        let hub = BroadcastHub::new();
        let game = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(4);
        hub.add_connection("gone", tx, Uuid::new_v4(), game, ConnectionRole::Scorer);
        drop(rx);

        assert_eq!(hub.broadcast(game, event("score_update")), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn counts_follow_role_tags_and_removals() {
        let hub = BroadcastHub::new();
        let game = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(4);
        hub.add_connection("v1", tx.clone(), Uuid::new_v4(), game, ConnectionRole::Viewer);
        hub.add_connection("v2", tx.clone(), Uuid::new_v4(), game, ConnectionRole::Viewer);
        hub.add_connection("s1", tx.clone(), Uuid::new_v4(), game, ConnectionRole::Scorer);
        // same client id registers once
        hub.add_connection("s1", tx, Uuid::new_v4(), game, ConnectionRole::Scorer);

        assert_eq!(hub.viewer_count(game), 2);
        assert_eq!(hub.scorer_count(game), 1);

        assert!(hub.remove_connection("v1"));
        assert!(!hub.remove_connection("v1"));
        assert_eq!(hub.viewer_count(game), 1);
        assert_eq!(hub.viewer_count(Uuid::new_v4()), 0);
    }
}
