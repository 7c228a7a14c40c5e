use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{self, Principal},
    dto::{live::TicketResponse, sse::ServerEvent},
    error::ServiceError,
    services::{live_service, sse_events},
    state::{ConnectionRole, SharedState},
};

/// Events a connection can hold before the initial `connected` and snapshot messages.
const MIN_CONNECTION_BUFFER: usize = 2;
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// A registered push connection whose events have not been attached to a response yet.
pub struct Subscription {
    /// Identifier under which the hub tracks the connection.
    pub client_id: String,
    /// Role granted at connect time.
    pub role: ConnectionRole,
    /// Events queued for the connection, starting with `connected`.
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Mint a subscription ticket for `game_id` on behalf of an authenticated user.
pub async fn issue_ticket(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
) -> Result<TicketResponse, ServiceError> {
    live_service::require_game(state, account_id, game_id).await?;

    let issued = state
        .tickets()
        .create_ticket(principal.user_id, game_id, account_id);
    debug!(%game_id, user_id = %principal.user_id, "subscription ticket issued");

    Ok(TicketResponse {
        ticket: issued.ticket,
        expires_in: issued.expires_in.as_secs(),
    })
}

/// Validate `ticket`, register a connection for `game_id` and queue its opening events.
///
/// The opening events are `connected` followed by either a `state` snapshot or `no_session`.
/// Nothing broadcast earlier is replayed.
pub async fn open_subscription(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    ticket: Option<&str>,
) -> Result<Subscription, ServiceError> {
    let Some(ticket) = ticket.filter(|ticket| !ticket.is_empty()) else {
        return Err(ServiceError::Unauthorized("missing subscription ticket".into()));
    };
    let grant = state
        .tickets()
        .validate_ticket(ticket, game_id, account_id)
        .inspect_err(|reason| warn!(%game_id, %reason, "subscription ticket rejected"))?;

    let game = live_service::require_game(state, account_id, game_id).await?;
    let role = if auth::can_score(state.permissions(), grant.user_id, &game).await? {
        ConnectionRole::Scorer
    } else {
        ConnectionRole::Viewer
    };

    let client_id = Uuid::new_v4().simple().to_string();
    let (sender, events) =
        mpsc::channel(state.config().connection_buffer.max(MIN_CONNECTION_BUFFER));

    queue(&sender, sse_events::connected_event(&client_id, game_id, role));
    state
        .hub()
        .add_connection(client_id.clone(), sender.clone(), grant.user_id, game_id, role);

    let opening = match live_service::find_active(state, account_id, game_id).await {
        Ok(Some(session)) => live_service::build_snapshot(state, &session)
            .await
            .map(|snapshot| sse_events::state_event(&snapshot)),
        Ok(None) => Ok(sse_events::no_session_event(game_id)),
        Err(err) => Err(err),
    };
    let opening = match opening {
        Ok(event) => event,
        Err(err) => {
            state.hub().remove_connection(&client_id);
            return Err(err);
        }
    };
    queue(&sender, opening);

    info!(%client_id, %game_id, user_id = %grant.user_id, ?role, "SSE subscriber connected");
    Ok(Subscription {
        client_id,
        role,
        events,
    })
}

/// Attach a subscription to an SSE response.
///
/// A forwarder task moves events from the hub's channel onto the response and deregisters the
/// connection once the client goes away.
pub fn into_sse(
    state: SharedState,
    subscription: Subscription,
) -> Sse<KeepAliveStream<ReceiverStream<Result<Event, Infallible>>>> {
    let Subscription {
        client_id,
        mut events,
        ..
    } = subscription;
    let keep_alive = state.config().keep_alive_interval;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                next = events.recv() => {
                    let Some(message) = next else { break };
                    let event = Event::default().event(message.event).data(message.data);
                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
            }
        }

        state.hub().remove_connection(&client_id);
        info!(%client_id, "SSE subscriber disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(keep_alive)
            .text("keep-alive"),
    )
}

/// Periodically drop tickets that outlived their TTL.
pub fn spawn_ticket_sweeper(state: SharedState) -> JoinHandle<()> {
    let period = state.config().ticket_sweep_interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = state.tickets().purge_expired();
            if purged > 0 {
                debug!(purged, "purged expired subscription tickets");
            }
        }
    })
}

fn queue(sender: &mpsc::Sender<ServerEvent>, event: Option<ServerEvent>) {
    let Some(event) = event else { return };
    if let Err(err) = sender.try_send(event) {
        warn!(error = %err, "failed to queue opening SSE event");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::{StaticRoster, UserSeed},
        config::AppConfig,
        dao::{
            game_directory::StaticGameDirectory,
            models::{GameRecord, GameStatus},
            session_store::InMemorySessionStore,
        },
        state::{AppState, Backends},
    };

    struct Fixture {
        state: SharedState,
        account: Uuid,
        game: Uuid,
        manager: Principal,
        fan: Principal,
    }

    fn fixture() -> Fixture {
        let account = Uuid::new_v4();
        let game = Uuid::new_v4();
        let manager = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Morgan".into(),
        };
        let fan = Principal {
            user_id: Uuid::new_v4(),
            display_name: "Fan".into(),
        };
        let roster = Arc::new(StaticRoster::new([
            UserSeed {
                id: manager.user_id,
                display_name: manager.display_name.clone(),
                token: "manager".into(),
                account_id: account,
                manage_games: true,
                team_admin_of: Vec::new(),
            },
            UserSeed {
                id: fan.user_id,
                display_name: fan.display_name.clone(),
                token: "fan".into(),
                account_id: account,
                manage_games: false,
                team_admin_of: Vec::new(),
            },
        ]));
        let games = Arc::new(StaticGameDirectory::new([GameRecord {
            id: game,
            account_id: account,
            home_team_id: Uuid::new_v4(),
            visitor_team_id: Uuid::new_v4(),
            home_team_name: "Herons".into(),
            visitor_team_name: "Otters".into(),
            status: GameStatus::Scheduled,
            home_score: None,
            visitor_score: None,
        }]));
        let state = AppState::new(
            AppConfig::default(),
            Backends {
                sessions: Arc::new(InMemorySessionStore::new()),
                games,
                identities: roster.clone(),
                permissions: roster,
            },
        );
        Fixture {
            state,
            account,
            game,
            manager,
            fan,
        }
    }

    #[tokio::test]
    async fn missing_or_unknown_ticket_is_unauthorized() {
        let f = fixture();
        let err = open_subscription(&f.state, f.account, f.game, None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = open_subscription(&f.state, f.account, f.game, Some("nope"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(f.state.hub().connection_count(), 0);
    }

    #[tokio::test]
    async fn ticket_for_unknown_game_is_not_issued() {
        let f = fixture();
        let err = issue_ticket(&f.state, f.account, Uuid::new_v4(), &f.fan)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn idle_game_greets_with_no_session() {
        let f = fixture();
        let ticket = issue_ticket(&f.state, f.account, f.game, &f.fan)
            .await
            .unwrap();
        assert_eq!(ticket.ticket.len(), 48);

        let mut sub = open_subscription(&f.state, f.account, f.game, Some(ticket.ticket.as_str()))
            .await
            .unwrap();
        assert_eq!(sub.role, ConnectionRole::Viewer);
        assert_eq!(sub.events.try_recv().unwrap().event, "connected");
        assert_eq!(sub.events.try_recv().unwrap().event, "no_session");
        assert!(sub.events.try_recv().is_err());
        assert_eq!(f.state.hub().viewer_count(f.game), 1);
    }

    #[tokio::test]
    async fn scorers_get_a_state_snapshot() {
        let f = fixture();
        live_service::start_session(&f.state, f.account, f.game, &f.manager)
            .await
            .unwrap();
        let ticket = issue_ticket(&f.state, f.account, f.game, &f.manager)
            .await
            .unwrap();

        let mut sub = open_subscription(&f.state, f.account, f.game, Some(ticket.ticket.as_str()))
            .await
            .unwrap();
        assert_eq!(sub.role, ConnectionRole::Scorer);
        assert_eq!(sub.events.try_recv().unwrap().event, "connected");
        let snapshot = sub.events.try_recv().unwrap();
        assert_eq!(snapshot.event, "state");
        let data: serde_json::Value = serde_json::from_str(&snapshot.data).unwrap();
        assert_eq!(data["status"], "ACTIVE");
        assert_eq!(data["currentInning"], 1);
        assert_eq!(data["scorerCount"], 1);
    }

    #[tokio::test]
    async fn ticket_is_bound_to_its_game() {
        let f = fixture();
        let ticket = issue_ticket(&f.state, f.account, f.game, &f.fan)
            .await
            .unwrap();
        let err = open_subscription(&f.state, f.account, Uuid::new_v4(), Some(ticket.ticket.as_str()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Unauthorized(message) if message.contains("game-mismatch")));
    }

    #[tokio::test]
    async fn ticket_is_bound_to_its_account() {
        let f = fixture();
        let ticket = issue_ticket(&f.state, f.account, f.game, &f.fan)
            .await
            .unwrap();
        let err = open_subscription(&f.state, Uuid::new_v4(), f.game, Some(ticket.ticket.as_str()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Unauthorized(message) if message.contains("account-mismatch")));
        assert_eq!(f.state.hub().connection_count(), 0);
    }
}
