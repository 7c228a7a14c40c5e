mod hub;
/// Transition rules of the live session lifecycle.
pub mod session_machine;
mod tickets;

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::{sync::Mutex, time::timeout};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{IdentityProvider, PermissionGate, StaticRoster},
    config::AppConfig,
    dao::{
        game_directory::{GameDirectory, StaticGameDirectory},
        session_store::{InMemorySessionStore, SessionStore},
    },
    error::ServiceError,
};

pub use self::hub::{BroadcastHub, ConnectionRole};
pub use self::session_machine::{InvalidTransition, SessionEvent, next_status};
pub use self::tickets::{IssuedTicket, MAX_TICKET_TTL, TicketGrant, TicketManager, TicketRejection};

/// Shared, cheaply clonable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Persistence and collaborator handles the application is wired with.
#[derive(Clone)]
pub struct Backends {
    /// Session and inning persistence.
    pub sessions: Arc<dyn SessionStore>,
    /// External game schedule.
    pub games: Arc<dyn GameDirectory>,
    /// Bearer token and display name resolution.
    pub identities: Arc<dyn IdentityProvider>,
    /// Per-account and per-team authorization.
    pub permissions: Arc<dyn PermissionGate>,
}

impl Backends {
    /// In-memory backends seeded from the configuration's users and games.
    pub fn in_memory(config: &AppConfig) -> Self {
        let roster = Arc::new(StaticRoster::new(config.users.clone()));
        Self {
            sessions: Arc::new(InMemorySessionStore::new()),
            games: Arc::new(StaticGameDirectory::new(config.game_records())),
            identities: roster.clone(),
            permissions: roster,
        }
    }
}

/// Central application state: collaborator handles plus the process-local registries.
pub struct AppState {
    config: AppConfig,
    backends: Backends,
    hub: BroadcastHub,
    tickets: TicketManager,
    game_gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, backends: Backends) -> SharedState {
        let tickets = TicketManager::new(config.ticket_ttl);
        Arc::new(Self {
            config,
            backends,
            hub: BroadcastHub::new(),
            tickets,
            game_gates: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session and inning persistence.
    pub fn sessions(&self) -> &dyn SessionStore {
        self.backends.sessions.as_ref()
    }

    /// External game schedule.
    pub fn games(&self) -> &dyn GameDirectory {
        self.backends.games.as_ref()
    }

    /// Identity provider used for bearer tokens and display names.
    pub fn identities(&self) -> &dyn IdentityProvider {
        self.backends.identities.as_ref()
    }

    /// Permission gate used for scoring rights.
    pub fn permissions(&self) -> &dyn PermissionGate {
        self.backends.permissions.as_ref()
    }

    /// Registry of open SSE connections.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Table of subscription tickets.
    pub fn tickets(&self) -> &TicketManager {
        &self.tickets
    }

    /// Run a lifecycle mutation for `game_id` while holding that game's gate.
    ///
    /// Mutations of one game execute one at a time; mutations of different games run
    /// concurrently. The work is bounded by the configured mutation timeout.
    pub async fn run_exclusive<F, Fut, T>(&self, game_id: Uuid, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self
            .game_gates
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let outcome = {
            let _guard = gate.lock().await;
            match timeout(self.config.mutation_timeout, work()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%game_id, "live session mutation timed out");
                    Err(ServiceError::Timeout)
                }
            }
        };

        drop(gate);
        // Only the map still holds the gate when nobody else is waiting on it.
        self.game_gates
            .remove_if(&game_id, |_, gate| Arc::strong_count(gate) == 1);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn state_with_timeout(limit: Duration) -> SharedState {
        let config = AppConfig {
            mutation_timeout: limit,
            ..AppConfig::default()
        };
        let backends = Backends::in_memory(&config);
        AppState::new(config, backends)
    }

    #[tokio::test]
    async fn mutations_of_one_game_do_not_interleave() {
        let state = state_with_timeout(Duration::from_secs(5));
        let game = Uuid::new_v4();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let run = |label: &'static str| {
            let state = state.clone();
            let log = log.clone();
            async move {
                state
                    .run_exclusive(game, move || async move {
                        log.lock().unwrap().push(format!("{label}-begin"));
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        log.lock().unwrap().push(format!("{label}-end"));
                        Ok::<_, ServiceError>(())
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(run("a"), run("b"));
        a.unwrap();
        b.unwrap();

        let log = log.lock().unwrap().clone();
        assert_eq!(log.len(), 4);
        assert!(log[0].ends_with("begin") && log[1].ends_with("end"));
        assert_eq!(log[0].split('-').next(), log[1].split('-').next());
        assert!(state.game_gates.is_empty());
    }

    #[tokio::test]
    async fn slow_mutation_times_out() {
        let state = state_with_timeout(Duration::from_millis(10));
        let result = state
            .run_exclusive(Uuid::new_v4(), || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }
}
