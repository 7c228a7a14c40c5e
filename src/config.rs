//! Application-level configuration loading, including the seed roster and game schedule.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::UserSeed,
    dao::models::{GameRecord, GameStatus},
    state::MAX_TICKET_TTL,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BALLPARK_LIVE_CONFIG_PATH";

const DEFAULT_TICKET_TTL: Duration = Duration::from_secs(60);
const DEFAULT_TICKET_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECTION_BUFFER: usize = 32;
const MIN_TICKET_TTL: Duration = Duration::from_secs(1);
const MIN_MUTATION_TIMEOUT: Duration = Duration::from_secs(1);

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Lifetime of a subscription ticket.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ticket_ttl: Duration,
    /// How often expired tickets are purged.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ticket_sweep_interval: Duration,
    /// Interval between SSE keep-alive comments.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub keep_alive_interval: Duration,
    /// Upper bound for a single lifecycle mutation, persistence included.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub mutation_timeout: Duration,
    /// Events buffered per SSE connection before deliveries to it are dropped.
    pub connection_buffer: usize,
    /// Users known to the built-in identity provider.
    pub users: Vec<UserSeed>,
    /// Games known to the built-in game directory.
    pub games: Vec<GameSeed>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        users = config.users.len(),
                        games = config.games.len(),
                        "loaded configuration"
                    );
                    config.normalized()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Clamp durations that would make tickets or mutations unusable.
    fn normalized(mut self) -> Self {
        let ticket_ttl = self.ticket_ttl.clamp(MIN_TICKET_TTL, MAX_TICKET_TTL);
        if ticket_ttl != self.ticket_ttl {
            warn!(
                configured = ?self.ticket_ttl,
                applied = ?ticket_ttl,
                "ticket_ttl out of range; clamped"
            );
            self.ticket_ttl = ticket_ttl;
        }
        if self.mutation_timeout < MIN_MUTATION_TIMEOUT {
            warn!(
                configured = ?self.mutation_timeout,
                applied = ?MIN_MUTATION_TIMEOUT,
                "mutation_timeout too small; raised"
            );
            self.mutation_timeout = MIN_MUTATION_TIMEOUT;
        }
        self
    }

    /// Seed games converted to directory records.
    pub fn game_records(&self) -> Vec<GameRecord> {
        self.games.iter().cloned().map(Into::into).collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticket_ttl: DEFAULT_TICKET_TTL,
            ticket_sweep_interval: DEFAULT_TICKET_SWEEP_INTERVAL,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            users: Vec::new(),
            games: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// JSON representation of a game served by the built-in directory.
pub struct GameSeed {
    id: Uuid,
    account_id: Uuid,
    home_team_id: Uuid,
    visitor_team_id: Uuid,
    home_team_name: String,
    visitor_team_name: String,
    #[serde(default)]
    is_final: bool,
}

impl From<GameSeed> for GameRecord {
    fn from(value: GameSeed) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            home_team_id: value.home_team_id,
            visitor_team_id: value.visitor_team_id,
            home_team_name: value.home_team_name,
            visitor_team_name: value.visitor_team_name,
            status: if value.is_final {
                GameStatus::Final
            } else {
                GameStatus::Scheduled
            },
            home_score: None,
            visitor_score: None,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"ticket_ttl": 90}"#).unwrap();
        assert_eq!(config.ticket_ttl, Duration::from_secs(90));
        assert_eq!(config.keep_alive_interval, DEFAULT_KEEP_ALIVE_INTERVAL);
        assert_eq!(config.connection_buffer, DEFAULT_CONNECTION_BUFFER);
        assert!(config.users.is_empty());
    }

    #[test]
    fn unusable_durations_are_clamped() {
        let config: AppConfig =
            serde_json::from_str(r#"{"ticket_ttl": 18446744073709551615, "mutation_timeout": 0}"#)
                .unwrap();
        let config = config.normalized();
        assert_eq!(config.ticket_ttl, MAX_TICKET_TTL);
        assert_eq!(config.mutation_timeout, MIN_MUTATION_TIMEOUT);

        let config: AppConfig = serde_json::from_str(r#"{"ticket_ttl": 0}"#).unwrap();
        assert_eq!(config.normalized().ticket_ttl, MIN_TICKET_TTL);
        assert_eq!(AppConfig::default().normalized().ticket_ttl, DEFAULT_TICKET_TTL);
    }

    #[test]
    fn seeds_are_parsed_into_records() {
        let raw = r#"{
            "users": [{
                "id": "6f1c1d0e-2d4b-4c1a-9d53-0c8f3b0f4a11",
                "display_name": "Pat",
                "token": "pat-token",
                "account_id": "0b7e0a5c-7f5b-4a44-8f4e-5d0f2f8c1e22",
                "manage_games": true
            }],
            "games": [{
                "id": "a3d0e7c2-1b2c-4d5e-8f90-123456789abc",
                "account_id": "0b7e0a5c-7f5b-4a44-8f4e-5d0f2f8c1e22",
                "home_team_id": "11111111-2222-4333-8444-555555555555",
                "visitor_team_id": "66666666-7777-4888-9999-aaaaaaaaaaaa",
                "home_team_name": "Herons",
                "visitor_team_name": "Otters"
            }]
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();

        assert!(config.users[0].manage_games);
        assert!(config.users[0].team_admin_of.is_empty());
        let games = config.game_records();
        assert_eq!(games[0].status, GameStatus::Scheduled);
        assert_eq!(games[0].home_team_name, "Herons");
    }
}
