use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use super::GameDirectory;
use crate::dao::{
    models::{GameRecord, GameStatus},
    storage::{StorageError, StorageResult},
};

/// Game directory seeded from configuration and kept in memory.
#[derive(Clone, Default)]
pub struct StaticGameDirectory {
    games: Arc<DashMap<Uuid, GameRecord>>,
}

impl StaticGameDirectory {
    /// Build a directory holding the provided games.
    pub fn new(games: impl IntoIterator<Item = GameRecord>) -> Self {
        let map = games.into_iter().map(|game| (game.id, game)).collect();
        Self {
            games: Arc::new(map),
        }
    }
}

impl GameDirectory for StaticGameDirectory {
    fn find_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let game = self.games.get(&game_id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(game) })
    }

    fn record_final_score(
        &self,
        game_id: Uuid,
        home_total: u32,
        visitor_total: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self.games.get_mut(&game_id) {
            Some(mut game) => {
                game.home_score = Some(home_total);
                game.visitor_score = Some(visitor_total);
                game.status = GameStatus::Final;
                Ok(())
            }
            None => Err(StorageError::InvalidRecord(format!(
                "game `{game_id}` does not exist"
            ))),
        };
        Box::pin(async move { result })
    }
}
