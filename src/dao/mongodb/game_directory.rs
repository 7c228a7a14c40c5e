use futures::future::BoxFuture;
use mongodb::{Collection, bson::doc};
use uuid::Uuid;

use super::{
    connection::MongoHandle,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, doc_id},
};
use crate::dao::{
    game_directory::GameDirectory,
    models::{GameRecord, GameStatus},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";

/// [`GameDirectory`] reading the schedule owner's `games` collection.
#[derive(Clone)]
pub struct MongoGameDirectory {
    handle: MongoHandle,
}

impl MongoGameDirectory {
    /// Wrap a connected handle.
    pub fn new(handle: MongoHandle) -> Self {
        Self { handle }
    }

    fn collection(&self) -> Collection<MongoGameDocument> {
        self.handle.collection(GAME_COLLECTION_NAME)
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameRecord>> {
        let document = self
            .collection()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn record_final_score(&self, id: Uuid, home: u32, visitor: u32) -> MongoResult<()> {
        let result = self
            .collection()
            .update_one(
                doc_id(id),
                doc! {"$set": {
                    "home_score": i64::from(home),
                    "visitor_score": i64::from(visitor),
                    "status": GameStatus::Final.as_str(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingGame { id });
        }
        Ok(())
    }
}

impl GameDirectory for MongoGameDirectory {
    fn find_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let directory = self.clone();
        Box::pin(async move { directory.find_game(game_id).await.map_err(Into::into) })
    }

    fn record_final_score(
        &self,
        game_id: Uuid,
        home_total: u32,
        visitor_total: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let directory = self.clone();
        Box::pin(async move {
            directory
                .record_final_score(game_id, home_total, visitor_total)
                .await
                .map_err(Into::into)
        })
    }
}
