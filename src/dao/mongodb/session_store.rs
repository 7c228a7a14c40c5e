use std::time::SystemTime;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use uuid::Uuid;

use super::{
    connection::MongoHandle,
    error::{MongoDaoError, MongoResult},
    models::{MongoInningDocument, MongoSessionDocument, doc_id, to_bson_uuid},
};
use crate::dao::{
    models::{InningScoreEntity, SessionEntity, SessionStatus},
    session_store::{SessionStore, inning_order},
    storage::StorageResult,
};

const SESSION_COLLECTION_NAME: &str = "live_sessions";
const INNING_COLLECTION_NAME: &str = "inning_scores";

/// [`SessionStore`] persisting sessions and inning rows in two MongoDB collections.
#[derive(Clone)]
pub struct MongoSessionStore {
    handle: MongoHandle,
}

impl MongoSessionStore {
    /// Wrap a connected handle and make sure the lookup indexes exist.
    pub async fn new(handle: MongoHandle) -> MongoResult<Self> {
        let store = Self { handle };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let session_index = IndexModel::builder()
            .keys(doc! {"game_id": 1, "status": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_game_status_idx".to_owned()))
                    .build(),
            )
            .build();
        self.sessions()
            .create_index(session_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "game_id,status",
                source,
            })?;

        let inning_index = IndexModel::builder()
            .keys(doc! {"session_id": 1, "inning_number": 1, "is_home_team": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("inning_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        self.innings()
            .create_index(inning_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: INNING_COLLECTION_NAME,
                index: "session_id,inning_number,is_home_team",
                source,
            })?;

        Ok(())
    }

    fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.handle.collection(SESSION_COLLECTION_NAME)
    }

    fn innings(&self) -> Collection<MongoInningDocument> {
        self.handle.collection(INNING_COLLECTION_NAME)
    }

    async fn insert_session(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoSessionDocument = session.into();
        self.sessions()
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        Ok(())
    }

    async fn find_active_session(&self, game_id: Uuid) -> MongoResult<Option<SessionEntity>> {
        let document = self
            .sessions()
            .find_one(doc! {
                "game_id": to_bson_uuid(game_id),
                "status": SessionStatus::Active.as_str(),
            })
            .await
            .map_err(|source| MongoDaoError::LoadSessions { game_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_sessions_for_game(&self, game_id: Uuid) -> MongoResult<Vec<SessionEntity>> {
        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .find(doc! {"game_id": to_bson_uuid(game_id)})
            .await
            .map_err(|source| MongoDaoError::LoadSessions { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadSessions { game_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_session(&self, id: Uuid) -> MongoResult<bool> {
        self.innings()
            .delete_many(doc! {"session_id": to_bson_uuid(id)})
            .await
            .map_err(|source| MongoDaoError::DeleteSession { id, source })?;
        let result = self
            .sessions()
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteSession { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn update_current_inning(&self, id: Uuid, inning: u32) -> MongoResult<()> {
        let result = self
            .sessions()
            .update_one(
                doc_id(id),
                doc! {"$set": {"current_inning": i64::from(inning)}},
            )
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingSession { id });
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        ended_at: Option<SystemTime>,
    ) -> MongoResult<()> {
        let ended_at = ended_at.map(DateTime::from_system_time);
        let result = self
            .sessions()
            .update_one(
                doc_id(id),
                doc! {"$set": {"status": status.as_str(), "ended_at": ended_at}},
            )
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingSession { id });
        }
        Ok(())
    }

    async fn upsert_inning_score(&self, score: InningScoreEntity) -> MongoResult<InningScoreEntity> {
        let session_id = score.session_id;
        let inning = score.inning_number;
        let document: MongoInningDocument = score.clone().into();
        self.innings()
            .replace_one(document.key_filter(), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveInning {
                session_id,
                inning,
                source,
            })?;
        Ok(score)
    }

    async fn list_inning_scores(&self, session_id: Uuid) -> MongoResult<Vec<InningScoreEntity>> {
        let documents: Vec<MongoInningDocument> = self
            .innings()
            .find(doc! {"session_id": to_bson_uuid(session_id)})
            .await
            .map_err(|source| MongoDaoError::LoadInnings { session_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadInnings { session_id, source })?;
        let mut scores: Vec<InningScoreEntity> = documents.into_iter().map(Into::into).collect();
        scores.sort_by_key(inning_order);
        Ok(scores)
    }

    async fn list_active_sessions(&self, account_id: Uuid) -> MongoResult<Vec<SessionEntity>> {
        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .find(doc! {
                "account_id": to_bson_uuid(account_id),
                "status": SessionStatus::Active.as_str(),
            })
            .await
            .map_err(|source| MongoDaoError::ListActiveSessions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListActiveSessions { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn close_active_sessions(
        &self,
        status: SessionStatus,
        at: SystemTime,
    ) -> MongoResult<u64> {
        let result = self
            .sessions()
            .update_many(
                doc! {"status": SessionStatus::Active.as_str()},
                doc! {"$set": {
                    "status": status.as_str(),
                    "ended_at": DateTime::from_system_time(at),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::CloseActiveSessions { source })?;
        Ok(result.modified_count)
    }
}

impl SessionStore for MongoSessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await.map_err(Into::into) })
    }

    fn find_active_session(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_active_session(game_id).await.map_err(Into::into) })
    }

    fn list_sessions_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_sessions_for_game(game_id)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_session(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(session_id).await.map_err(Into::into) })
    }

    fn update_current_inning(
        &self,
        session_id: Uuid,
        inning: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_current_inning(session_id, inning)
                .await
                .map_err(Into::into)
        })
    }

    fn update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_status(session_id, status, ended_at)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_inning_score(
        &self,
        score: InningScoreEntity,
    ) -> BoxFuture<'static, StorageResult<InningScoreEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_inning_score(score).await.map_err(Into::into) })
    }

    fn list_inning_scores(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InningScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_inning_scores(session_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_active_sessions(
        &self,
        account_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_active_sessions(account_id)
                .await
                .map_err(Into::into)
        })
    }

    fn close_active_sessions(
        &self,
        status: SessionStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .close_active_sessions(status, at)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.handle.ping().await.map_err(Into::into) })
    }
}
