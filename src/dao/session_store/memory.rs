//! Process-local session store used when no database is configured, and by tests.

use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionStore, inning_order};
use crate::dao::{
    models::{InningScoreEntity, SessionEntity, SessionStatus},
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Tables {
    sessions: IndexMap<Uuid, SessionEntity>,
    innings: IndexMap<(Uuid, u32, bool), InningScoreEntity>,
}

/// [`SessionStore`] keeping every row in memory behind a single lock.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_session(&self, session: SessionEntity) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_active_session(&self, game_id: Uuid) -> StorageResult<Option<SessionEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|session| session.game_id == game_id && session.status == SessionStatus::Active)
            .cloned())
    }

    async fn list_sessions_for_game(&self, game_id: Uuid) -> StorageResult<Vec<SessionEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|session| session.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn delete_session(&self, session_id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        let existed = tables.sessions.shift_remove(&session_id).is_some();
        tables
            .innings
            .retain(|(owner, _, _), _| *owner != session_id);
        Ok(existed)
    }

    async fn update_current_inning(&self, session_id: Uuid, inning: u32) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| missing_session(session_id))?;
        session.current_inning = inning;
        Ok(())
    }

    async fn update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        ended_at: Option<SystemTime>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| missing_session(session_id))?;
        session.status = status;
        session.ended_at = ended_at;
        Ok(())
    }

    async fn upsert_inning_score(
        &self,
        score: InningScoreEntity,
    ) -> StorageResult<InningScoreEntity> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&score.session_id) {
            return Err(missing_session(score.session_id));
        }
        let key = (score.session_id, score.inning_number, score.is_home_team);
        tables.innings.insert(key, score.clone());
        Ok(score)
    }

    async fn list_inning_scores(&self, session_id: Uuid) -> StorageResult<Vec<InningScoreEntity>> {
        let tables = self.tables.read().await;
        let mut scores: Vec<_> = tables
            .innings
            .values()
            .filter(|score| score.session_id == session_id)
            .cloned()
            .collect();
        scores.sort_by_key(inning_order);
        Ok(scores)
    }

    async fn list_active_sessions(&self, account_id: Uuid) -> StorageResult<Vec<SessionEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|session| {
                session.account_id == account_id && session.status == SessionStatus::Active
            })
            .cloned()
            .collect())
    }

    async fn close_active_sessions(
        &self,
        status: SessionStatus,
        at: SystemTime,
    ) -> StorageResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for session in tables.sessions.values_mut() {
            if session.status == SessionStatus::Active {
                session.status = status;
                session.ended_at = Some(at);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn missing_session(session_id: Uuid) -> StorageError {
    StorageError::InvalidRecord(format!("session `{session_id}` does not exist"))
}

impl SessionStore for InMemorySessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await })
    }

    fn find_active_session(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_active_session(game_id).await })
    }

    fn list_sessions_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_sessions_for_game(game_id).await })
    }

    fn delete_session(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(session_id).await })
    }

    fn update_current_inning(
        &self,
        session_id: Uuid,
        inning: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_current_inning(session_id, inning).await })
    }

    fn update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_status(session_id, status, ended_at).await })
    }

    fn upsert_inning_score(
        &self,
        score: InningScoreEntity,
    ) -> BoxFuture<'static, StorageResult<InningScoreEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_inning_score(score).await })
    }

    fn list_inning_scores(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InningScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_inning_scores(session_id).await })
    }

    fn list_active_sessions(
        &self,
        account_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_active_sessions(account_id).await })
    }

    fn close_active_sessions(
        &self,
        status: SessionStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.close_active_sessions(status, at).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(game_id: Uuid, account_id: Uuid) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            game_id,
            account_id,
            status: SessionStatus::Active,
            current_inning: 1,
            started_by: Uuid::new_v4(),
            started_at: SystemTime::now(),
            ended_at: None,
        }
    }

    fn score(session_id: Uuid, inning: u32, home: bool, runs: u32) -> InningScoreEntity {
        InningScoreEntity {
            session_id,
            inning_number: inning,
            is_home_team: home,
            runs,
            entered_by: Uuid::new_v4(),
            entered_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_same_half_inning() {
        let store = InMemorySessionStore::new();
        let row = session(Uuid::new_v4(), Uuid::new_v4());
        SessionStore::insert_session(&store, row.clone()).await.unwrap();

        SessionStore::upsert_inning_score(&store, score(row.id, 3, true, 4))
            .await
            .unwrap();
        SessionStore::upsert_inning_score(&store, score(row.id, 3, true, 1))
            .await
            .unwrap();

        let scores = SessionStore::list_inning_scores(&store, row.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].runs, 1);
    }

    #[tokio::test]
    async fn innings_are_listed_visitors_first() {
        let store = InMemorySessionStore::new();
        let row = session(Uuid::new_v4(), Uuid::new_v4());
        SessionStore::insert_session(&store, row.clone()).await.unwrap();

        for (inning, home) in [(2, true), (1, true), (2, false), (1, false)] {
            SessionStore::upsert_inning_score(&store, score(row.id, inning, home, 0))
                .await
                .unwrap();
        }

        let keys: Vec<_> = SessionStore::list_inning_scores(&store, row.id)
            .await
            .unwrap()
            .iter()
            .map(InningScoreEntity::key)
            .collect();
        assert_eq!(keys, vec![(1, false), (1, true), (2, false), (2, true)]);
    }

    #[tokio::test]
    async fn delete_session_drops_its_innings() {
        let store = InMemorySessionStore::new();
        let row = session(Uuid::new_v4(), Uuid::new_v4());
        SessionStore::insert_session(&store, row.clone()).await.unwrap();
        SessionStore::upsert_inning_score(&store, score(row.id, 1, false, 2))
            .await
            .unwrap();

        assert!(SessionStore::delete_session(&store, row.id).await.unwrap());
        assert!(!SessionStore::delete_session(&store, row.id).await.unwrap());
        assert!(
            SessionStore::list_inning_scores(&store, row.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn upsert_for_unknown_session_is_rejected() {
        let store = InMemorySessionStore::new();
        let err = SessionStore::upsert_inning_score(&store, score(Uuid::new_v4(), 1, true, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn closing_only_touches_active_rows() {
        let store = InMemorySessionStore::new();
        let account = Uuid::new_v4();
        let active = session(Uuid::new_v4(), account);
        let mut stopped = session(Uuid::new_v4(), account);
        stopped.status = SessionStatus::Stopped;
        SessionStore::insert_session(&store, active.clone()).await.unwrap();
        SessionStore::insert_session(&store, stopped.clone()).await.unwrap();

        let now = SystemTime::now();
        assert_eq!(
            SessionStore::close_active_sessions(&store, SessionStatus::Abandoned, now).await.unwrap(),
            1
        );
        assert_eq!(
            SessionStore::close_active_sessions(&store, SessionStatus::Abandoned, now).await.unwrap(),
            0
        );

        let rows = SessionStore::list_sessions_for_game(&store, stopped.game_id)
            .await
            .unwrap();
        assert_eq!(rows[0].status, SessionStatus::Stopped);
        assert!(
            SessionStore::list_active_sessions(&store, account)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
