pub mod memory;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{InningScoreEntity, SessionEntity, SessionStatus},
    storage::StorageResult,
};

pub use self::memory::InMemorySessionStore;

/// Abstraction over the persistence layer for live sessions and their inning rows.
///
/// Uniqueness of the active session per game is enforced by callers, not by the backend.
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created session row.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Find the session currently marked active for `game_id`.
    fn find_active_session(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Every session row recorded for `game_id`, regardless of status.
    fn list_sessions_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    /// Delete a session row together with its inning rows. Returns whether a row existed.
    fn delete_session(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Overwrite the current inning of a session.
    fn update_current_inning(
        &self,
        session_id: Uuid,
        inning: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite the status of a session, stamping `ended_at` for terminal statuses.
    fn update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Insert or overwrite the row keyed by (session, inning, side) and return the stored row.
    fn upsert_inning_score(
        &self,
        score: InningScoreEntity,
    ) -> BoxFuture<'static, StorageResult<InningScoreEntity>>;
    /// Inning rows of a session ordered by inning, visitors before home.
    fn list_inning_scores(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InningScoreEntity>>>;
    /// Active sessions whose game belongs to `account_id`.
    fn list_active_sessions(
        &self,
        account_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    /// Move every active session to `status`, returning how many rows changed.
    fn close_active_sessions(
        &self,
        status: SessionStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Cheap round trip proving the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Ordering shared by every backend when listing inning rows.
pub(crate) fn inning_order(score: &InningScoreEntity) -> (u32, bool) {
    score.key()
}
