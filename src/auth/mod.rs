//! Identity and permission collaborators consumed by the live-scoring routes.

mod roster;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{models::GameRecord, storage::StorageResult};

pub use self::roster::{StaticRoster, UserSeed};

/// Authenticated caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Identifier of the user.
    pub user_id: Uuid,
    /// Name shown to viewers for entries made by this user.
    pub display_name: String,
}

/// Account-wide permissions evaluated by the [`PermissionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountPermission {
    /// Create, edit and score any game of the account.
    ManageGames,
}

/// Resolves bearer tokens and user display names.
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it was issued to.
    fn authenticate(&self, token: &str) -> BoxFuture<'static, StorageResult<Option<Principal>>>;
    /// Name to display for `user_id`, if the user is known.
    fn display_name(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Option<String>>>;
}

/// Per-account and per-team authorization checks.
pub trait PermissionGate: Send + Sync {
    /// Whether the user holds `permission` on the whole account.
    fn has_account_permission(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        permission: AccountPermission,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Whether the user administers `team_id`.
    fn is_team_admin(&self, user_id: Uuid, team_id: Uuid)
    -> BoxFuture<'static, StorageResult<bool>>;
}

/// Whether `user_id` may score `game`: account-wide game managers, or admins of either team
/// playing in that game.
pub async fn can_score(
    gate: &dyn PermissionGate,
    user_id: Uuid,
    game: &GameRecord,
) -> StorageResult<bool> {
    if gate
        .has_account_permission(user_id, game.account_id, AccountPermission::ManageGames)
        .await?
    {
        return Ok(true);
    }

    for team_id in [game.home_team_id, game.visitor_team_id] {
        if gate.is_team_admin(user_id, team_id).await? {
            return Ok(true);
        }
    }

    Ok(false)
}
