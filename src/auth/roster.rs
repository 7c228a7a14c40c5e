use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Deserialize;
use uuid::Uuid;

use super::{AccountPermission, IdentityProvider, PermissionGate, Principal};
use crate::dao::storage::StorageResult;

/// User entry of the configuration-provided roster.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    /// Identifier of the user.
    pub id: Uuid,
    /// Name shown to viewers.
    pub display_name: String,
    /// Bearer token accepted for this user.
    pub token: String,
    /// Account the user belongs to.
    pub account_id: Uuid,
    /// Whether the user may manage every game of the account.
    #[serde(default)]
    pub manage_games: bool,
    /// Teams the user administers.
    #[serde(default)]
    pub team_admin_of: Vec<Uuid>,
}

/// Identity provider and permission gate backed by a fixed list of users.
#[derive(Clone, Default)]
pub struct StaticRoster {
    users: Arc<DashMap<Uuid, UserSeed>>,
    tokens: Arc<DashMap<String, Uuid>>,
}

impl StaticRoster {
    /// Index the provided users by id and by token.
    pub fn new(users: impl IntoIterator<Item = UserSeed>) -> Self {
        let roster = Self::default();
        for user in users {
            roster.tokens.insert(user.token.clone(), user.id);
            roster.users.insert(user.id, user);
        }
        roster
    }

    fn lookup<T>(&self, user_id: Uuid, read: impl FnOnce(&UserSeed) -> T) -> Option<T> {
        self.users.get(&user_id).map(|entry| read(entry.value()))
    }
}

impl IdentityProvider for StaticRoster {
    fn authenticate(&self, token: &str) -> BoxFuture<'static, StorageResult<Option<Principal>>> {
        let principal = self
            .tokens
            .get(token)
            .map(|entry| *entry.value())
            .and_then(|user_id| {
                self.lookup(user_id, |user| Principal {
                    user_id: user.id,
                    display_name: user.display_name.clone(),
                })
            });
        Box::pin(async move { Ok(principal) })
    }

    fn display_name(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let name = self.lookup(user_id, |user| user.display_name.clone());
        Box::pin(async move { Ok(name) })
    }
}

impl PermissionGate for StaticRoster {
    fn has_account_permission(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        permission: AccountPermission,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let granted = self
            .lookup(user_id, |user| match permission {
                AccountPermission::ManageGames => user.account_id == account_id && user.manage_games,
            })
            .unwrap_or(false);
        Box::pin(async move { Ok(granted) })
    }

    fn is_team_admin(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let admin = self
            .lookup(user_id, |user| user.team_admin_of.contains(&team_id))
            .unwrap_or(false);
        Box::pin(async move { Ok(admin) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::can_score,
        dao::models::{GameRecord, GameStatus},
    };

    fn game(account_id: Uuid) -> GameRecord {
        GameRecord {
            id: Uuid::new_v4(),
            account_id,
            home_team_id: Uuid::new_v4(),
            visitor_team_id: Uuid::new_v4(),
            home_team_name: "Herons".into(),
            visitor_team_name: "Otters".into(),
            status: GameStatus::Scheduled,
            home_score: None,
            visitor_score: None,
        }
    }

    fn user(account_id: Uuid, manage_games: bool, team_admin_of: Vec<Uuid>) -> UserSeed {
        UserSeed {
            id: Uuid::new_v4(),
            display_name: "Scorer".into(),
            token: Uuid::new_v4().simple().to_string(),
            account_id,
            manage_games,
            team_admin_of,
        }
    }

    #[tokio::test]
    async fn authenticate_resolves_known_tokens_only() {
        let account = Uuid::new_v4();
        let seed = user(account, false, vec![]);
        let roster = StaticRoster::new([seed.clone()]);

        let principal = roster.authenticate(&seed.token).await.unwrap().unwrap();
        assert_eq!(principal.user_id, seed.id);
        assert_eq!(principal.display_name, seed.display_name);
        assert!(roster.authenticate("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn game_managers_of_the_account_can_score() {
        let account = Uuid::new_v4();
        let manager = user(account, true, vec![]);
        let roster = StaticRoster::new([manager.clone()]);

        assert!(can_score(&roster, manager.id, &game(account)).await.unwrap());
        assert!(
            !can_score(&roster, manager.id, &game(Uuid::new_v4()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn team_admins_only_score_their_own_games() {
        let account = Uuid::new_v4();
        let scheduled = game(account);
        let visitor_admin = user(account, false, vec![scheduled.visitor_team_id]);
        let outsider = user(account, false, vec![Uuid::new_v4()]);
        let roster = StaticRoster::new([visitor_admin.clone(), outsider.clone()]);

        assert!(can_score(&roster, visitor_admin.id, &scheduled).await.unwrap());
        assert!(!can_score(&roster, outsider.id, &scheduled).await.unwrap());
        assert!(!can_score(&roster, Uuid::new_v4(), &scheduled).await.unwrap());
    }
}
