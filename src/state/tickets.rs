use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;
use uuid::Uuid;

const TICKET_LENGTH: usize = 48;
/// Longest lifetime a ticket can be issued with.
pub const MAX_TICKET_TTL: Duration = Duration::from_secs(60 * 60);

/// Short-lived credential authorising one SSE subscription to one game.
#[derive(Debug, Clone)]
struct Ticket {
    user_id: Uuid,
    game_id: Uuid,
    account_id: Uuid,
    expires_at: Instant,
}

/// Ticket handed back to the caller.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    /// Opaque token to pass as the `ticket` query value.
    pub ticket: String,
    /// Time left before the token stops being accepted.
    pub expires_in: Duration,
}

/// Identity carried by a ticket that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketGrant {
    /// User the ticket was minted for.
    pub user_id: Uuid,
}

/// Why a ticket was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TicketRejection {
    /// No ticket with that token exists.
    #[error("unknown")]
    Unknown,
    /// The ticket outlived its TTL.
    #[error("expired")]
    Expired,
    /// The ticket was minted for another game.
    #[error("game-mismatch")]
    GameMismatch,
    /// The ticket was minted under another account.
    #[error("account-mismatch")]
    AccountMismatch,
}

/// In-memory table of subscription tickets.
pub struct TicketManager {
    tickets: DashMap<String, Ticket>,
    ttl: Duration,
}

impl TicketManager {
    /// Create a manager issuing tickets valid for `ttl`, capped at [`MAX_TICKET_TTL`].
    pub fn new(ttl: Duration) -> Self {
        Self {
            tickets: DashMap::new(),
            ttl: ttl.min(MAX_TICKET_TTL),
        }
    }

    /// Mint a ticket bound to `game_id` for `user_id`.
    pub fn create_ticket(&self, user_id: Uuid, game_id: Uuid, account_id: Uuid) -> IssuedTicket {
        let token = generate_token();
        self.tickets.insert(
            token.clone(),
            Ticket {
                user_id,
                game_id,
                account_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        IssuedTicket {
            ticket: token,
            expires_in: self.ttl,
        }
    }

    /// Check that `token` exists, is still valid, and was minted for `game_id` of `account_id`.
    pub fn validate_ticket(
        &self,
        token: &str,
        game_id: Uuid,
        account_id: Uuid,
    ) -> Result<TicketGrant, TicketRejection> {
        self.validate_at(token, game_id, account_id, Instant::now())
    }

    fn validate_at(
        &self,
        token: &str,
        game_id: Uuid,
        account_id: Uuid,
        now: Instant,
    ) -> Result<TicketGrant, TicketRejection> {
        let ticket = self
            .tickets
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(TicketRejection::Unknown)?;

        if now >= ticket.expires_at {
            self.tickets.remove(token);
            return Err(TicketRejection::Expired);
        }

        if ticket.game_id != game_id {
            return Err(TicketRejection::GameMismatch);
        }
        if ticket.account_id != account_id {
            return Err(TicketRejection::AccountMismatch);
        }

        Ok(TicketGrant {
            user_id: ticket.user_id,
        })
    }

    /// Drop every expired ticket, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.tickets.len();
        self.tickets.retain(|_, ticket| ticket.expires_at > now);
        before.saturating_sub(self.tickets.len())
    }

    /// Number of tickets currently held.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether no ticket is currently held.
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TICKET_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ticket_validates_for_its_game() {
        let manager = TicketManager::new(Duration::from_secs(60));
        let (user, game, account) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let issued = manager.create_ticket(user, game, account);

        assert_eq!(issued.ticket.len(), TICKET_LENGTH);
        assert_eq!(issued.expires_in, Duration::from_secs(60));
        assert_eq!(
            manager.validate_ticket(&issued.ticket, game, account),
            Ok(TicketGrant { user_id: user })
        );
        // validation does not consume the ticket
        assert!(manager.validate_ticket(&issued.ticket, game, account).is_ok());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let manager = TicketManager::new(Duration::from_secs(60));
        assert_eq!(
            manager.validate_ticket("not-a-ticket", Uuid::new_v4(), Uuid::new_v4()),
            Err(TicketRejection::Unknown)
        );
    }

    #[test]
    fn ticket_for_another_game_is_rejected() {
        let manager = TicketManager::new(Duration::from_secs(60));
        let account = Uuid::new_v4();
        let issued = manager.create_ticket(Uuid::new_v4(), Uuid::new_v4(), account);

        let err = manager
            .validate_ticket(&issued.ticket, Uuid::new_v4(), account)
            .unwrap_err();
        assert_eq!(err, TicketRejection::GameMismatch);
        assert_eq!(err.to_string(), "game-mismatch");
    }

    #[test]
    fn ticket_for_another_account_is_rejected() {
        let manager = TicketManager::new(Duration::from_secs(60));
        let game = Uuid::new_v4();
        let issued = manager.create_ticket(Uuid::new_v4(), game, Uuid::new_v4());

        let err = manager
            .validate_ticket(&issued.ticket, game, Uuid::new_v4())
            .unwrap_err();
        assert_eq!(err, TicketRejection::AccountMismatch);
        assert_eq!(err.to_string(), "account-mismatch");
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let manager = TicketManager::new(Duration::MAX);
        let game = Uuid::new_v4();
        let account = Uuid::new_v4();
        let issued = manager.create_ticket(Uuid::new_v4(), game, account);

        assert_eq!(issued.expires_in, MAX_TICKET_TTL);
        assert!(manager.validate_ticket(&issued.ticket, game, account).is_ok());
    }

    #[test]
    fn ticket_past_its_ttl_is_expired_and_dropped() {
        let manager = TicketManager::new(Duration::from_secs(30));
        let (game, account) = (Uuid::new_v4(), Uuid::new_v4());
        let issued = manager.create_ticket(Uuid::new_v4(), game, account);
        let later = Instant::now() + Duration::from_secs(31);

        let err = manager
            .validate_at(&issued.ticket, game, account, later)
            .unwrap_err();
        assert_eq!(err, TicketRejection::Expired);
        assert_eq!(err.to_string(), "expired");
        assert_eq!(
            manager.validate_ticket(&issued.ticket, game, account),
            Err(TicketRejection::Unknown)
        );
    }

    #[test]
    fn expiry_is_checked_before_game_binding() {
        let manager = TicketManager::new(Duration::from_secs(1));
        let issued = manager.create_ticket(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let later = Instant::now() + Duration::from_secs(5);

        assert_eq!(
            manager.validate_at(&issued.ticket, Uuid::new_v4(), Uuid::new_v4(), later),
            Err(TicketRejection::Expired)
        );
    }

    #[test]
    fn purge_removes_only_expired_tickets() {
        let manager = TicketManager::new(Duration::from_secs(10));
        manager.create_ticket(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        manager.create_ticket(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(manager.purge_expired(), 0);
        assert_eq!(manager.len(), 2);
        assert_eq!(
            manager.purge_expired_at(Instant::now() + Duration::from_secs(11)),
            2
        );
        assert!(manager.is_empty());
    }
}
