use thiserror::Error;

use crate::dao::models::SessionStatus;

/// Events that can be applied to a game's live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A scorer opens live scoring for the game.
    Start,
    /// A scorer records runs for a half-inning.
    SubmitScore,
    /// A scorer moves the session to another inning.
    AdvanceInning,
    /// Totals are written to the game and the session closes.
    Finalize,
    /// The session closes without touching the game.
    Stop,
    /// The startup sweep closes a session orphaned by a restart.
    Abandon,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Status of the game's latest session, `None` when it never had one.
    pub from: Option<SessionStatus>,
    /// The rejected event.
    pub event: SessionEvent,
}

/// Compute the status a session moves to when `event` is applied.
///
/// `from` is the status of the game's latest session row. Starting is allowed when there is
/// none or when it is terminal; every other event needs an active session.
pub fn next_status(
    from: Option<SessionStatus>,
    event: SessionEvent,
) -> Result<SessionStatus, InvalidTransition> {
    let next = match (from, event) {
        (None, SessionEvent::Start) => SessionStatus::Active,
        (Some(status), SessionEvent::Start) if status.is_terminal() => SessionStatus::Active,
        (Some(SessionStatus::Active), SessionEvent::SubmitScore | SessionEvent::AdvanceInning) => {
            SessionStatus::Active
        }
        (Some(SessionStatus::Active), SessionEvent::Finalize) => SessionStatus::Finalized,
        (Some(SessionStatus::Active), SessionEvent::Stop) => SessionStatus::Stopped,
        (Some(SessionStatus::Active), SessionEvent::Abandon) => SessionStatus::Abandoned,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMINAL: [SessionStatus; 3] = [
        SessionStatus::Finalized,
        SessionStatus::Stopped,
        SessionStatus::Abandoned,
    ];

    #[test]
    fn start_from_nothing_is_active() {
        assert_eq!(
            next_status(None, SessionEvent::Start),
            Ok(SessionStatus::Active)
        );
    }

    #[test]
    fn start_while_active_is_rejected() {
        let err = next_status(Some(SessionStatus::Active), SessionEvent::Start).unwrap_err();
        assert_eq!(err.from, Some(SessionStatus::Active));
        assert_eq!(err.event, SessionEvent::Start);
    }

    #[test]
    fn restart_allowed_after_every_terminal_status() {
        for status in TERMINAL {
            assert_eq!(
                next_status(Some(status), SessionEvent::Start),
                Ok(SessionStatus::Active)
            );
        }
    }

    #[test]
    fn scoring_keeps_the_session_active() {
        for event in [SessionEvent::SubmitScore, SessionEvent::AdvanceInning] {
            assert_eq!(
                next_status(Some(SessionStatus::Active), event),
                Ok(SessionStatus::Active)
            );
        }
    }

    #[test]
    fn closing_events_reach_their_terminal_status() {
        let active = Some(SessionStatus::Active);
        assert_eq!(
            next_status(active, SessionEvent::Finalize),
            Ok(SessionStatus::Finalized)
        );
        assert_eq!(
            next_status(active, SessionEvent::Stop),
            Ok(SessionStatus::Stopped)
        );
        assert_eq!(
            next_status(active, SessionEvent::Abandon),
            Ok(SessionStatus::Abandoned)
        );
    }

    #[test]
    fn terminal_sessions_accept_nothing_but_a_restart() {
        let events = [
            SessionEvent::SubmitScore,
            SessionEvent::AdvanceInning,
            SessionEvent::Finalize,
            SessionEvent::Stop,
            SessionEvent::Abandon,
        ];
        for status in TERMINAL {
            for event in events {
                assert!(next_status(Some(status), event).is_err());
            }
        }
    }

    #[test]
    fn nothing_but_start_applies_without_a_session() {
        assert!(next_status(None, SessionEvent::SubmitScore).is_err());
        assert!(next_status(None, SessionEvent::Finalize).is_err());
    }
}
