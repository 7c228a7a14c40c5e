use std::{collections::HashMap, time::SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{self, Principal},
    dao::models::{GameRecord, InningScoreEntity, SessionEntity, SessionStatus},
    dto::{
        format_system_time,
        live::{
            ActiveSessionItem, FinalizeResponse, InningAdvancedResponse, InningScoreResponse,
            SessionStateResponse, SessionStatusResponse, StopResponse, SubmitScoreRequest,
        },
        sse::{
            InningAdvancedEvent, ScoreUpdateEvent, SessionFinalizedEvent, SessionStartedEvent,
            SessionStoppedEvent,
        },
        validation::{MAX_INNING, MAX_RUNS, MIN_INNING, is_valid_inning},
    },
    error::ServiceError,
    services::sse_events,
    state::{SessionEvent, SharedState, next_status},
};

const FIRST_INNING: u32 = 1;

/// Whether the game is being scored right now, with the number of viewers watching it.
pub async fn get_session_status(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
) -> Result<SessionStatusResponse, ServiceError> {
    let response = match find_active(state, account_id, game_id).await? {
        Some(session) => SessionStatusResponse {
            has_active_session: true,
            session_id: Some(session.id),
            viewer_count: Some(state.hub().viewer_count(game_id)),
        },
        None => SessionStatusResponse {
            has_active_session: false,
            session_id: None,
            viewer_count: None,
        },
    };
    Ok(response)
}

/// Full snapshot of the game's active session, `None` when nobody is scoring it.
pub async fn get_session_state(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
) -> Result<Option<SessionStateResponse>, ServiceError> {
    match find_active(state, account_id, game_id).await? {
        Some(session) => Ok(Some(build_snapshot(state, &session).await?)),
        None => Ok(None),
    }
}

/// Open a live session for a game that is not final and not already being scored.
///
/// Sessions left over from earlier attempts are deleted together with their innings.
pub async fn start_session(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
) -> Result<SessionStateResponse, ServiceError> {
    let game = require_game(state, account_id, game_id).await?;
    ensure_can_score(state, principal, &game).await?;
    if game.is_final() {
        return Err(ServiceError::InvalidInput(format!(
            "game `{game_id}` is already final"
        )));
    }

    let session = {
        let shared = state.clone();
        let user_id = principal.user_id;
        let started_by = principal.display_name.clone();
        let account_id = game.account_id;
        state.run_exclusive(game_id, move || async move {
            let state = shared;
            let sessions = state.sessions();
            let history = sessions.list_sessions_for_game(game_id).await?;
            if history.iter().any(|s| s.status == SessionStatus::Active) {
                return Err(ServiceError::InvalidInput(format!(
                    "game `{game_id}` already has an active live session"
                )));
            }
            let latest = history.iter().max_by_key(|s| s.started_at).map(|s| s.status);
            let status = next_status(latest, SessionEvent::Start)?;

            for previous in &history {
                sessions.delete_session(previous.id).await?;
            }
            if !history.is_empty() {
                info!(%game_id, removed = history.len(), "deleted previous live sessions");
            }

            let session = SessionEntity {
                id: Uuid::new_v4(),
                game_id,
                account_id,
                status,
                current_inning: FIRST_INNING,
                started_by: user_id,
                started_at: SystemTime::now(),
                ended_at: None,
            };
            sessions.insert_session(session.clone()).await?;

            sse_events::broadcast_session_started(
                state.hub(),
                game_id,
                SessionStartedEvent {
                    session_id: session.id,
                    game_id,
                    started_by,
                    started_at: format_system_time(session.started_at),
                },
            );
            Ok::<_, ServiceError>(session)
        })
        .await?
    };

    info!(%game_id, session_id = %session.id, user_id = %principal.user_id, "live session started");
    build_snapshot(state, &session).await
}

/// Record the runs of one half-inning, overwriting any previous value for it.
pub async fn submit_inning_score(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
    request: SubmitScoreRequest,
) -> Result<InningScoreResponse, ServiceError> {
    let game = require_game(state, account_id, game_id).await?;
    ensure_can_score(state, principal, &game).await?;
    ensure_inning(request.inning_number)?;
    ensure_runs(request.runs)?;

    let stored = {
        let shared = state.clone();
        let user_id = principal.user_id;
        let entered_by = principal.display_name.clone();
        state.run_exclusive(game_id, move || async move {
            let state = shared;
            let session = require_active(&state, game_id).await?;
            next_status(Some(session.status), SessionEvent::SubmitScore)?;
            let score = InningScoreEntity {
                session_id: session.id,
                inning_number: request.inning_number,
                is_home_team: request.is_home_team,
                runs: request.runs,
                entered_by: user_id,
                entered_at: SystemTime::now(),
            };
            let stored = state.sessions().upsert_inning_score(score).await?;

            sse_events::broadcast_score_update(
                state.hub(),
                game_id,
                ScoreUpdateEvent {
                    inning_number: stored.inning_number,
                    is_home_team: stored.is_home_team,
                    runs: stored.runs,
                    entered_by,
                    timestamp: format_system_time(stored.entered_at),
                },
            );
            Ok::<_, ServiceError>(stored)
        })
        .await?
    };

    info!(
        %game_id,
        inning = stored.inning_number,
        home = stored.is_home_team,
        runs = stored.runs,
        "inning score recorded"
    );
    Ok(InningScoreResponse {
        inning_number: stored.inning_number,
        is_home_team: stored.is_home_team,
        runs: stored.runs,
        entered_by: principal.display_name.clone(),
        entered_at: format_system_time(stored.entered_at),
    })
}

/// Move the active session to `inning_number`.
pub async fn advance_inning(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
    inning_number: u32,
) -> Result<InningAdvancedResponse, ServiceError> {
    let game = require_game(state, account_id, game_id).await?;
    ensure_can_score(state, principal, &game).await?;
    ensure_inning(inning_number)?;

    let session_id = {
        let shared = state.clone();
        let advanced_by = principal.display_name.clone();
        state.run_exclusive(game_id, move || async move {
            let state = shared;
            let session = require_active(&state, game_id).await?;
            next_status(Some(session.status), SessionEvent::AdvanceInning)?;
            state
                .sessions()
                .update_current_inning(session.id, inning_number)
                .await?;

            sse_events::broadcast_inning_advanced(
                state.hub(),
                game_id,
                InningAdvancedEvent {
                    inning_number,
                    advanced_by,
                    timestamp: format_system_time(SystemTime::now()),
                },
            );
            Ok::<_, ServiceError>(session.id)
        })
        .await?
    };

    info!(%game_id, %session_id, inning = inning_number, "inning advanced");
    Ok(InningAdvancedResponse {
        session_id,
        current_inning: inning_number,
    })
}

/// Sum the recorded innings, write the totals to the game and close the session.
///
/// The game is written first; if closing the session fails afterwards the game is already final
/// and the next startup sweep abandons the leftover session.
pub async fn finalize_session(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
) -> Result<FinalizeResponse, ServiceError> {
    let game = require_game(state, account_id, game_id).await?;
    ensure_can_score(state, principal, &game).await?;

    let (session, totals) = {
        let shared = state.clone();
        let finalized_by = principal.display_name.clone();
        state.run_exclusive(game_id, move || async move {
            let state = shared;
            let session = require_active(&state, game_id).await?;
            // Re-read so a concurrent finalize through another path is seen.
            let game = state
                .games()
                .find_game(game_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
            if game.is_final() {
                return Err(ServiceError::InvalidInput(format!(
                    "game `{game_id}` is already final"
                )));
            }
            let status = next_status(Some(session.status), SessionEvent::Finalize)?;

            let innings = state.sessions().list_inning_scores(session.id).await?;
            let totals = side_totals(&innings)?;
            state
                .games()
                .record_final_score(game_id, totals.home, totals.visitor)
                .await?;
            state
                .sessions()
                .update_status(session.id, status, Some(SystemTime::now()))
                .await?;

            sse_events::broadcast_session_finalized(
                state.hub(),
                game_id,
                SessionFinalizedEvent {
                    session_id: session.id,
                    game_id,
                    finalized_by,
                    timestamp: format_system_time(SystemTime::now()),
                    home_team_total: totals.home,
                    visitor_team_total: totals.visitor,
                },
            );
            Ok::<_, ServiceError>((session, totals))
        })
        .await?
    };

    info!(
        %game_id,
        session_id = %session.id,
        home = totals.home,
        visitor = totals.visitor,
        "live session finalized"
    );
    Ok(FinalizeResponse {
        session_id: session.id,
        game_id,
        status: SessionStatus::Finalized,
        home_team_total: totals.home,
        visitor_team_total: totals.visitor,
    })
}

/// Close the active session without touching the game record.
pub async fn stop_session(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
    principal: &Principal,
) -> Result<StopResponse, ServiceError> {
    let game = require_game(state, account_id, game_id).await?;
    ensure_can_score(state, principal, &game).await?;

    let session_id = {
        let shared = state.clone();
        let stopped_by = principal.display_name.clone();
        state.run_exclusive(game_id, move || async move {
            let state = shared;
            let session = require_active(&state, game_id).await?;
            let status = next_status(Some(session.status), SessionEvent::Stop)?;
            state
                .sessions()
                .update_status(session.id, status, Some(SystemTime::now()))
                .await?;

            sse_events::broadcast_session_stopped(
                state.hub(),
                game_id,
                SessionStoppedEvent {
                    session_id: session.id,
                    game_id,
                    stopped_by,
                    timestamp: format_system_time(SystemTime::now()),
                },
            );
            Ok::<_, ServiceError>(session.id)
        })
        .await?
    };

    info!(%game_id, %session_id, "live session stopped");
    Ok(StopResponse {
        session_id,
        game_id,
        status: SessionStatus::Stopped,
    })
}

/// Games of the account currently being scored live.
pub async fn get_active_sessions_for_account(
    state: &SharedState,
    account_id: Uuid,
) -> Result<Vec<ActiveSessionItem>, ServiceError> {
    let sessions = state.sessions().list_active_sessions(account_id).await?;
    Ok(sessions
        .into_iter()
        .map(|session| ActiveSessionItem {
            game_id: session.game_id,
            session_id: session.id,
        })
        .collect())
}

/// Abandon every session still marked active, returning how many were closed.
///
/// Run once at startup: no connection survives a restart, so no scorer can still be driving them.
pub async fn cleanup_stale_sessions(state: &SharedState) -> Result<u64, ServiceError> {
    let status = next_status(Some(SessionStatus::Active), SessionEvent::Abandon)?;
    let abandoned = state
        .sessions()
        .close_active_sessions(status, SystemTime::now())
        .await?;
    if abandoned > 0 {
        info!(abandoned, "abandoned stale live sessions");
    }
    Ok(abandoned)
}

/// Runs per side summed over a session's inning rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SideTotals {
    pub home: u32,
    pub visitor: u32,
}

pub(crate) fn side_totals(innings: &[InningScoreEntity]) -> Result<SideTotals, ServiceError> {
    let mut totals = SideTotals::default();
    for inning in innings {
        let side = if inning.is_home_team {
            &mut totals.home
        } else {
            &mut totals.visitor
        };
        *side = side.checked_add(inning.runs).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "run total of session `{}` overflows",
                inning.session_id
            ))
        })?;
    }
    Ok(totals)
}

/// Snapshot of an active session as shown to viewers.
pub(crate) async fn build_snapshot(
    state: &SharedState,
    session: &SessionEntity,
) -> Result<SessionStateResponse, ServiceError> {
    let innings = state.sessions().list_inning_scores(session.id).await?;
    let totals = side_totals(&innings)?;

    let mut names: HashMap<Uuid, String> = HashMap::new();
    let started_by = resolve_name(state, &mut names, session.started_by).await?;

    let mut rows = Vec::with_capacity(innings.len());
    for inning in innings {
        let entered_by = resolve_name(state, &mut names, inning.entered_by).await?;
        rows.push(InningScoreResponse {
            inning_number: inning.inning_number,
            is_home_team: inning.is_home_team,
            runs: inning.runs,
            entered_by,
            entered_at: format_system_time(inning.entered_at),
        });
    }

    Ok(SessionStateResponse {
        session_id: session.id,
        game_id: session.game_id,
        status: session.status,
        current_inning: session.current_inning,
        started_by,
        started_at: format_system_time(session.started_at),
        innings: rows,
        home_team_total: totals.home,
        visitor_team_total: totals.visitor,
        viewer_count: state.hub().viewer_count(session.game_id),
        scorer_count: state.hub().scorer_count(session.game_id),
    })
}

/// Active session of a game, hidden when it belongs to another account.
pub(crate) async fn find_active(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
) -> Result<Option<SessionEntity>, ServiceError> {
    let session = state.sessions().find_active_session(game_id).await?;
    Ok(session.filter(|session| session.account_id == account_id))
}

/// Game `game_id` of `account_id`; games of other accounts are reported as missing.
pub(crate) async fn require_game(
    state: &SharedState,
    account_id: Uuid,
    game_id: Uuid,
) -> Result<GameRecord, ServiceError> {
    match state.games().find_game(game_id).await? {
        Some(game) if game.account_id == account_id => Ok(game),
        _ => Err(ServiceError::NotFound(format!("game `{game_id}` not found"))),
    }
}

async fn require_active(state: &SharedState, game_id: Uuid) -> Result<SessionEntity, ServiceError> {
    state
        .sessions()
        .find_active_session(game_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("game `{game_id}` has no active live session"))
        })
}

async fn ensure_can_score(
    state: &SharedState,
    principal: &Principal,
    game: &GameRecord,
) -> Result<(), ServiceError> {
    if auth::can_score(state.permissions(), principal.user_id, game).await? {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "user `{}` may not score game `{}`",
            principal.user_id, game.id
        )))
    }
}

fn ensure_runs(runs: u32) -> Result<(), ServiceError> {
    if runs <= MAX_RUNS {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "runs must be at most {MAX_RUNS} (got {runs})"
        )))
    }
}

fn ensure_inning(inning_number: u32) -> Result<(), ServiceError> {
    if is_valid_inning(inning_number) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "inning number must be between {MIN_INNING} and {MAX_INNING} (got {inning_number})"
        )))
    }
}

async fn resolve_name(
    state: &SharedState,
    cache: &mut HashMap<Uuid, String>,
    user_id: Uuid,
) -> Result<String, ServiceError> {
    if let Some(name) = cache.get(&user_id) {
        return Ok(name.clone());
    }
    let name = state
        .identities()
        .display_name(user_id)
        .await?
        .unwrap_or_else(|| user_id.to_string());
    cache.insert(user_id, name.clone());
    Ok(name)
}
