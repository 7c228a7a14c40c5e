use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    auth::Principal,
    dto::live::{
        ActiveSessionItem, AdvanceInningRequest, FinalizeResponse, InningAdvancedResponse,
        InningScoreResponse, SessionStateResponse, SessionStatusResponse, StopResponse,
        SubmitScoreRequest, TicketResponse,
    },
    error::AppError,
    services::{live_service, sse_service},
    state::SharedState,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Public read-only live-scoring routes.
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route(
            "/accounts/{account_id}/games/{game_id}/live",
            get(session_state),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/status",
            get(session_status),
        )
        .route("/accounts/{account_id}/live/active", get(active_sessions))
}

/// Routes that require a bearer token; scoring rights are checked per game by the services.
pub fn scorer_router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/accounts/{account_id}/games/{game_id}/live/ticket",
            post(create_ticket),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/start",
            post(start_session),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/scores",
            post(submit_score),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/advance",
            post(advance_inning),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/finalize",
            post(finalize_session),
        )
        .route(
            "/accounts/{account_id}/games/{game_id}/live/stop",
            post(stop_session),
        )
        .route_layer(middleware::from_fn_with_state(state, require_bearer))
}

/// Whether the game is currently scored live.
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/games/{game_id}/live/status",
    tag = "live",
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game to inspect")
    ),
    responses((status = 200, description = "Live session presence", body = SessionStatusResponse))
)]
pub async fn session_status(
    State(state): State<SharedState>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    Ok(Json(
        live_service::get_session_status(&state, account_id, game_id).await?,
    ))
}

/// Snapshot of the game's active live session.
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/games/{game_id}/live",
    tag = "live",
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game to inspect")
    ),
    responses(
        (status = 200, description = "Active session snapshot", body = SessionStateResponse),
        (status = 404, description = "No active session")
    )
)]
pub async fn session_state(
    State(state): State<SharedState>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionStateResponse>, AppError> {
    live_service::get_session_state(&state, account_id, game_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("game `{game_id}` has no active live session")))
}

/// Games of the account being scored live right now.
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/live/active",
    tag = "live",
    params(("account_id" = Uuid, Path, description = "Account to list")),
    responses((status = 200, description = "Active sessions", body = [ActiveSessionItem]))
)]
pub async fn active_sessions(
    State(state): State<SharedState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<ActiveSessionItem>>, AppError> {
    Ok(Json(
        live_service::get_active_sessions_for_account(&state, account_id).await?,
    ))
}

/// Mint a short-lived ticket for the subscribe stream.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/ticket",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game to subscribe to")
    ),
    responses(
        (status = 200, description = "Ticket issued", body = TicketResponse),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn create_ticket(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TicketResponse>, AppError> {
    Ok(Json(
        sse_service::issue_ticket(&state, account_id, game_id, &principal).await?,
    ))
}

/// Open live scoring for a game.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/start",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game to score")
    ),
    responses(
        (status = 200, description = "Session started", body = SessionStateResponse),
        (status = 400, description = "Game final or already scored live"),
        (status = 403, description = "Caller may not score this game")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionStateResponse>, AppError> {
    Ok(Json(
        live_service::start_session(&state, account_id, game_id, &principal).await?,
    ))
}

/// Record the runs of a half-inning.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/scores",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game being scored")
    ),
    request_body = SubmitScoreRequest,
    responses(
        (status = 200, description = "Score stored", body = InningScoreResponse),
        (status = 400, description = "Inning out of range"),
        (status = 404, description = "No active session")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<SubmitScoreRequest>>,
) -> Result<Json<InningScoreResponse>, AppError> {
    Ok(Json(
        live_service::submit_inning_score(&state, account_id, game_id, &principal, payload)
            .await?,
    ))
}

/// Move the session to another inning.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/advance",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game being scored")
    ),
    request_body = AdvanceInningRequest,
    responses(
        (status = 200, description = "Inning advanced", body = InningAdvancedResponse),
        (status = 400, description = "Inning out of range"),
        (status = 404, description = "No active session")
    )
)]
pub async fn advance_inning(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<AdvanceInningRequest>>,
) -> Result<Json<InningAdvancedResponse>, AppError> {
    Ok(Json(
        live_service::advance_inning(
            &state,
            account_id,
            game_id,
            &principal,
            payload.inning_number,
        )
        .await?,
    ))
}

/// Write the session totals to the game and close the session.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/finalize",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game being scored")
    ),
    responses(
        (status = 200, description = "Session finalized", body = FinalizeResponse),
        (status = 400, description = "Game already final"),
        (status = 404, description = "No active session")
    )
)]
pub async fn finalize_session(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FinalizeResponse>, AppError> {
    Ok(Json(
        live_service::finalize_session(&state, account_id, game_id, &principal).await?,
    ))
}

/// Close the session without touching the game.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/games/{game_id}/live/stop",
    tag = "live",
    security(("bearer" = [])),
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game being scored")
    ),
    responses(
        (status = 200, description = "Session stopped", body = StopResponse),
        (status = 404, description = "No active session")
    )
)]
pub async fn stop_session(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<StopResponse>, AppError> {
    Ok(Json(
        live_service::stop_session(&state, account_id, game_id, &principal).await?,
    ))
}

async fn require_bearer(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let principal = state
        .identities()
        .authenticate(&token)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?
        .ok_or_else(|| AppError::Unauthorized("invalid bearer token".into()))?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
