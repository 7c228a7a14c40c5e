use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAliveStream, Sse},
    routing::get,
};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dto::live::SubscribeQuery, error::AppError, services::sse_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/accounts/{account_id}/games/{game_id}/live/subscribe",
    tag = "sse",
    params(
        ("account_id" = Uuid, Path, description = "Account owning the game"),
        ("game_id" = Uuid, Path, description = "Game to follow"),
        SubscribeQuery
    ),
    responses(
        (status = 200, description = "Live scoring event stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Missing, unknown, expired or mismatched ticket")
    )
)]
/// Stream live-scoring events of one game, starting with `connected` and a snapshot.
pub async fn subscribe(
    State(state): State<SharedState>,
    Path((account_id, game_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<SubscribeQuery>,
) -> Result<Sse<KeepAliveStream<ReceiverStream<Result<Event, Infallible>>>>, AppError> {
    let subscription =
        sse_service::open_subscription(&state, account_id, game_id, query.ticket.as_deref())
            .await?;
    Ok(sse_service::into_sse(state, subscription))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route(
        "/accounts/{account_id}/games/{game_id}/live/subscribe",
        get(subscribe),
    )
}
