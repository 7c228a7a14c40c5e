use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Ballpark Live.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::live::session_status,
        crate::routes::live::session_state,
        crate::routes::live::active_sessions,
        crate::routes::live::create_ticket,
        crate::routes::live::start_session,
        crate::routes::live::submit_score,
        crate::routes::live::advance_inning,
        crate::routes::live::finalize_session,
        crate::routes::live::stop_session,
        crate::routes::sse::subscribe,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::live::SessionStatusResponse,
            crate::dto::live::SessionStateResponse,
            crate::dto::live::InningScoreResponse,
            crate::dto::live::SubmitScoreRequest,
            crate::dto::live::AdvanceInningRequest,
            crate::dto::live::InningAdvancedResponse,
            crate::dto::live::FinalizeResponse,
            crate::dto::live::StopResponse,
            crate::dto::live::TicketResponse,
            crate::dto::live::ActiveSessionItem,
            crate::dto::sse::ConnectedEvent,
            crate::dto::sse::NoSessionEvent,
            crate::dto::sse::SessionStartedEvent,
            crate::dto::sse::ScoreUpdateEvent,
            crate::dto::sse::InningAdvancedEvent,
            crate::dto::sse::SessionFinalizedEvent,
            crate::dto::sse::SessionStoppedEvent,
            crate::dao::models::SessionStatus,
            crate::state::ConnectionRole,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "live", description = "Live scoring sessions"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_live_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/accounts/{account_id}/games/{game_id}/live",
            "/accounts/{account_id}/games/{game_id}/live/subscribe",
            "/accounts/{account_id}/games/{game_id}/live/finalize",
            "/accounts/{account_id}/live/active",
            "/healthcheck",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer"));
    }
}
