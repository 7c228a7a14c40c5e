use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// SSE connections currently open on this instance.
    pub open_connections: usize,
}

impl HealthResponse {
    /// Build a response from the store health and the hub's connection count.
    pub fn new(store_healthy: bool, open_connections: usize) -> Self {
        let status = if store_healthy { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            open_connections,
        }
    }
}
