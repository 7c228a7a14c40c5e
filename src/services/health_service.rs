use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the session store's reachability while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store_healthy = match state.sessions().health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "session store health check failed");
            false
        }
    };

    HealthResponse::new(store_healthy, state.hub().connection_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, Backends},
    };

    #[tokio::test]
    async fn in_memory_store_reports_ok() {
        let config = AppConfig::default();
        let backends = Backends::in_memory(&config);
        let state = AppState::new(config, backends);

        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.open_connections, 0);
    }
}
