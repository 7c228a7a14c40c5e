//! Ballpark Live binary entrypoint wiring REST, SSE and the persistence backends.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ballpark_live::{
    config::AppConfig,
    routes,
    services::{live_service, sse_service},
    state::{AppState, Backends, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backends = build_backends(&config).await?;
    let app_state = AppState::new(config, backends);

    let abandoned = live_service::cleanup_stale_sessions(&app_state)
        .await
        .context("abandoning stale live sessions")?;
    info!(abandoned, "startup cleanup complete");

    sse_service::spawn_ticket_sweeper(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick MongoDB when `MONGO_URI` is set, the in-memory backends otherwise.
#[cfg(feature = "mongo-store")]
async fn build_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    use std::sync::Arc;

    use ballpark_live::dao::mongodb::{
        MongoConfig, MongoGameDirectory, MongoHandle, MongoSessionStore,
    };

    let Ok(uri) = env::var("MONGO_URI") else {
        info!("MONGO_URI not set; using in-memory backends");
        return Ok(Backends::in_memory(config));
    };
    let db_name = env::var("MONGO_DB").ok();

    let mongo_config = MongoConfig::from_uri(&uri, db_name.as_deref())
        .await
        .context("parsing MongoDB connection string")?;
    let handle = MongoHandle::connect(&mongo_config)
        .await
        .context("connecting to MongoDB")?;
    let sessions = MongoSessionStore::new(handle.clone())
        .await
        .context("preparing live session collections")?;
    info!("using MongoDB backends");

    let memory = Backends::in_memory(config);
    Ok(Backends {
        sessions: Arc::new(sessions),
        games: Arc::new(MongoGameDirectory::new(handle)),
        ..memory
    })
}

#[cfg(not(feature = "mongo-store"))]
async fn build_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    info!("built without mongo-store; using in-memory backends");
    Ok(Backends::in_memory(config))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
