//! Leaderboard server: `/scores` over CouchDB, or an in-memory index when no database is set.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memory_match::{
    dao::score_store::memory::MemoryScoreStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = build_state();
    let app = routes::router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the score store: CouchDB under supervision when configured, memory otherwise.
fn build_state() -> SharedState {
    #[cfg(feature = "couch-store")]
    {
        use memory_match::{
            dao::{
                score_store::{
                    ScoreStore,
                    couchdb::{CouchConfig, CouchScoreStore},
                },
                storage::StorageError,
            },
            services::storage_supervisor,
        };

        match CouchConfig::from_env() {
            Ok(config) => {
                info!(database = %config.database, "using CouchDB score store");
                let state = AppState::new();
                tokio::spawn(storage_supervisor::run(state.clone(), move || {
                    let config = config.clone();
                    async move {
                        let store = CouchScoreStore::connect(config).await?;
                        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ScoreStore>)
                    }
                }));
                return state;
            }
            Err(err) => info!(reason = %err, "CouchDB not configured"),
        }
    }

    warn!("scores are kept in memory and lost on restart");
    AppState::with_store(Arc::new(MemoryScoreStore::new()))
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
