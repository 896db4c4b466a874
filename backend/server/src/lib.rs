//! Relay server behind the follower-count dashboard.
//!
//!
//!
//! # General Infrastructure
//! - Browser dashboard logs in with the Facebook SDK and hands its short-lived token to `/api/auth/facebook`
//! - Server trades it for a long-lived token, picks a page and its linked Instagram account
//! - Dashboard opens `/api/stream` and receives merged follower counts on an interval
//! - No database, sessions are in memory and vanish on restart
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET  | `/api/status`        | session or token mode active? |
//! | POST | `/api/auth/facebook` | `{"token": "..."}` → user + selected page |
//! | POST | `/api/logout`        | drop the session |
//! | GET  | `/api/stream`        | SSE, `?interval=ms` clamped to 3s..60s |
//! | GET  | `/*`                 | static files from `STATIC_DIR` |
//!
//!
//!
//! # Token Mode
//!
//! Set `FB_PAGE_ID` plus `FB_PAGE_ACCESS_TOKEN` and/or `IG_ACCESS_TOKEN` (optionally `IG_USER_ID`)
//! and the stream works without anyone logging in. A logged in session still takes precedence.
//!
//!
//!
//! # Configuration
//!
//! Every key is looked up in `config.local.json`, then the environment, then `/run/secrets/<KEY>`.
//!
//! ```json
//! {
//!   "FB_APP_ID": "...",
//!   "FB_APP_SECRET": "...",
//!   "PORT": 3000
//! }
//! ```
//!
//!
//!
//! # Setup
//!
//! Run with logs.
//! ```sh
//! RUST_LOG=info,server=debug cargo run -p pulse
//! ```
//!
//! Watch a running stream.
//! ```sh
//! cargo run -p tester -- --interval 5000
//! ```
use std::{path::Path, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod relay;
pub mod routes;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

use config::Config;
use relay::stream_handler;
use routes::{auth_handler, logout_handler, status_handler};
use state::{SharedState, State};

pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/auth/facebook", post(auth_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/stream", get(stream_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config_path: &Path, port: Option<u16>) -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.shutdown.send_replace(true);
}
