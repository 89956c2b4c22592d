// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CADView-Lite Server - session host for computation and visualization peers.
//!
//! Each WebSocket connection joins one session and announces its role with a
//! REGISTER frame. Frames are decoded here and handed to the session
//! registry, which decides where they go.
//!
//! # Endpoints
//!
//! - `GET /` - API information
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/sessions` - Live sessions with peer counts
//! - `GET /api/v1/sessions/:session` - One session
//! - `GET /ws/:session` - Peer channel (WebSocket)

use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use cadview_core::Frame;
use cadview_session::SessionRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

mod config;
mod error;
mod routes;

use config::Config;

/// Registry whose peers are fed through per-connection frame queues.
pub type Registry = SessionRegistry<mpsc::Sender<Arc<Frame>>>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Arc::new(Registry::new(config.registry())),
            config: Arc::new(config),
        }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
}

/// Build the router with all routes.
pub fn app(state: AppState) -> Router {
    let cors = cors(&state.config.cors_origins);
    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Session statistics
        .route("/api/v1/sessions", get(routes::sessions::list))
        .route("/api/v1/sessions/:session", get(routes::sessions::get))
        .route("/api/v1/sessions/:session/status", get(routes::sessions::status))
        // Peer channel
        .route("/ws/:session", get(routes::ws::upgrade))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize logging
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,tower_http=debug,cadview_server=debug,cadview_session=debug".into()
    });
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }

    tracing::info!(
        addr = %config.addr(),
        peer_queue_depth = config.peer_queue_depth,
        max_pending_per_session = config.max_pending_per_session,
        max_frame_size_mb = config.max_frame_size_mb,
        "Starting CADView-Lite Server"
    );

    let addr = config.addr();
    let app = app(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
