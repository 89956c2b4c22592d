// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub sessions: usize,
    pub connections: usize,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "cadview-server",
        sessions: state.registry.session_count(),
        connections: state.registry.connection_count(),
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "cadview-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "Session host for CADView-Lite computation and visualization peers",
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/api/v1/health",
                description: "Health check endpoint",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/sessions",
                description: "Live sessions with peer counts",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/sessions/:session",
                description: "Statistics of one session",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/sessions/:session/status",
                description: "Merged view state reported by a session's viewers",
            },
            EndpointInfo {
                method: "GET",
                path: "/ws/:session",
                description: "WebSocket peer channel for a session",
            },
        ],
    })
}
