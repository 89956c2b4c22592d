// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session statistics endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use cadview_core::StateDelta;
use cadview_session::{SessionId, SessionStats};

/// GET /api/v1/sessions - All live sessions, ordered by id.
pub async fn list(State(state): State<AppState>) -> Json<Vec<SessionStats>> {
    Json(state.registry.snapshot())
}

/// GET /api/v1/sessions/:session - One session.
pub async fn get(
    Path(session): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionStats>, ApiError> {
    state
        .registry
        .snapshot()
        .into_iter()
        .find(|s| s.session.as_str() == session)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session '{}'", session)))
}

/// GET /api/v1/sessions/:session/status - Merged view state of a session.
pub async fn status(
    Path(session): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StateDelta>, ApiError> {
    state
        .registry
        .status(&SessionId::new(session.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session '{}'", session)))
}
