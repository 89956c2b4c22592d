// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket peer channel.
//!
//! One reader loop per socket feeds decoded messages into the registry; a
//! writer task drains the connection's bounded queue back onto the socket.

use crate::error::ApiError;
use crate::{AppState, Registry};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use cadview_core::{Frame, Message};
use cadview_session::{ConnectionId, RoutingError, SessionId};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_SESSION_ID_LEN: usize = 128;

/// GET /ws/:session - Upgrade to a peer channel bound to `session`.
pub async fn upgrade(
    ws: WebSocketUpgrade,
    Path(session): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session)?;
    let max = state.config.max_frame_bytes();
    Ok(ws
        .max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| serve(socket, session, state)))
}

fn parse_session(raw: &str) -> Result<SessionId, ApiError> {
    let valid = !raw.is_empty()
        && raw.len() <= MAX_SESSION_ID_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(SessionId::new(raw))
    } else {
        Err(ApiError::InvalidSession(raw.to_string()))
    }
}

async fn serve(socket: WebSocket, session: SessionId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut queue) = mpsc::channel::<Arc<Frame>>(state.config.peer_queue_depth);
    let peer = Peer::new(state.registry.clone(), session, outbox);
    tracing::info!(session = %peer.session, connection = %peer.id, "peer connected");

    let writer = tokio::spawn(async move {
        while let Some(frame) = queue.recv().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "frame could not be encoded");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(WsMessage::Text(text)) => peer.receive(&text),
            Ok(WsMessage::Binary(bytes)) => peer.receive_bytes(&bytes),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session = %peer.session, connection = %peer.id, error = %e, "socket error");
                break;
            }
        }
    }

    tracing::info!(session = %peer.session, connection = %peer.id, "peer disconnected");
    // Unregistering drops the registry's copy of the outbox, which ends the writer
    drop(peer);
    let _ = writer.await;
}

/// Registry side of one connection. Unregisters on drop.
pub struct Peer {
    id: ConnectionId,
    session: SessionId,
    registry: Arc<Registry>,
    outbox: mpsc::Sender<Arc<Frame>>,
}

impl Peer {
    pub fn new(registry: Arc<Registry>, session: SessionId, outbox: mpsc::Sender<Arc<Frame>>) -> Self {
        Self {
            id: registry.next_connection_id(),
            session,
            registry,
            outbox,
        }
    }

    /// Handle one text frame. Malformed frames are logged and dropped.
    pub fn receive(&self, text: &str) {
        match Message::decode(text) {
            Ok(message) => self.dispatch(message),
            Err(e) => {
                tracing::warn!(session = %self.session, connection = %self.id, code = ?e.code(), error = %e, "dropping malformed frame");
            }
        }
    }

    pub fn receive_bytes(&self, bytes: &[u8]) {
        match Message::decode_bytes(bytes) {
            Ok(message) => self.dispatch(message),
            Err(e) => {
                tracing::warn!(session = %self.session, connection = %self.id, code = ?e.code(), error = %e, "dropping malformed frame");
            }
        }
    }

    fn dispatch(&self, message: Message) {
        let result = match message {
            Message::Register(register) => self
                .registry
                .register(&self.session, self.id, register.role, self.outbox.clone())
                .map(|_| ()),
            other => self.registry.route(self.id, other).map(|_| ()),
        };
        if let Err(e) = result {
            self.report(&e);
        }
    }

    fn report(&self, err: &RoutingError) {
        tracing::debug!(session = %self.session, connection = %self.id, code = ?err.code(), "routing failure");
        let frame = Arc::new(Frame::from(err.to_failure()));
        if self.outbox.try_send(frame).is_err() {
            tracing::warn!(session = %self.session, connection = %self.id, "failure notice dropped");
        }
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
