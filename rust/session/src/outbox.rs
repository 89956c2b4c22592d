// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Forwarding of an in-process peer's outbox into the registry.
//!
//! A viewer state machine queues its interaction traffic on an unbounded
//! channel. These helpers route that traffic as if it had arrived on the
//! viewer's connection.

use crate::registry::{ConnectionId, SessionRegistry};
use crate::sink::PeerSink;
use cadview_core::Message;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Route every message already waiting on `outbox` as traffic from `conn`.
///
/// Returns how many were routed. Refused messages are logged; messages
/// waiting for a computation peer stay pending in the registry.
pub fn forward_queued<S: PeerSink>(
    registry: &SessionRegistry<S>,
    conn: ConnectionId,
    outbox: &mut UnboundedReceiver<Message>,
) -> usize {
    let mut routed = 0;
    while let Ok(message) = outbox.try_recv() {
        if forward(registry, conn, message) {
            routed += 1;
        }
    }
    routed
}

/// Route messages from `outbox` until every sender is dropped.
pub async fn forward_outbox<S: PeerSink>(
    registry: Arc<SessionRegistry<S>>,
    conn: ConnectionId,
    mut outbox: UnboundedReceiver<Message>,
) {
    while let Some(message) = outbox.recv().await {
        forward(&registry, conn, message);
    }
    tracing::debug!(connection = %conn, "outbox closed");
}

fn forward<S: PeerSink>(registry: &SessionRegistry<S>, conn: ConnectionId, message: Message) -> bool {
    let kind = message.kind();
    match registry.route(conn, message) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(connection = %conn, kind = %kind, code = ?e.code(), error = %e, "outbox message not routed");
            false
        }
    }
}
