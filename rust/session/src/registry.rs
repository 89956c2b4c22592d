// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session registry: peer membership and message routing.
//!
//! Each session has at most one computation peer and any number of
//! visualization peers. Producer traffic fans out to every visualization
//! peer; interaction traffic goes to the computation peer, or waits in the
//! session's pending queue until one registers.

use crate::error::{Result, RoutingError};
use crate::sink::{DeliveryError, PeerSink};
use cadview_core::{Command, Frame, Message, MessageKind, Role, StateDelta};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Key of one logical viewing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Registry-assigned id of one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a routed message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    AllVisualization,
    Computation,
    Connection(ConnectionId),
}

impl Destination {
    /// Destination class of `kind` sent by a `role` peer.
    ///
    /// REGISTER never routes; it is handled by [`SessionRegistry::register`].
    pub fn for_message(role: Role, kind: MessageKind) -> Result<Self> {
        use MessageKind::*;
        match (role, kind) {
            (Role::Computation, Scene | Command | Config | ToolResponse) => Ok(Destination::AllVisualization),
            (Role::Visualization, StateDelta | ToolRequest | Config) => Ok(Destination::Computation),
            _ => Err(RoutingError::Misdirected { kind, role }),
        }
    }
}

/// Outcome of a successful [`SessionRegistry::route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    pub destination: Destination,
    /// Peers the frame was handed to.
    pub delivered: usize,
}

/// Registry limits.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Upper bound of messages held per session while no computation peer
    /// is registered.
    pub max_pending: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_pending: 64 }
    }
}

/// Per-session statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub session: SessionId,
    pub computation: bool,
    pub visualization: usize,
    pub has_scene: bool,
    pub pending: usize,
}

struct Session<S> {
    computation: Option<(ConnectionId, S)>,
    visualization: BTreeMap<ConnectionId, S>,
    /// Only replay buffer: the most recent SCENE.
    last_scene: Option<Arc<Frame>>,
    pending: VecDeque<Arc<Frame>>,
    status: StateDelta,
}

impl<S> Session<S> {
    fn new() -> Self {
        Self {
            computation: None,
            visualization: BTreeMap::new(),
            last_scene: None,
            pending: VecDeque::new(),
            status: StateDelta::default(),
        }
    }

    fn is_idle(&self) -> bool {
        self.computation.is_none() && self.visualization.is_empty() && self.pending.is_empty()
    }

    fn sink(&self, conn: ConnectionId) -> Option<&S> {
        match &self.computation {
            Some((id, sink)) if *id == conn => Some(sink),
            _ => self.visualization.get(&conn),
        }
    }
}

struct Inner<S> {
    sessions: FxHashMap<SessionId, Session<S>>,
    connections: FxHashMap<ConnectionId, (SessionId, Role)>,
}

/// Thread-safe registry shared by all connection tasks.
pub struct SessionRegistry<S: PeerSink> {
    inner: Mutex<Inner<S>>,
    config: RegistryConfig,
    next_id: AtomicU64,
}

impl<S: PeerSink> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl<S: PeerSink> SessionRegistry<S> {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: FxHashMap::default(),
                connections: FxHashMap::default(),
            }),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new transport connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // Poisoning only means another task panicked mid-update; the maps
    // themselves stay consistent between statements.
    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach `conn` to `session` in `role`.
    ///
    /// A visualization peer immediately receives the last SCENE; a
    /// computation peer receives every pending message in arrival order.
    /// A connection that registers again is moved; a rejected REGISTER
    /// leaves its current membership untouched. Returns the number of
    /// catch-up frames delivered.
    pub fn register(&self, session: &SessionId, conn: ConnectionId, role: Role, sink: S) -> Result<usize> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if role == Role::Computation {
            let holder = inner.sessions.get(session).and_then(|s| s.computation.as_ref());
            if let Some((existing, current)) = holder {
                if *existing != conn && !current.is_closed() {
                    tracing::warn!(session = %session, connection = %conn, active = %existing, "computation role already taken");
                    return Err(RoutingError::RoleConflict(session.clone()));
                }
            }
        }

        let previous = remove_membership(inner, conn).map(|(id, _)| id);

        let entry = inner.sessions.entry(session.clone()).or_insert_with(|| {
            tracing::info!(session = %session, "session opened");
            Session::new()
        });

        // Catch-up is handed over under the lock so that later traffic
        // cannot overtake it.
        let (delivered, refused) = match role {
            Role::Computation => {
                if let Some((stale, _)) = entry.computation.take() {
                    tracing::debug!(session = %session, connection = %stale, "replacing stale computation peer");
                    inner.connections.remove(&stale);
                }
                entry.computation = Some((conn, sink.clone()));
                flush_pending(entry, &sink)
            }
            Role::Visualization => {
                entry.visualization.insert(conn, sink.clone());
                match &entry.last_scene {
                    Some(frame) => match sink.deliver(frame.clone()) {
                        Ok(()) => (1, None),
                        Err(e) => (0, Some(e)),
                    },
                    None => (0, None),
                }
            }
        };
        inner.connections.insert(conn, (session.clone(), role));
        tracing::debug!(session = %session, connection = %conn, role = %role, catch_up = delivered, "peer registered");

        match refused {
            Some(DeliveryError::Full) => {
                tracing::warn!(session = %session, connection = %conn, "catch-up interrupted, queue full");
            }
            Some(DeliveryError::Closed) => {
                detach(inner, conn);
            }
            None => {}
        }
        if let Some(previous) = previous.filter(|id| id != session) {
            prune(inner, &previous);
        }
        Ok(delivered)
    }

    /// Route `message` from `conn` to its destination peers.
    ///
    /// Interaction traffic without a computation peer is retained and
    /// reported as [`RoutingError::NoComputationPeer`]. STATE_DELTA traffic
    /// is merged into the session status, which a `status` command from
    /// the computation peer reads back.
    pub fn route(&self, conn: ConnectionId, message: Message) -> Result<Routed> {
        let kind = message.kind();

        let (destination, frame, targets) = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            let (session_id, role) = inner
                .connections
                .get(&conn)
                .cloned()
                .ok_or(RoutingError::NotRegistered(conn))?;
            let mut destination = Destination::for_message(role, kind)?;
            let session = inner
                .sessions
                .get_mut(&session_id)
                .ok_or(RoutingError::NotRegistered(conn))?;

            let message = match message {
                Message::StateDelta(delta) => {
                    session.status.merge(&delta);
                    Message::StateDelta(delta)
                }
                Message::Command(Command::Status) => {
                    destination = Destination::Connection(conn);
                    Message::StateDelta(session.status.clone())
                }
                other => other,
            };

            let frame = Arc::new(Frame::Message(message));
            let targets: Vec<(ConnectionId, S)> = match destination {
                Destination::AllVisualization => {
                    if kind == MessageKind::Scene {
                        session.last_scene = Some(frame.clone());
                    }
                    session.visualization.iter().map(|(id, s)| (*id, s.clone())).collect()
                }
                Destination::Computation => match &session.computation {
                    Some((id, sink)) if session.pending.is_empty() => vec![(*id, sink.clone())],
                    Some((id, sink)) => {
                        // Earlier refused frames keep their place ahead of this one.
                        let (id, sink) = (*id, sink.clone());
                        self.retain(&session_id, session, frame);
                        let (flushed, refused) = flush_pending(session, &sink);
                        if refused == Some(DeliveryError::Closed) {
                            detach(inner, id);
                        }
                        tracing::trace!(connection = %conn, kind = %kind, flushed, "pending messages flushed");
                        return Ok(Routed {
                            destination,
                            delivered: usize::from(refused.is_none()),
                        });
                    }
                    None => {
                        self.retain(&session_id, session, frame);
                        return Err(RoutingError::NoComputationPeer(session_id));
                    }
                },
                Destination::Connection(id) => session.sink(id).map(|s| (id, s.clone())).into_iter().collect(),
            };
            (destination, frame, targets)
        };

        let delivered = self.deliver_all(&targets, &frame);
        tracing::trace!(connection = %conn, kind = %kind, delivered, "message routed");
        Ok(Routed { destination, delivered })
    }

    fn retain(&self, session_id: &SessionId, session: &mut Session<S>, frame: Arc<Frame>) {
        if self.config.max_pending == 0 {
            return;
        }
        while session.pending.len() >= self.config.max_pending {
            session.pending.pop_front();
            tracing::warn!(session = %session_id, limit = self.config.max_pending, "pending queue full, dropped oldest message");
        }
        session.pending.push_back(frame);
    }

    /// Deliver outside the lock; closed peers are unregistered afterwards.
    fn deliver_all(&self, targets: &[(ConnectionId, S)], frame: &Arc<Frame>) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sink) in targets {
            match sink.deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Full) => {
                    tracing::warn!(connection = %id, "peer queue full, frame dropped");
                }
                Err(DeliveryError::Closed) => closed.push(*id),
            }
        }
        for id in closed {
            self.unregister(id);
        }
        delivered
    }

    /// Detach `conn` from its session. Idle sessions are destroyed.
    pub fn unregister(&self, conn: ConnectionId) -> Option<(SessionId, Role)> {
        detach(&mut self.lock(), conn)
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Merged view state reported by the session's visualization peers.
    pub fn status(&self, session: &SessionId) -> Option<StateDelta> {
        self.lock().sessions.get(session).map(|s| s.status.clone())
    }

    /// Statistics for every live session, ordered by id.
    pub fn snapshot(&self) -> Vec<SessionStats> {
        let inner = self.lock();
        let mut stats: Vec<SessionStats> = inner
            .sessions
            .iter()
            .map(|(id, s)| SessionStats {
                session: id.clone(),
                computation: s.computation.is_some(),
                visualization: s.visualization.len(),
                has_scene: s.last_scene.is_some(),
                pending: s.pending.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.session.cmp(&b.session));
        stats
    }
}

fn detach<S>(inner: &mut Inner<S>, conn: ConnectionId) -> Option<(SessionId, Role)> {
    let detached = remove_membership(inner, conn)?;
    prune(inner, &detached.0);
    Some(detached)
}

fn remove_membership<S>(inner: &mut Inner<S>, conn: ConnectionId) -> Option<(SessionId, Role)> {
    let (session_id, role) = inner.connections.remove(&conn)?;
    if let Some(session) = inner.sessions.get_mut(&session_id) {
        match role {
            Role::Computation => {
                if matches!(session.computation, Some((id, _)) if id == conn) {
                    session.computation = None;
                }
            }
            Role::Visualization => {
                session.visualization.remove(&conn);
            }
        }
        tracing::debug!(session = %session_id, connection = %conn, role = %role, "peer unregistered");
    }
    Some((session_id, role))
}

/// Destroy `session_id` once it has no peers and nothing pending.
fn prune<S>(inner: &mut Inner<S>, session_id: &SessionId) {
    if inner.sessions.get(session_id).is_some_and(|s| s.is_idle()) {
        inner.sessions.remove(session_id);
        tracing::info!(session = %session_id, "session closed");
    }
}

/// Hand pending frames to `sink` in arrival order. The first refused
/// frame and everything after it stay queued.
fn flush_pending<S: PeerSink>(session: &mut Session<S>, sink: &S) -> (usize, Option<DeliveryError>) {
    let mut delivered = 0;
    while let Some(frame) = session.pending.pop_front() {
        if let Err(e) = sink.deliver(frame.clone()) {
            session.pending.push_front(frame);
            return (delivered, Some(e));
        }
        delivered += 1;
    }
    (delivered, None)
}
