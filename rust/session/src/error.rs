// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::{ConnectionId, SessionId};
use cadview_core::{ErrorCode, Failure, MessageKind, Role};
use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Routing failures. All of them are reported to the originating peer and
/// leave the registry intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Session '{0}' already has a computation peer")]
    RoleConflict(SessionId),

    /// The message was retained and will be delivered once a computation
    /// peer registers.
    #[error("Session '{0}' has no computation peer; message queued")]
    NoComputationPeer(SessionId),

    #[error("{kind} is not accepted from a {role} peer")]
    Misdirected { kind: MessageKind, role: Role },

    #[error("Connection {0} is not registered to a session")]
    NotRegistered(ConnectionId),
}

impl RoutingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RoutingError::RoleConflict(_) => ErrorCode::RoleConflict,
            RoutingError::NoComputationPeer(_) => ErrorCode::NoComputationPeer,
            RoutingError::Misdirected { .. } => ErrorCode::Misdirected,
            RoutingError::NotRegistered(_) => ErrorCode::NotRegistered,
        }
    }

    /// Failure notice for the `E:` frame sent back to the origin.
    pub fn to_failure(&self) -> Failure {
        Failure::new(self.code(), self.to_string())
    }
}
