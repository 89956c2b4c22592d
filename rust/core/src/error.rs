// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for codec and framing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding geometry buffers or wire frames.
///
/// All of these are connection-local: the offending frame is dropped and the
/// connection stays open.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    #[error("Malformed payload for {kind}: {reason}")]
    MalformedPayload { kind: &'static str, reason: String },

    #[error("Unknown message type {0:?}")]
    UnknownMessageType(String),

    #[error("Shape reference {index} is outside the instance table (len {table_len})")]
    DanglingReference { index: usize, table_len: usize },
}

impl Error {
    /// Taxonomy code reported to peers and diagnostics.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::MalformedBuffer(_) => ErrorCode::MalformedBuffer,
            Error::MalformedPayload { .. } | Error::DanglingReference { .. } => {
                ErrorCode::MalformedPayload
            }
            Error::UnknownMessageType(_) => ErrorCode::UnknownMessageType,
        }
    }

    pub(crate) fn buffer(reason: impl Into<String>) -> Self {
        Error::MalformedBuffer(reason.into())
    }
}

/// Protocol-wide error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    MalformedBuffer,
    MalformedPayload,
    UnknownMessageType,
    RoleConflict,
    NoComputationPeer,
    InvalidSelectionCount,
    UnknownObjectReference,
    /// A message kind sent in a direction the protocol does not allow.
    Misdirected,
    /// A non-REGISTER message from a connection that never registered.
    NotRegistered,
}

impl ErrorCode {
    /// Framing and codec errors never leave the connection they occurred on.
    pub fn is_connection_local(self) -> bool {
        matches!(
            self,
            ErrorCode::MalformedBuffer | ErrorCode::MalformedPayload | ErrorCode::UnknownMessageType
        )
    }
}
