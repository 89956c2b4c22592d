// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cadview_core::{ErrorCode, MessageKind};
use thiserror::Error;

/// Result type for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Errors raised by the viewer state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Scene decode failed: {0}")]
    Decode(#[from] cadview_core::Error),

    #[error("Invalid config value for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Part '{0}' is not in the current scene")]
    UnknownPart(String),

    #[error("Clipping axis {0} out of range (0..3)")]
    InvalidAxis(usize),

    #[error("{0} is not handled by a viewer")]
    UnexpectedMessage(MessageKind),

    #[error("Outbox closed; the transport is gone")]
    OutboxClosed,

    #[error("Renderer error: {0}")]
    Backend(String),
}

impl ViewerError {
    /// Protocol code, for errors caused by inbound traffic.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ViewerError::Decode(e) => Some(e.code()),
            ViewerError::InvalidConfig { .. } => Some(ErrorCode::MalformedPayload),
            ViewerError::UnexpectedMessage(_) => Some(ErrorCode::Misdirected),
            ViewerError::UnknownPart(_) => Some(ErrorCode::UnknownObjectReference),
            ViewerError::InvalidAxis(_) | ViewerError::OutboxClosed | ViewerError::Backend(_) => None,
        }
    }
}
