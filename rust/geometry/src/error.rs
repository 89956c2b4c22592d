// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cadview_core::{ErrorCode, ToolKind};
use thiserror::Error;

/// Result type for measurement operations
pub type Result<T> = std::result::Result<T, MeasureError>;

/// Errors that can occur while answering a tool request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("{tool:?} needs exactly {expected} selected object(s), got {got}")]
    InvalidSelectionCount {
        tool: ToolKind,
        expected: usize,
        got: usize,
    },

    #[error("Object '{0}' not found in the current scene")]
    UnknownObjectReference(String),

    #[error("Object '{0}' has no measurable geometry")]
    EmptyShape(String),
}

impl MeasureError {
    /// Taxonomy code carried in the TOOL_RESPONSE failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeasureError::InvalidSelectionCount { .. } => ErrorCode::InvalidSelectionCount,
            MeasureError::UnknownObjectReference(_) | MeasureError::EmptyShape(_) => {
                ErrorCode::UnknownObjectReference
            }
        }
    }
}
