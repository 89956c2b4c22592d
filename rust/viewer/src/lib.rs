// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CADView-Lite Viewer
//!
//! Client-side state machine of a visualization peer. It owns the view
//! state (camera, clipping, outline, selection) independently of the render
//! objects, so scenes can be replaced without losing the user's view.
//!
//! Rendering itself sits behind [`RenderBackend`]; outbound traffic is
//! written to a `tokio` unbounded channel drained by the transport.

pub mod backend;
pub mod config;
pub mod error;
pub mod machine;
pub mod state;

pub use backend::RenderBackend;
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use machine::{Phase, ViewerStateMachine};
pub use state::ViewState;
