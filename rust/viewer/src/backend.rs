// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Renderer seam.

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::state::ViewState;
use cadview_core::{Scene, ToolKind, ToolOutcome};

/// Opaque consumer of decoded scenes.
///
/// The state machine only calls render-object methods while a scene is
/// rendering; `stop_animation` and `dispose` are called once per replaced
/// scene, before the next `build`.
pub trait RenderBackend {
    fn build(&mut self, scene: &Scene, config: &ViewerConfig) -> Result<()>;

    fn apply_view(&mut self, view: &ViewState);

    fn start_animation(&mut self);

    fn stop_animation(&mut self);

    /// Release every render resource of the current scene.
    fn dispose(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    fn apply_config(&mut self, config: &ViewerConfig);

    fn show_measurement(&mut self, tool: ToolKind, outcome: &ToolOutcome);

    fn screenshot(&mut self, filename: &str);
}
