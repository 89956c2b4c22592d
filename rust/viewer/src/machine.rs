// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene lifecycle of one visualization peer.
//!
//! ```text
//! Empty ──scene──► Disposing ──build ok──► Rendering
//!   ▲                  │  ▲                    │
//!   └───build failed───┘  └───────scene────────┘
//! ```
//!
//! Every new scene tears the previous one down (animation stopped, render
//! resources disposed, object tree dropped) before the next is built. The
//! [`ViewState`] lives outside the render objects and is carried over.

use crate::backend::RenderBackend;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::state::ViewState;
use cadview_core::{
    Camera, Clipping, Command, ConfigPatch, Failure, Message, Scene, StateDelta, ToolKind,
    ToolOutcome, ToolRequest, ToolResponse,
};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::mpsc::UnboundedSender;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No scene loaded
    Empty,
    /// Scene built, view state live
    Rendering,
    /// Teardown of the previous scene in progress
    Disposing,
}

/// Viewer driven by inbound messages and local interaction.
///
/// Interactions update the persisted [`ViewState`] and write the matching
/// STATE_DELTA (or TOOL_REQUEST) into the outbox.
pub struct ViewerStateMachine<R: RenderBackend> {
    backend: R,
    phase: Phase,
    scene: Option<Scene>,
    queue: VecDeque<Scene>,
    view: ViewState,
    config: ViewerConfig,
    size: Option<(u32, u32)>,
    measurements: BTreeMap<ToolKind, ToolOutcome>,
    outbox: UnboundedSender<Message>,
}

impl<R: RenderBackend> ViewerStateMachine<R> {
    pub fn new(backend: R, config: ViewerConfig, outbox: UnboundedSender<Message>) -> Self {
        Self {
            backend,
            phase: Phase::Empty,
            scene: None,
            queue: VecDeque::new(),
            view: ViewState::default(),
            config,
            size: None,
            measurements: BTreeMap::new(),
            outbox,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut R {
        &mut self.backend
    }

    /// Latest outcome shown for `tool` in the current scene.
    pub fn measurement(&self, tool: ToolKind) -> Option<&ToolOutcome> {
        self.measurements.get(&tool)
    }

    pub fn queued_scenes(&self) -> usize {
        self.queue.len()
    }

    /// Dispatch an inbound message.
    pub fn handle(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Scene(payload) => {
                let scene = Scene::decode(&payload)?;
                self.receive_scene(scene)
            }
            Message::Command(Command::ResetCamera) => self.reset_camera(),
            Message::Command(Command::Screenshot { filename }) => {
                if self.phase == Phase::Rendering {
                    self.backend.screenshot(&filename);
                } else {
                    tracing::debug!(filename = %filename, "screenshot skipped, nothing rendered");
                }
                Ok(())
            }
            Message::Config(patch) => self.apply_config(&patch),
            Message::ToolResponse(response) => {
                self.show_tool_response(response);
                Ok(())
            }
            other => Err(ViewerError::UnexpectedMessage(other.kind())),
        }
    }

    /// Show a routing failure. Tool failures land in the tool's panel.
    pub fn handle_failure(&mut self, failure: &Failure) {
        match failure.tool {
            Some(tool) => self.show_tool_response(ToolResponse::failed(tool, failure.clone())),
            None => {
                tracing::warn!(code = ?failure.code, message = %failure.message, "peer reported a failure")
            }
        }
    }

    fn show_tool_response(&mut self, response: ToolResponse) {
        if self.phase == Phase::Rendering {
            self.backend.show_measurement(response.tool, &response.outcome);
        }
        self.measurements.insert(response.tool, response.outcome);
    }

    /// Queue `scene` without applying it.
    pub fn queue_scene(&mut self, scene: Scene) {
        self.queue.push_back(scene);
    }

    /// Queue `scene` and apply everything queued.
    pub fn receive_scene(&mut self, scene: Scene) -> Result<()> {
        self.queue_scene(scene);
        self.pump()
    }

    /// Apply queued scenes one at a time, in arrival order.
    ///
    /// Stops at the first failed build; later scenes stay queued.
    pub fn pump(&mut self) -> Result<()> {
        while let Some(scene) = self.queue.pop_front() {
            self.transition(scene)?;
        }
        Ok(())
    }

    fn transition(&mut self, scene: Scene) -> Result<()> {
        let previous = self.phase;
        self.phase = Phase::Disposing;

        if previous == Phase::Rendering {
            self.backend.stop_animation();
            self.backend.dispose();
        }
        self.scene = None;
        self.measurements.clear();

        if let Some(patch) = &scene.config {
            if let Err(e) = self.config.apply_patch(patch) {
                tracing::warn!(error = %e, "ignoring config carried by scene");
            }
        }

        // Outline state is reconciled only against a scene that rendered.
        let mut view = self.view.clone();
        view.reconcile(&scene);

        if let Err(e) = self.backend.build(&scene, &self.config) {
            tracing::error!(error = %e, "scene build failed");
            self.backend.dispose();
            self.phase = Phase::Empty;
            return Err(e);
        }

        self.view = view;
        self.scene = Some(scene);
        self.backend.apply_view(&self.view);
        if let Some((width, height)) = self.size {
            self.backend.resize(width, height);
        }
        self.backend.start_animation();
        self.phase = Phase::Rendering;
        tracing::debug!(parts = self.view.outline.len(), "scene rendered");
        Ok(())
    }

    /// Record the viewport size; forwarded only while rendering.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
        if self.phase == Phase::Rendering {
            self.backend.resize(width, height);
        }
    }

    /// Merge a CONFIG patch; render objects are touched only while rendering.
    pub fn apply_config(&mut self, patch: &ConfigPatch) -> Result<()> {
        self.config.apply_patch(patch)?;
        if self.phase == Phase::Rendering {
            self.backend.apply_config(&self.config);
        }
        Ok(())
    }

    pub fn set_camera(&mut self, camera: Camera) -> Result<()> {
        self.view.camera = Some(camera);
        self.emit(StateDelta {
            camera: Some(camera),
            ..StateDelta::default()
        })
    }

    /// Back to the default camera; the same as the user pressing reset.
    pub fn reset_camera(&mut self) -> Result<()> {
        let camera = Camera::default();
        self.view.camera = Some(camera);
        self.refresh_view();
        self.emit(StateDelta {
            camera: Some(camera),
            ..StateDelta::default()
        })
    }

    pub fn set_clipping(&mut self, clipping: Clipping) -> Result<()> {
        self.view.clipping = clipping;
        self.refresh_view();
        self.emit(StateDelta {
            clipping: Some(clipping),
            ..StateDelta::default()
        })
    }

    pub fn set_clipping_slider(&mut self, axis: usize, value: f64) -> Result<()> {
        let mut clipping = self.view.clipping;
        *clipping.sliders.get_mut(axis).ok_or(ViewerError::InvalidAxis(axis))? = value;
        self.set_clipping(clipping)
    }

    pub fn set_clipping_normal(&mut self, axis: usize, normal: [f64; 3]) -> Result<()> {
        let mut clipping = self.view.clipping;
        *clipping.normals.get_mut(axis).ok_or(ViewerError::InvalidAxis(axis))? = normal;
        self.set_clipping(clipping)
    }

    pub fn set_clipping_intersection(&mut self, intersection: bool) -> Result<()> {
        let mut clipping = self.view.clipping;
        clipping.intersection = intersection;
        self.set_clipping(clipping)
    }

    pub fn toggle_shown(&mut self, id: &str) -> Result<()> {
        self.update_outline(id, |state| state.shown = !state.shown)
    }

    pub fn toggle_expanded(&mut self, id: &str) -> Result<()> {
        self.update_outline(id, |state| state.expanded = !state.expanded)
    }

    fn update_outline(&mut self, id: &str, change: impl FnOnce(&mut cadview_core::OutlineState)) -> Result<()> {
        let state = self
            .view
            .outline
            .get_mut(id)
            .ok_or_else(|| ViewerError::UnknownPart(id.to_string()))?;
        change(state);
        let state = *state;
        self.refresh_view();

        let mut delta = StateDelta::default();
        delta.states.insert(id.to_string(), state);
        self.emit(delta)
    }

    /// Replace the selection. Every id must be in the current scene.
    pub fn select(&mut self, ids: Vec<String>) -> Result<()> {
        if let Some(unknown) = ids.iter().find(|id| !self.view.outline.contains_key(*id)) {
            return Err(ViewerError::UnknownPart(unknown.clone()));
        }
        self.view.selected = ids.clone();
        self.refresh_view();
        self.emit(StateDelta {
            selected: Some(ids),
            ..StateDelta::default()
        })
    }

    /// Ask the computation peer to run a measurement tool.
    pub fn request_tool(&mut self, request: ToolRequest) -> Result<()> {
        self.send(Message::ToolRequest(request))
    }

    fn refresh_view(&mut self) {
        if self.phase == Phase::Rendering {
            self.backend.apply_view(&self.view);
        }
    }

    fn emit(&self, delta: StateDelta) -> Result<()> {
        self.send(Message::StateDelta(delta))
    }

    fn send(&self, message: Message) -> Result<()> {
        self.outbox.send(message).map_err(|_| ViewerError::OutboxClosed)
    }
}
