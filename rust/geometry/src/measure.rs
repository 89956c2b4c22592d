// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tool request dispatch.
//!
//! The engine is owned by the computation side. It indexes the last scene
//! it published and answers every TOOL_REQUEST with a TOOL_RESPONSE, never
//! with a bare error.

use crate::distance::measure_distance;
use crate::error::{MeasureError, Result};
use crate::properties::shape_properties;
use crate::shapes::ShapeIndex;
use cadview_core::{
    DistanceMode, Failure, Measurement, Message, PropertiesResult, Scene, ToolKind, ToolRequest,
    ToolResponse,
};

/// Answers measurement requests against the current scene.
#[derive(Default)]
pub struct MeasurementEngine {
    index: Option<ShapeIndex>,
}

impl MeasurementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the indexed scene.
    pub fn load(&mut self, scene: &Scene) {
        let index = ShapeIndex::from_scene(scene);
        tracing::debug!(leaves = index.len(), "measurement index rebuilt");
        self.index = Some(index);
    }

    pub fn clear(&mut self) {
        self.index = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Computation-side handling of channel traffic.
    ///
    /// A published SCENE replaces the index and a TOOL_REQUEST yields the
    /// TOOL_RESPONSE to route back. Everything else is ignored.
    pub fn respond(&mut self, message: &Message) -> Option<Message> {
        match message {
            Message::Scene(payload) => {
                match Scene::decode(payload) {
                    Ok(scene) => self.load(&scene),
                    Err(e) => {
                        tracing::warn!(error = %e, "published scene could not be indexed");
                        self.clear();
                    }
                }
                None
            }
            Message::ToolRequest(request) => Some(Message::ToolResponse(self.handle(request))),
            _ => None,
        }
    }

    /// Answer `request`. Failures are carried inside the response.
    pub fn handle(&self, request: &ToolRequest) -> ToolResponse {
        match self.measure(request) {
            Ok(result) => ToolResponse::ok(request.tool, result),
            Err(err) => {
                tracing::debug!(tool = ?request.tool, error = %err, "measurement failed");
                ToolResponse::failed(request.tool, Failure::new(err.code(), err.to_string()))
            }
        }
    }

    /// Run `request`, checking the selection count before any lookup.
    pub fn measure(&self, request: &ToolRequest) -> Result<Measurement> {
        let expected = request.tool.selection_count();
        if request.ids.len() != expected {
            return Err(MeasureError::InvalidSelectionCount {
                tool: request.tool,
                expected,
                got: request.ids.len(),
            });
        }

        let index = self
            .index
            .as_ref()
            .ok_or_else(|| MeasureError::UnknownObjectReference(request.ids[0].clone()))?;

        match request.tool {
            ToolKind::Distance => {
                let a = index.resolve(&request.ids[0])?;
                let b = index.resolve(&request.ids[1])?;
                let mode = if request.center {
                    DistanceMode::Centroid
                } else {
                    DistanceMode::NearestPoint
                };
                Ok(Measurement::Distance(measure_distance(&a, &b, mode)?))
            }
            ToolKind::Properties => {
                let id = &request.ids[0];
                let shape = index.resolve(id)?;
                Ok(Measurement::Properties(PropertiesResult {
                    id: id.clone(),
                    properties: shape_properties(&shape)?,
                }))
            }
        }
    }
}
