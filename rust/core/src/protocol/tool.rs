// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Measurement request/response payloads.

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};

/// Measurement tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Distance,
    Properties,
}

impl ToolKind {
    /// Number of selected objects the tool operates on.
    pub fn selection_count(self) -> usize {
        match self {
            ToolKind::Distance => 2,
            ToolKind::Properties => 1,
        }
    }
}

/// TOOL_REQUEST payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool: ToolKind,
    /// Selected object identifiers, in selection order.
    pub ids: Vec<String>,
    /// Distance modifier: centroid-to-centroid instead of nearest points.
    #[serde(default)]
    pub center: bool,
}

impl ToolRequest {
    pub fn distance(a: impl Into<String>, b: impl Into<String>, center: bool) -> Self {
        Self {
            tool: ToolKind::Distance,
            ids: vec![a.into(), b.into()],
            center,
        }
    }

    pub fn properties(id: impl Into<String>) -> Self {
        Self {
            tool: ToolKind::Properties,
            ids: vec![id.into()],
            center: false,
        }
    }
}

/// How distance reference points were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    NearestPoint,
    Centroid,
}

/// Distance measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub mode: DistanceMode,
    /// Euclidean distance between the reference points.
    pub distance: f64,
    /// Signed `point2 - point1` per axis.
    pub delta: [f64; 3],
    pub point1: [f64; 3],
    pub point2: [f64; 3],
}

/// Shape-kind dependent properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeProperties {
    Vertex {
        position: [f64; 3],
    },
    Edge {
        length: f64,
        start: [f64; 3],
        end: [f64; 3],
    },
    Face {
        area: f64,
        center: [f64; 3],
        /// Present when the face is planar.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        normal: Option<[f64; 3]>,
    },
    Solid {
        volume: f64,
        area: f64,
        center: [f64; 3],
        bbox_min: [f64; 3],
        bbox_max: [f64; 3],
    },
}

impl ShapeProperties {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShapeProperties::Vertex { .. } => "vertex",
            ShapeProperties::Edge { .. } => "edge",
            ShapeProperties::Face { .. } => "face",
            ShapeProperties::Solid { .. } => "solid",
        }
    }
}

/// Properties measurement of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesResult {
    pub id: String,
    pub properties: ShapeProperties,
}

/// Successful measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measurement {
    Distance(DistanceResult),
    Properties(PropertiesResult),
}

/// Structured failure reported back to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub code: ErrorCode,
    pub message: String,
    /// Tool the failure belongs to, so clients can route it to a panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolKind>,
}

impl Failure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            tool: None,
        }
    }

    pub fn for_tool(mut self, tool: ToolKind) -> Self {
        self.tool = Some(tool);
        self
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { result: Measurement },
    Error { error: Failure },
}

/// TOOL_RESPONSE payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: ToolKind,
    pub outcome: ToolOutcome,
}

impl ToolResponse {
    pub fn ok(tool: ToolKind, result: Measurement) -> Self {
        Self {
            tool,
            outcome: ToolOutcome::Ok { result },
        }
    }

    pub fn failed(tool: ToolKind, failure: Failure) -> Self {
        Self {
            tool,
            outcome: ToolOutcome::Error {
                error: failure.for_tool(tool),
            },
        }
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        match &self.outcome {
            ToolOutcome::Ok { result } => Some(result),
            ToolOutcome::Error { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            ToolOutcome::Ok { .. } => None,
            ToolOutcome::Error { error } => Some(error),
        }
    }
}
