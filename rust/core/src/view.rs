// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client-owned view state that travels in STATE_DELTA messages.

use serde::{Deserialize, Serialize};

/// Camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub zoom: f64,
    pub position: [f64; 3],
    /// Orientation quaternion `[x, y, z, w]`.
    pub quaternion: [f64; 4],
    pub target: [f64; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            position: [1.0, 1.0, 1.0],
            quaternion: [0.0, 0.0, 0.0, 1.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Clipping planes, one per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clipping {
    /// Slider offset per plane.
    pub sliders: [f64; 3],
    /// Plane normal per plane.
    pub normals: [[f64; 3]; 3],
    /// Clip to the intersection of the planes instead of their union.
    pub intersection: bool,
}

impl Default for Clipping {
    fn default() -> Self {
        Self {
            sliders: [0.0; 3],
            normals: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
            intersection: false,
        }
    }
}

/// Outline tree state of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineState {
    pub shown: bool,
    pub expanded: bool,
}

impl From<crate::scene::Visibility> for OutlineState {
    fn from(v: crate::scene::Visibility) -> Self {
        Self {
            shown: v.shown,
            expanded: v.expanded,
        }
    }
}
