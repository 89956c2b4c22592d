// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CADView-Lite Geometry
//!
//! Measurement tools over a decoded scene: world-space lookup of parts and
//! their faces, edges and vertices, exact nearest-point distance using
//! nalgebra, and shape properties. Pairwise searches run on rayon.

pub mod distance;
pub mod error;
pub mod measure;
pub mod primitives;
pub mod properties;
pub mod shapes;

// Re-export nalgebra types for convenience
pub use nalgebra::{Isometry3, Point3, Vector3};

pub use distance::measure_distance;
pub use error::{MeasureError, Result};
pub use measure::MeasurementEngine;
pub use primitives::{Plane, Segment, Triangle};
pub use properties::shape_properties;
pub use shapes::{ShapeClass, ShapeIndex, WorldShape};
