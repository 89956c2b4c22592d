// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kind-dependent shape properties.

use crate::error::{MeasureError, Result};
use crate::primitives::{Plane, Triangle};
use crate::shapes::{ShapeClass, WorldShape};
use cadview_core::ShapeProperties;
use nalgebra::{Point3, Vector3};

/// Volumes below this are treated as open surfaces.
const VOLUME_EPS: f64 = 1e-12;

/// Relative tolerance for the planarity test.
const PLANAR_TOLERANCE: f64 = 1e-6;

fn arr(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Compute the properties of `shape` according to its class.
pub fn shape_properties(shape: &WorldShape) -> Result<ShapeProperties> {
    if shape.is_empty() {
        return Err(MeasureError::EmptyShape(shape.id.clone()));
    }

    Ok(match shape.class {
        ShapeClass::Vertex => ShapeProperties::Vertex {
            position: arr(&vertex_position(shape)),
        },
        ShapeClass::Edge => {
            let (start, end) = match (shape.segments.first(), shape.segments.last()) {
                (Some(first), Some(last)) => (first.a, last.b),
                _ => {
                    let p = vertex_position(shape);
                    (p, p)
                }
            };
            ShapeProperties::Edge {
                length: shape.segments.iter().map(|s| s.length()).sum(),
                start: arr(&start),
                end: arr(&end),
            }
        }
        ShapeClass::Face => ShapeProperties::Face {
            area: surface_area(&shape.triangles),
            center: arr(&area_centroid(&shape.triangles)),
            normal: planar_normal(&shape.triangles).map(|n| [n.x, n.y, n.z]),
        },
        ShapeClass::Solid => {
            let (min, max) = bounds(shape);
            ShapeProperties::Solid {
                volume: enclosed_volume(&shape.triangles).abs(),
                area: surface_area(&shape.triangles),
                center: arr(&centroid(shape)),
                bbox_min: arr(&min),
                bbox_max: arr(&max),
            }
        }
    })
}

/// Reference point used by centroid distance and reported as `center`.
///
/// Solids use the volume centroid, falling back to the area centroid
/// for open meshes. Edges use the length-weighted midpoint.
pub fn centroid(shape: &WorldShape) -> Point3<f64> {
    match shape.class {
        ShapeClass::Solid => volume_centroid(&shape.triangles).unwrap_or_else(|| area_centroid(&shape.triangles)),
        ShapeClass::Face => area_centroid(&shape.triangles),
        ShapeClass::Edge if !shape.segments.is_empty() => {
            let total: f64 = shape.segments.iter().map(|s| s.length()).sum();
            if total > 0.0 {
                let sum = shape
                    .segments
                    .iter()
                    .fold(Vector3::zeros(), |acc, s| acc + s.midpoint().coords * s.length());
                Point3::from(sum / total)
            } else {
                shape.segments[0].a
            }
        }
        _ => vertex_position(shape),
    }
}

fn vertex_position(shape: &WorldShape) -> Point3<f64> {
    let n = shape.points.len().max(1) as f64;
    let sum = shape.points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / n)
}

pub fn surface_area(triangles: &[Triangle]) -> f64 {
    triangles.iter().map(|t| t.area()).sum()
}

/// Signed enclosed volume by the divergence theorem.
pub fn enclosed_volume(triangles: &[Triangle]) -> f64 {
    triangles.iter().map(|t| t.signed_volume()).sum()
}

fn area_centroid(triangles: &[Triangle]) -> Point3<f64> {
    let area = surface_area(triangles);
    if area <= 0.0 {
        let n = (triangles.len() * 3).max(1) as f64;
        let sum = triangles
            .iter()
            .fold(Vector3::zeros(), |acc, t| acc + t.v0.coords + t.v1.coords + t.v2.coords);
        return Point3::from(sum / n);
    }
    let sum = triangles
        .iter()
        .fold(Vector3::zeros(), |acc, t| acc + t.centroid().coords * t.area());
    Point3::from(sum / area)
}

fn volume_centroid(triangles: &[Triangle]) -> Option<Point3<f64>> {
    let volume = enclosed_volume(triangles);
    if volume.abs() <= VOLUME_EPS {
        return None;
    }
    // Tetrahedra against the origin: centroid is (v0 + v1 + v2) / 4
    let sum = triangles.iter().fold(Vector3::zeros(), |acc, t| {
        acc + (t.v0.coords + t.v1.coords + t.v2.coords) * (t.signed_volume() / 4.0)
    });
    Some(Point3::from(sum / volume))
}

/// Area-weighted normal when every vertex lies on one plane.
fn planar_normal(triangles: &[Triangle]) -> Option<Vector3<f64>> {
    let summed = triangles.iter().fold(Vector3::zeros(), |acc, t| acc + t.cross());
    if summed.norm_squared() <= f64::EPSILON {
        return None;
    }
    let plane = Plane::new(triangles.first()?.v0, summed);

    let scale = triangles
        .iter()
        .flat_map(|t| [t.v0, t.v1, t.v2])
        .map(|p| (p - plane.point).norm())
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let planar = triangles
        .iter()
        .flat_map(|t| [t.v0, t.v1, t.v2])
        .all(|p| plane.signed_distance(&p).abs() <= PLANAR_TOLERANCE * scale);

    planar.then_some(plane.normal)
}

fn bounds(shape: &WorldShape) -> (Point3<f64>, Point3<f64>) {
    let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
    let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
    let corners = shape
        .triangles
        .iter()
        .flat_map(|t| [t.v0, t.v1, t.v2])
        .chain(shape.segments.iter().flat_map(|s| [s.a, s.b]))
        .chain(shape.points.iter().copied());
    for p in corners {
        min = min.inf(&p);
        max = max.sup(&p);
    }
    (min, max)
}
