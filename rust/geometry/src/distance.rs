// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Distance between two placed shapes.
//!
//! Nearest-point mode is exact over the tessellation: for disjoint shapes
//! the closest pair is always realized vertex-to-triangle or
//! segment-to-segment (triangle sides included), and crossings are caught
//! by a segment-triangle intersection pass.

use crate::error::{MeasureError, Result};
use crate::primitives::{
    closest_point_on_triangle, closest_points_between_segments, segment_triangle_intersection,
    Segment, Triangle,
};
use crate::properties::centroid;
use crate::shapes::WorldShape;
use cadview_core::{DistanceMode, DistanceResult};
use nalgebra::Point3;
use rayon::prelude::*;

/// Candidate closest pair, first point on shape A.
#[derive(Debug, Clone, Copy)]
struct Pair {
    dist2: f64,
    a: Point3<f64>,
    b: Point3<f64>,
}

impl Pair {
    fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            dist2: (b - a).norm_squared(),
            a,
            b,
        }
    }

    fn closer(self, other: Pair) -> Pair {
        if other.dist2 < self.dist2 {
            other
        } else {
            self
        }
    }
}

/// Query form of a shape: every segment and sample point it contributes.
struct Probe<'a> {
    triangles: Vec<&'a Triangle>,
    segments: Vec<Segment>,
    points: Vec<Point3<f64>>,
}

impl<'a> Probe<'a> {
    fn new(shape: &'a WorldShape) -> Self {
        let triangles: Vec<&Triangle> = shape.triangles.iter().filter(|t| !t.is_degenerate()).collect();

        let mut segments = shape.segments.clone();
        segments.extend(shape.triangles.iter().flat_map(|t| t.edges()));
        segments.extend(shape.points.iter().map(|p| Segment::point(*p)));

        let mut points = shape.points.clone();
        points.extend(shape.segments.iter().flat_map(|s| [s.a, s.b]));
        points.extend(shape.triangles.iter().flat_map(|t| [t.v0, t.v1, t.v2]));

        Self {
            triangles,
            segments,
            points,
        }
    }
}

/// Measure the distance between `a` and `b`.
///
/// `point1` lies on `a`, `point2` on `b`, and `distance` is the norm of
/// `delta = point2 - point1`.
pub fn measure_distance(a: &WorldShape, b: &WorldShape, mode: DistanceMode) -> Result<DistanceResult> {
    for shape in [a, b] {
        if shape.is_empty() {
            return Err(MeasureError::EmptyShape(shape.id.clone()));
        }
    }

    let (p1, p2) = match mode {
        DistanceMode::Centroid => (centroid(a), centroid(b)),
        DistanceMode::NearestPoint => nearest_points(a, b),
    };

    let delta = p2 - p1;
    Ok(DistanceResult {
        mode,
        distance: delta.norm(),
        delta: [delta.x, delta.y, delta.z],
        point1: [p1.x, p1.y, p1.z],
        point2: [p2.x, p2.y, p2.z],
    })
}

/// Exact closest pair of points between two non-empty shapes.
fn nearest_points(a: &WorldShape, b: &WorldShape) -> (Point3<f64>, Point3<f64>) {
    let pa = Probe::new(a);
    let pb = Probe::new(b);

    let seed = Pair::new(pa.points[0], pb.points[0]);

    let edges = pa
        .segments
        .par_iter()
        .map(|sa| {
            pb.segments.iter().fold(seed, |best, sb| {
                let (x, y) = closest_points_between_segments(sa, sb);
                best.closer(Pair::new(x, y))
            })
        })
        .reduce(|| seed, Pair::closer);

    let a_onto_b = pa
        .points
        .par_iter()
        .map(|p| {
            pb.triangles
                .iter()
                .fold(seed, |best, t| best.closer(Pair::new(*p, closest_point_on_triangle(p, t))))
        })
        .reduce(|| seed, Pair::closer);

    let b_onto_a = pb
        .points
        .par_iter()
        .map(|p| {
            pa.triangles
                .iter()
                .fold(seed, |best, t| best.closer(Pair::new(closest_point_on_triangle(p, t), *p)))
        })
        .reduce(|| seed, Pair::closer);

    let best = edges.closer(a_onto_b).closer(b_onto_a);
    if best.dist2 == 0.0 {
        return (best.a, best.b);
    }

    match crossing(&pa, &pb) {
        Some(hit) => (hit, hit),
        None => (best.a, best.b),
    }
}

/// Any point where a side of one shape passes through a triangle of the other.
fn crossing(pa: &Probe<'_>, pb: &Probe<'_>) -> Option<Point3<f64>> {
    let hits = |segments: &[Segment], triangles: &[&Triangle]| {
        segments
            .par_iter()
            .find_map_any(|s| triangles.iter().find_map(|t| segment_triangle_intersection(s, t)))
    };
    hits(&pa.segments, &pb.triangles).or_else(|| hits(&pb.segments, &pa.triangles))
}
