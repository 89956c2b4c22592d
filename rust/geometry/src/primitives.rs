// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World-space primitives and exact closest-point queries.

use nalgebra::{Point3, Vector3};

/// Squared lengths below this are treated as degenerate.
const DEGENERATE_EPS: f64 = 1e-18;

/// Plane through a point
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector (normalized)
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from point to plane, positive in front
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }
}

/// Line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point3<f64>,
    pub b: Point3<f64>,
}

impl Segment {
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self { a, b }
    }

    /// Zero-length segment standing in for an isolated point.
    pub fn point(p: Point3<f64>) -> Self {
        Self { a: p, b: p }
    }

    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.a, &self.b)
    }
}

/// Triangle definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized normal, twice the area in length.
    #[inline]
    pub fn cross(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Calculate triangle normal
    pub fn normal(&self) -> Vector3<f64> {
        self.cross().normalize()
    }

    /// Calculate triangle area
    pub fn area(&self) -> f64 {
        self.cross().norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.cross().norm_squared() <= DEGENERATE_EPS
    }

    pub fn edges(&self) -> [Segment; 3] {
        [
            Segment::new(self.v0, self.v1),
            Segment::new(self.v1, self.v2),
            Segment::new(self.v2, self.v0),
        ]
    }

    /// Signed volume of the tetrahedron spanned with the origin.
    #[inline]
    pub fn signed_volume(&self) -> f64 {
        self.v0.coords.dot(&self.v1.coords.cross(&self.v2.coords)) / 6.0
    }
}

/// Closest point on segment `s` to `p`.
pub fn closest_point_on_segment(p: &Point3<f64>, s: &Segment) -> Point3<f64> {
    let ab = s.b - s.a;
    let len2 = ab.norm_squared();
    if len2 <= DEGENERATE_EPS {
        return s.a;
    }
    let t = ((p - s.a).dot(&ab) / len2).clamp(0.0, 1.0);
    s.a + ab * t
}

/// Closest pair of points between two segments, first on `s1`.
///
/// Degenerate segments collapse to point queries.
pub fn closest_points_between_segments(s1: &Segment, s2: &Segment) -> (Point3<f64>, Point3<f64>) {
    let d1 = s1.b - s1.a;
    let d2 = s2.b - s2.a;
    let r = s1.a - s2.a;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    if a <= DEGENERATE_EPS && e <= DEGENERATE_EPS {
        return (s1.a, s2.a);
    }

    let (s, t) = if a <= DEGENERATE_EPS {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= DEGENERATE_EPS {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, start from s1.a
            let s = if denom.abs() > DEGENERATE_EPS {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (s1.a + d1 * s, s2.a + d2 * t)
}

/// Closest point on triangle `tri` to `p`, by Voronoi region.
///
/// `tri` must not be degenerate.
pub fn closest_point_on_triangle(p: &Point3<f64>, tri: &Triangle) -> Point3<f64> {
    let (a, b, c) = (tri.v0, tri.v1, tri.v2);
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Point where segment `s` crosses triangle `tri`, if it does.
pub fn segment_triangle_intersection(s: &Segment, tri: &Triangle) -> Option<Point3<f64>> {
    let dir = s.b - s.a;
    let e1 = tri.v1 - tri.v0;
    let e2 = tri.v2 - tri.v0;
    let h = dir.cross(&e2);
    let det = e1.dot(&h);
    if det.abs() <= DEGENERATE_EPS {
        return None;
    }
    let inv = 1.0 / det;
    let sv = s.a - tri.v0;
    let u = inv * sv.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = sv.cross(&e1);
    let v = inv * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv * e2.dot(&q);
    (0.0..=1.0).contains(&t).then(|| s.a + dir * t)
}
