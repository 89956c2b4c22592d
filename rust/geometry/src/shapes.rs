// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object lookup: maps selectable ids to world-space geometry.
//!
//! Selectable ids are leaf part ids plus sub-shape ids derived from them:
//!
//! - `<part>/faces/faces_<i>`: the i-th face group of the part
//! - `<part>/edges/edges_<i>`: the i-th edge group
//! - `<part>/vertices/vertex_<i>`: the i-th vertex

use crate::error::{MeasureError, Result};
use crate::primitives::{Segment, Triangle};
use cadview_core::{Instance, Scene, Transform};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Topological class of a resolved object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeClass {
    Solid,
    Face,
    Edge,
    Vertex,
}

/// Geometry of one selectable object, placed in world space.
#[derive(Debug, Clone)]
pub struct WorldShape {
    pub id: String,
    pub class: ShapeClass,
    pub triangles: Vec<Triangle>,
    pub segments: Vec<Segment>,
    pub points: Vec<Point3<f64>>,
}

impl WorldShape {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.segments.is_empty() && self.points.is_empty()
    }
}

/// Convert a part transform to an isometry.
///
/// A zero quaternion falls back to no rotation.
pub fn isometry(transform: &Transform) -> Isometry3<f64> {
    let [x, y, z, w] = transform.rotation;
    let q = Quaternion::new(w, x, y, z);
    let rotation = if q.norm_squared() > f64::EPSILON {
        UnitQuaternion::from_quaternion(q)
    } else {
        UnitQuaternion::identity()
    };
    let [tx, ty, tz] = transform.translation;
    Isometry3::from_parts(Translation3::new(tx, ty, tz), rotation)
}

struct Leaf {
    instance: Arc<Instance>,
    placement: Isometry3<f64>,
}

impl Leaf {
    fn vertex(&self, i: usize) -> Point3<f64> {
        let [x, y, z] = self.instance.position(i);
        self.placement * Point3::new(x as f64, y as f64, z as f64)
    }

    fn triangle(&self, t: usize) -> Triangle {
        let idx = &self.instance.triangles[t * 3..t * 3 + 3];
        Triangle::new(
            self.vertex(idx[0] as usize),
            self.vertex(idx[1] as usize),
            self.vertex(idx[2] as usize),
        )
    }

    fn segment(&self, s: usize) -> Segment {
        let idx = &self.instance.edges[s * 2..s * 2 + 2];
        Segment::new(self.vertex(idx[0] as usize), self.vertex(idx[1] as usize))
    }
}

/// Lookup table from selectable ids to placed instances.
pub struct ShapeIndex {
    leaves: FxHashMap<String, Leaf>,
}

impl ShapeIndex {
    /// Index every leaf of `scene` with its composed world placement.
    pub fn from_scene(scene: &Scene) -> Self {
        let leaves = scene
            .leaves_with_path()
            .into_iter()
            .filter_map(|(chain, part)| {
                let instance = part.instance()?.clone();
                let placement = chain
                    .iter()
                    .fold(Isometry3::identity(), |acc, t| acc * isometry(t));
                Some((part.id.clone(), Leaf { instance, placement }))
            })
            .collect();
        Self { leaves }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Resolve a part or sub-shape id to world geometry.
    pub fn resolve(&self, id: &str) -> Result<WorldShape> {
        if let Some(leaf) = self.leaves.get(id) {
            return Ok(whole_part(id, leaf));
        }

        let (part, class, index) =
            parse_sub_id(id).ok_or_else(|| MeasureError::UnknownObjectReference(id.to_string()))?;
        let leaf = self
            .leaves
            .get(part)
            .ok_or_else(|| MeasureError::UnknownObjectReference(id.to_string()))?;
        let unknown = || MeasureError::UnknownObjectReference(id.to_string());

        let mut shape = WorldShape {
            id: id.to_string(),
            class,
            triangles: Vec::new(),
            segments: Vec::new(),
            points: Vec::new(),
        };
        match class {
            ShapeClass::Face => {
                let range = leaf.instance.face_triangles(index).ok_or_else(unknown)?;
                shape.triangles = range.map(|t| leaf.triangle(t)).collect();
            }
            ShapeClass::Edge => {
                let range = leaf.instance.edge_segments(index).ok_or_else(unknown)?;
                shape.segments = range.map(|s| leaf.segment(s)).collect();
            }
            ShapeClass::Vertex => {
                if index >= leaf.instance.vertex_count() {
                    return Err(unknown());
                }
                shape.points.push(leaf.vertex(index));
            }
            ShapeClass::Solid => return Err(unknown()),
        }
        Ok(shape)
    }
}

fn whole_part(id: &str, leaf: &Leaf) -> WorldShape {
    let instance = &leaf.instance;
    let triangles: Vec<Triangle> = (0..instance.triangle_count()).map(|t| leaf.triangle(t)).collect();
    let segments: Vec<Segment> = (0..instance.segment_count()).map(|s| leaf.segment(s)).collect();
    let points: Vec<Point3<f64>> = if triangles.is_empty() && segments.is_empty() {
        (0..instance.vertex_count()).map(|v| leaf.vertex(v)).collect()
    } else {
        Vec::new()
    };

    let class = if !triangles.is_empty() {
        ShapeClass::Solid
    } else if !segments.is_empty() {
        ShapeClass::Edge
    } else {
        ShapeClass::Vertex
    };

    WorldShape {
        id: id.to_string(),
        class,
        triangles,
        segments,
        points,
    }
}

const SUB_ID_FORMS: [(&str, &str, ShapeClass); 3] = [
    ("/faces/", "faces_", ShapeClass::Face),
    ("/edges/", "edges_", ShapeClass::Edge),
    ("/vertices/", "vertex_", ShapeClass::Vertex),
];

/// Split `<part>/<group>/<prefix><i>` into its part id, class and index.
fn parse_sub_id(id: &str) -> Option<(&str, ShapeClass, usize)> {
    SUB_ID_FORMS.iter().find_map(|(group, prefix, class)| {
        let at = id.rfind(group)?;
        let index = id[at + group.len()..].strip_prefix(prefix)?.parse().ok()?;
        Some((&id[..at], *class, index))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadview_core::Part;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn square() -> Arc<Instance> {
        // Two faces of one triangle each, four edges
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let normals = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let instance = Instance::new(positions, normals, vec![0, 1, 2, 0, 2, 3], vec![0, 1, 1, 2, 2, 3, 3, 0])
            .with_groups(Some(vec![1, 1]), None);
        Arc::new(instance)
    }

    #[test]
    fn test_parse_sub_ids() {
        assert_eq!(parse_sub_id("/a/b/faces/faces_3"), Some(("/a/b", ShapeClass::Face, 3)));
        assert_eq!(parse_sub_id("/a/edges/edges_0"), Some(("/a", ShapeClass::Edge, 0)));
        assert_eq!(parse_sub_id("/a/vertices/vertex_12"), Some(("/a", ShapeClass::Vertex, 12)));
        assert_eq!(parse_sub_id("/a/faces/face_3"), None);
        assert_eq!(parse_sub_id("/a/faces/faces_x"), None);
        assert_eq!(parse_sub_id("/a/b"), None);
    }

    #[test]
    fn test_nested_placement_composes() {
        let rotate_z_90 = Transform {
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2],
        };
        let mut group = Part::group("/g", vec![Part::shape("/g/sq", square(), Transform::from_translation(1.0, 0.0, 0.0))]);
        group.transform = rotate_z_90;
        let index = ShapeIndex::from_scene(&Scene::new(group));

        // Child offset (1,0,0) rotated by the parent onto (0,1,0)
        let v = index.resolve("/g/sq/vertices/vertex_0").unwrap();
        assert_eq!(v.class, ShapeClass::Vertex);
        assert_relative_eq!(v.points[0], Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_resolve_groups() {
        let index = ShapeIndex::from_scene(&Scene::new(Part::shape("/sq", square(), Transform::IDENTITY)));
        assert_eq!(index.len(), 1);

        let whole = index.resolve("/sq").unwrap();
        assert_eq!(whole.class, ShapeClass::Solid);
        assert_eq!(whole.triangles.len(), 2);
        assert_eq!(whole.segments.len(), 4);

        let face = index.resolve("/sq/faces/faces_1").unwrap();
        assert_eq!(face.triangles.len(), 1);

        // Without edge groups every segment is its own edge
        let edge = index.resolve("/sq/edges/edges_3").unwrap();
        assert_eq!(edge.segments.len(), 1);
        assert_relative_eq!(edge.segments[0].a, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_unknown_references() {
        let index = ShapeIndex::from_scene(&Scene::new(Part::group(
            "/root",
            vec![Part::shape("/root/sq", square(), Transform::IDENTITY)],
        )));
        for id in ["/nope", "/root", "/root/sq/faces/faces_2", "/root/sq/vertices/vertex_4", "/nope/edges/edges_0"] {
            assert_eq!(
                index.resolve(id).unwrap_err(),
                MeasureError::UnknownObjectReference(id.to_string()),
                "{}",
                id
            );
        }
    }

    #[test]
    fn test_zero_quaternion_is_identity() {
        let t = Transform {
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0; 4],
        };
        let p = isometry(&t) * Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p, Point3::new(2.0, 2.0, 3.0));
    }
}
