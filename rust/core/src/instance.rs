// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deduplicated geometry records.

use crate::codec::{self, EncodedBuffer};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Bounds of a flat xyz position buffer. Empty input yields a zero box.
    pub fn from_positions(positions: &[f32]) -> Self {
        if positions.len() < 3 {
            return Self::default();
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        positions.chunks_exact(3).for_each(|p| {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        });
        Self { min, max }
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }
}

/// Tessellated shape shared by one or more parts.
///
/// Immutable once decoded; parts hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz), empty or parallel to `positions`
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub triangles: Vec<u32>,
    /// Edge segment indices (i0, i1)
    pub edges: Vec<u32>,
    /// Triangles per B-rep face, in triangle order
    pub triangles_per_face: Option<Vec<u32>>,
    /// Segments per B-rep edge, in segment order
    pub segments_per_edge: Option<Vec<u32>>,
    pub bounds: BoundingBox,
}

impl Instance {
    /// Build an instance and compute its bounds.
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, triangles: Vec<u32>, edges: Vec<u32>) -> Self {
        let bounds = BoundingBox::from_positions(&positions);
        Self {
            positions,
            normals,
            triangles,
            edges,
            triangles_per_face: None,
            segments_per_edge: None,
            bounds,
        }
    }

    /// Attach B-rep face/edge grouping.
    pub fn with_groups(mut self, triangles_per_face: Option<Vec<u32>>, segments_per_edge: Option<Vec<u32>>) -> Self {
        self.triangles_per_face = triangles_per_face;
        self.segments_per_edge = segments_per_edge;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Number of addressable faces.
    pub fn face_count(&self) -> usize {
        match &self.triangles_per_face {
            Some(groups) => groups.len(),
            None if self.triangles.is_empty() => 0,
            None => 1,
        }
    }

    /// Number of addressable edges.
    pub fn edge_count(&self) -> usize {
        match &self.segments_per_edge {
            Some(groups) => groups.len(),
            None => self.segment_count(),
        }
    }

    /// Triangle index range (in triangles, not indices) of face `face`.
    pub fn face_triangles(&self, face: usize) -> Option<std::ops::Range<usize>> {
        group_range(self.triangles_per_face.as_deref(), face, self.triangle_count(), true)
    }

    /// Segment range of edge `edge`.
    pub fn edge_segments(&self, edge: usize) -> Option<std::ops::Range<usize>> {
        group_range(self.segments_per_edge.as_deref(), edge, self.segment_count(), false)
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.positions[i * 3], self.positions[i * 3 + 1], self.positions[i * 3 + 2]]
    }

    /// Check buffer arity and index bounds.
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 {
            return Err(Error::buffer(format!(
                "positions length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return Err(Error::buffer(format!(
                "normals length {} does not match positions length {}",
                self.normals.len(),
                self.positions.len()
            )));
        }
        if self.triangles.len() % 3 != 0 {
            return Err(Error::buffer(format!(
                "triangles length {} is not a multiple of 3",
                self.triangles.len()
            )));
        }
        if self.edges.len() % 2 != 0 {
            return Err(Error::buffer(format!(
                "edges length {} is not a multiple of 2",
                self.edges.len()
            )));
        }

        let vertex_count = self.vertex_count() as u32;
        if let Some(&bad) = self
            .triangles
            .iter()
            .chain(self.edges.iter())
            .find(|&&i| i >= vertex_count)
        {
            return Err(Error::buffer(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        check_groups(self.triangles_per_face.as_deref(), self.triangle_count(), "triangles_per_face")?;
        check_groups(self.segments_per_edge.as_deref(), self.segment_count(), "segments_per_edge")?;
        Ok(())
    }

    /// Transport form of this instance.
    pub fn encode(&self) -> EncodedInstance {
        EncodedInstance {
            vertices: codec::encode_f32(&self.positions),
            normals: codec::encode_f32(&self.normals),
            triangles: codec::encode_u32(&self.triangles),
            edges: codec::encode_u32(&self.edges),
            triangles_per_face: self.triangles_per_face.as_deref().map(codec::encode_u32),
            segments_per_edge: self.segments_per_edge.as_deref().map(codec::encode_u32),
            bb: self.bounds,
        }
    }

    /// Decode and validate a transport instance.
    pub fn decode(encoded: &EncodedInstance) -> Result<Self> {
        let instance = Instance {
            positions: codec::decode_f32(&encoded.vertices, "vertices")?,
            normals: codec::decode_f32(&encoded.normals, "normals")?,
            triangles: codec::decode_indices(&encoded.triangles, "triangles")?,
            edges: codec::decode_indices(&encoded.edges, "edges")?,
            triangles_per_face: encoded
                .triangles_per_face
                .as_ref()
                .map(|b| codec::decode_indices(b, "triangles_per_face"))
                .transpose()?,
            segments_per_edge: encoded
                .segments_per_edge
                .as_ref()
                .map(|b| codec::decode_indices(b, "segments_per_edge"))
                .transpose()?,
            bounds: encoded.bb,
        };
        instance.validate()?;
        Ok(instance)
    }
}

/// Transport form of an [`Instance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedInstance {
    pub vertices: EncodedBuffer,
    pub normals: EncodedBuffer,
    pub triangles: EncodedBuffer,
    pub edges: EncodedBuffer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triangles_per_face: Option<EncodedBuffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments_per_edge: Option<EncodedBuffer>,
    pub bb: BoundingBox,
}

fn check_groups(groups: Option<&[u32]>, total: usize, what: &str) -> Result<()> {
    if let Some(groups) = groups {
        let sum: u64 = groups.iter().map(|&g| g as u64).sum();
        if sum != total as u64 {
            return Err(Error::buffer(format!(
                "{} sums to {}, expected {}",
                what, sum, total
            )));
        }
    }
    Ok(())
}

fn group_range(
    groups: Option<&[u32]>,
    index: usize,
    total: usize,
    single_group_default: bool,
) -> Option<std::ops::Range<usize>> {
    match groups {
        Some(groups) => {
            let count = *groups.get(index)? as usize;
            let start: usize = groups[..index].iter().map(|&g| g as usize).sum();
            Some(start..start + count)
        }
        None if single_group_default => (index == 0 && total > 0).then_some(0..total),
        None => (index < total).then_some(index..index + 1),
    }
}
