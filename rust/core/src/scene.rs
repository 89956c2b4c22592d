// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene tree and its transport form.
//!
//! A scene payload carries an instance table plus a part tree whose leaves
//! either inline their geometry or point into the table with `{"ref": i}`.
//! Decoding resolves references lazily through a [`DecodePass`], so every
//! table entry is decoded at most once and shared between all parts that
//! reference it.

use crate::error::{Error, Result};
use crate::instance::{EncodedInstance, Instance};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rigid placement of a part: translation plus rotation quaternion
/// `[x, y, z, w]`, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "([f64; 3], [f64; 4])", into = "([f64; 3], [f64; 4])")]
pub struct Transform {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: [x, y, z],
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<([f64; 3], [f64; 4])> for Transform {
    fn from((translation, rotation): ([f64; 3], [f64; 4])) -> Self {
        Self { translation, rotation }
    }
}

impl From<Transform> for ([f64; 3], [f64; 4]) {
    fn from(t: Transform) -> Self {
        (t.translation, t.rotation)
    }
}

/// Visibility of a part in the view and in the outline tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub shown: bool,
    pub expanded: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            shown: true,
            expanded: false,
        }
    }
}

/// Where a leaf part gets its geometry from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeSource {
    /// Index into the scene's instance table.
    Ref {
        #[serde(rename = "ref")]
        index: usize,
    },
    /// Geometry carried inline.
    Inline(Box<EncodedInstance>),
}

/// Transport form of a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedPart {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub loc: Option<Transform>,
    #[serde(default)]
    pub state: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<EncodedPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeSource>,
}

/// SCENE payload: instance table plus part tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMessage {
    #[serde(default)]
    pub instances: Vec<EncodedInstance>,
    pub shapes: EncodedPart,
    /// Viewer configuration patch sent along with the scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Lazy, memoized resolution of instance table references.
///
/// Lives for one decode pass; references resolved through the same pass share
/// a single `Arc<Instance>`.
pub struct DecodePass<'a> {
    table: &'a [EncodedInstance],
    cache: Vec<Option<Arc<Instance>>>,
    decoded: usize,
}

impl<'a> DecodePass<'a> {
    pub fn new(table: &'a [EncodedInstance]) -> Self {
        Self {
            table,
            cache: vec![None; table.len()],
            decoded: 0,
        }
    }

    /// Resolve table entry `index`, decoding it on first access.
    pub fn resolve(&mut self, index: usize) -> Result<Arc<Instance>> {
        let encoded = self.table.get(index).ok_or(Error::DanglingReference {
            index,
            table_len: self.table.len(),
        })?;

        if let Some(instance) = &self.cache[index] {
            return Ok(instance.clone());
        }

        let instance = Arc::new(Instance::decode(encoded)?);
        self.cache[index] = Some(instance.clone());
        self.decoded += 1;
        Ok(instance)
    }

    /// Number of table entries actually decoded so far.
    pub fn decoded_count(&self) -> usize {
        self.decoded
    }
}

/// Content of a part.
#[derive(Debug, Clone)]
pub enum PartKind {
    Group(Vec<Part>),
    Shape(Arc<Instance>),
}

/// Decoded scene node.
#[derive(Debug, Clone)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub transform: Transform,
    pub visibility: Visibility,
    pub kind: PartKind,
}

impl Part {
    pub fn group(id: impl Into<String>, children: Vec<Part>) -> Self {
        let id = id.into();
        Self {
            name: leaf_name(&id),
            id,
            transform: Transform::IDENTITY,
            visibility: Visibility::default(),
            kind: PartKind::Group(children),
        }
    }

    pub fn shape(id: impl Into<String>, instance: Arc<Instance>, transform: Transform) -> Self {
        let id = id.into();
        Self {
            name: leaf_name(&id),
            id,
            transform,
            visibility: Visibility::default(),
            kind: PartKind::Shape(instance),
        }
    }

    pub fn instance(&self) -> Option<&Arc<Instance>> {
        match &self.kind {
            PartKind::Shape(instance) => Some(instance),
            PartKind::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[Part] {
        match &self.kind {
            PartKind::Group(children) => children,
            PartKind::Shape(_) => &[],
        }
    }
}

fn leaf_name(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).to_string()
}

/// A decoded scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub root: Part,
    /// Configuration patch that accompanied the scene, if any.
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Scene {
    pub fn new(root: Part) -> Self {
        Self { root, config: None }
    }

    /// Decode a SCENE payload, resolving instance references lazily.
    pub fn decode(message: &SceneMessage) -> Result<Self> {
        let mut pass = DecodePass::new(&message.instances);
        let mut seen = FxHashSet::default();
        let root = decode_part(&message.shapes, &mut pass, &mut seen)?;
        Ok(Self {
            root,
            config: message.config.clone(),
        })
    }

    /// Encode into a SCENE payload, deduplicating shared instances by identity.
    pub fn encode(&self) -> SceneMessage {
        let mut table = Vec::new();
        let mut index: FxHashMap<*const Instance, usize> = FxHashMap::default();
        let shapes = encode_part(&self.root, &mut table, &mut index);
        SceneMessage {
            instances: table,
            shapes,
            config: self.config.clone(),
        }
    }

    /// Depth-first pre-order walk over every part, including the root.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            let part = stack.pop()?;
            stack.extend(part.children().iter().rev());
            Some(part)
        })
    }

    pub fn find(&self, id: &str) -> Option<&Part> {
        self.parts().find(|p| p.id == id)
    }

    /// Leaf parts paired with their world transform chain (root first).
    pub fn leaves_with_path(&self) -> Vec<(Vec<Transform>, &Part)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

fn collect_leaves<'a>(
    part: &'a Part,
    chain: &mut Vec<Transform>,
    out: &mut Vec<(Vec<Transform>, &'a Part)>,
) {
    chain.push(part.transform);
    match &part.kind {
        PartKind::Shape(_) => out.push((chain.clone(), part)),
        PartKind::Group(children) => {
            for child in children {
                collect_leaves(child, chain, out);
            }
        }
    }
    chain.pop();
}

fn decode_part(
    encoded: &EncodedPart,
    pass: &mut DecodePass<'_>,
    seen: &mut FxHashSet<String>,
) -> Result<Part> {
    if !seen.insert(encoded.id.clone()) {
        return Err(Error::MalformedPayload {
            kind: "SCENE",
            reason: format!("duplicate part id {:?}", encoded.id),
        });
    }

    let kind = match (&encoded.parts, &encoded.shape) {
        (Some(children), None) => PartKind::Group(
            children
                .iter()
                .map(|c| decode_part(c, pass, seen))
                .collect::<Result<_>>()?,
        ),
        (None, Some(ShapeSource::Ref { index })) => PartKind::Shape(pass.resolve(*index)?),
        (None, Some(ShapeSource::Inline(inline))) => {
            PartKind::Shape(Arc::new(Instance::decode(inline)?))
        }
        (Some(_), Some(_)) | (None, None) => {
            return Err(Error::MalformedPayload {
                kind: "SCENE",
                reason: format!(
                    "part {:?} must carry exactly one of `parts` or `shape`",
                    encoded.id
                ),
            })
        }
    };

    Ok(Part {
        id: encoded.id.clone(),
        name: if encoded.name.is_empty() {
            leaf_name(&encoded.id)
        } else {
            encoded.name.clone()
        },
        transform: encoded.loc.unwrap_or_default(),
        visibility: encoded.state,
        kind,
    })
}

fn encode_part(
    part: &Part,
    table: &mut Vec<EncodedInstance>,
    index: &mut FxHashMap<*const Instance, usize>,
) -> EncodedPart {
    let (parts, shape) = match &part.kind {
        PartKind::Group(children) => (
            Some(children.iter().map(|c| encode_part(c, table, index)).collect()),
            None,
        ),
        PartKind::Shape(instance) => {
            let slot = *index.entry(Arc::as_ptr(instance)).or_insert_with(|| {
                table.push(instance.encode());
                table.len() - 1
            });
            (None, Some(ShapeSource::Ref { index: slot }))
        }
    };

    EncodedPart {
        id: part.id.clone(),
        name: part.name.clone(),
        loc: (!part.transform.is_identity()).then_some(part.transform),
        state: part.visibility,
        parts,
        shape,
    }
}
