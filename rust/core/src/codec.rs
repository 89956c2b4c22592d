// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed numeric buffer transport encoding.
//!
//! Every numeric array travels as
//!
//! ```json
//! { "dtype": "float32", "shape": 24, "buffer": "<base64>", "codec": "b64" }
//! ```
//!
//! where `buffer` holds the little-endian bytes of `shape` elements of
//! `dtype`. This tagging scheme is the interoperability contract with other
//! producers and consumers, so it must not change shape.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Codec tag for base64 payloads (the only codec currently defined).
pub const CODEC_B64: &str = "b64";

/// Element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Int32,
    Uint32,
}

impl DType {
    /// Size of one element in bytes.
    #[inline]
    pub fn element_size(self) -> usize {
        4
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Uint32 => "uint32",
        }
    }
}

/// A numeric array in transport form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedBuffer {
    /// Declared element type.
    pub dtype: DType,
    /// Number of elements.
    pub shape: usize,
    /// Base64 of the little-endian element bytes.
    pub buffer: String,
    /// Payload codec, always `"b64"`.
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_codec() -> String {
    CODEC_B64.to_string()
}

/// A decoded numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl TypedBuffer {
    pub fn dtype(&self) -> DType {
        match self {
            TypedBuffer::F32(_) => DType::Float32,
            TypedBuffer::I32(_) => DType::Int32,
            TypedBuffer::U32(_) => DType::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::F32(v) => v.len(),
            TypedBuffer::I32(v) => v.len(),
            TypedBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encode a float slice as `float32`.
pub fn encode_f32(values: &[f32]) -> EncodedBuffer {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    wrap(DType::Float32, values.len(), &bytes)
}

/// Encode an index slice as `uint32`.
pub fn encode_u32(values: &[u32]) -> EncodedBuffer {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    wrap(DType::Uint32, values.len(), &bytes)
}

/// Encode an index slice as `int32`.
pub fn encode_i32(values: &[i32]) -> EncodedBuffer {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    wrap(DType::Int32, values.len(), &bytes)
}

fn wrap(dtype: DType, shape: usize, bytes: &[u8]) -> EncodedBuffer {
    EncodedBuffer {
        dtype,
        shape,
        buffer: STANDARD.encode(bytes),
        codec: CODEC_B64.to_string(),
    }
}

/// Decode a transport buffer into its declared element type.
///
/// The payload must be an exact multiple of the element size and must hold
/// exactly `shape` elements; nothing is truncated or padded.
pub fn decode(encoded: &EncodedBuffer) -> Result<TypedBuffer> {
    if encoded.codec != CODEC_B64 {
        return Err(Error::buffer(format!(
            "unsupported codec {:?}",
            encoded.codec
        )));
    }

    let bytes = STANDARD
        .decode(encoded.buffer.as_bytes())
        .map_err(|e| Error::buffer(format!("invalid base64 payload: {}", e)))?;

    let size = encoded.dtype.element_size();
    if bytes.len() % size != 0 {
        return Err(Error::buffer(format!(
            "{} payload of {} bytes is not a multiple of {}",
            encoded.dtype.name(),
            bytes.len(),
            size
        )));
    }
    let count = bytes.len() / size;
    if count != encoded.shape {
        return Err(Error::buffer(format!(
            "{} payload holds {} elements, header declares {}",
            encoded.dtype.name(),
            count,
            encoded.shape
        )));
    }

    let words = bytes
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]]);

    Ok(match encoded.dtype {
        DType::Float32 => TypedBuffer::F32(words.map(f32::from_le_bytes).collect()),
        DType::Int32 => TypedBuffer::I32(words.map(i32::from_le_bytes).collect()),
        DType::Uint32 => TypedBuffer::U32(words.map(u32::from_le_bytes).collect()),
    })
}

/// Decode a buffer that must be `float32`.
pub fn decode_f32(encoded: &EncodedBuffer, what: &str) -> Result<Vec<f32>> {
    match decode(encoded)? {
        TypedBuffer::F32(v) => Ok(v),
        other => Err(Error::buffer(format!(
            "{} must be float32, got {}",
            what,
            other.dtype().name()
        ))),
    }
}

/// Decode an index buffer; accepts `uint32` or non-negative `int32`.
pub fn decode_indices(encoded: &EncodedBuffer, what: &str) -> Result<Vec<u32>> {
    match decode(encoded)? {
        TypedBuffer::U32(v) => Ok(v),
        TypedBuffer::I32(v) => v
            .into_iter()
            .map(|i| {
                u32::try_from(i)
                    .map_err(|_| Error::buffer(format!("{} contains negative index {}", what, i)))
            })
            .collect(),
        TypedBuffer::F32(_) => Err(Error::buffer(format!(
            "{} must be an integer buffer, got float32",
            what
        ))),
    }
}
