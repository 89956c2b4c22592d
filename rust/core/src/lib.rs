// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CADView-Lite Core
//!
//! Shared vocabulary of the CADView-Lite sync protocol: the typed geometry
//! codec, the scene tree, and the framing of the multiplexed peer channel.
//!
//! ## Overview
//!
//! - **Geometry codec** ([`codec`], [`instance`]): numeric arrays travel as
//!   `{dtype, shape, buffer}` records with little-endian base64 payloads.
//! - **Scene model** ([`scene`]): a part tree over a deduplicated instance
//!   table; shared references resolve lazily to a single `Arc<Instance>`.
//! - **Framing** ([`protocol`]): seven message kinds behind single-character
//!   discriminators, decoded into a closed [`Message`] enum.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadview_core::{Message, Scene};
//!
//! match Message::decode(frame)? {
//!     Message::Scene(payload) => {
//!         let scene = Scene::decode(&payload)?;
//!         println!("{} parts", scene.parts().count());
//!     }
//!     other => println!("{}", other.kind()),
//! }
//! ```

pub mod codec;
pub mod error;
pub mod instance;
pub mod protocol;
pub mod scene;
pub mod view;

pub use codec::{DType, EncodedBuffer, TypedBuffer};
pub use error::{Error, ErrorCode, Result};
pub use instance::{BoundingBox, EncodedInstance, Instance};
pub use protocol::{
    Command, ConfigPatch, DistanceMode, DistanceResult, Failure, Frame, Measurement, Message,
    MessageKind, PropertiesResult, Register, Role, ShapeProperties, StateDelta, ToolKind,
    ToolOutcome, ToolRequest, ToolResponse,
};
pub use scene::{DecodePass, EncodedPart, Part, PartKind, Scene, SceneMessage, ShapeSource, Transform, Visibility};
pub use view::{Camera, Clipping, OutlineState};
