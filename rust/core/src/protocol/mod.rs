// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire framing for the shared peer channel.
//!
//! Every frame is a single discriminator character, a colon, and a JSON
//! payload:
//!
//! ```text
//! L                          REGISTER (payload optional)
//! L:{"role":"computation"}   REGISTER
//! D:{...}                    SCENE
//! C:{"type":"screenshot"}    COMMAND
//! S:{...}                    CONFIG
//! U:{...}                    STATE_DELTA
//! T:{...}                    TOOL_REQUEST
//! R:{...}                    TOOL_RESPONSE
//! E:{...}                    failure notice (outbound only)
//! ```
//!
//! Inbound frames decode into the closed [`Message`] enum. Failure notices are
//! emitted by the registry and never accepted inbound.

mod tool;

pub use tool::{
    DistanceMode, DistanceResult, Failure, Measurement, PropertiesResult, ShapeProperties,
    ToolKind, ToolOutcome, ToolRequest, ToolResponse,
};

use crate::error::{Error, Result};
use crate::scene::SceneMessage;
use crate::view::{Camera, Clipping, OutlineState};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discriminator of outbound failure notices.
pub const FAILURE_TAG: char = 'E';

/// Role a connection announces on REGISTER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Computation,
    Visualization,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Computation => f.write_str("computation"),
            Role::Visualization => f.write_str("visualization"),
        }
    }
}

/// REGISTER payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub role: Role,
}

impl Default for Register {
    /// A bare `L` frame registers a visualization peer.
    fn default() -> Self {
        Self {
            role: Role::Visualization,
        }
    }
}

/// Out-of-band instruction from the computation peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Capture the current view into `filename`.
    Screenshot { filename: String },
    /// Return the camera to its fitted default.
    ResetCamera,
    /// Ask the host for the session's merged view state. Answered to the
    /// sender as a STATE_DELTA; never forwarded to viewers.
    Status,
}

/// Viewer configuration patch.
pub type ConfigPatch = serde_json::Map<String, serde_json::Value>;

/// Incremental change to client-owned view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipping: Option<Clipping>,
    /// Changed outline states by part id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<String, OutlineState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Vec<String>>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.camera.is_none()
            && self.clipping.is_none()
            && self.states.is_empty()
            && self.selected.is_none()
    }

    /// Fold a later delta into this one. Fields present in `later` win;
    /// outline states merge per id.
    pub fn merge(&mut self, later: &StateDelta) {
        if let Some(camera) = later.camera {
            self.camera = Some(camera);
        }
        if let Some(clipping) = later.clipping {
            self.clipping = Some(clipping);
        }
        self.states.extend(later.states.iter().map(|(id, state)| (id.clone(), *state)));
        if let Some(selected) = &later.selected {
            self.selected = Some(selected.clone());
        }
    }
}

/// Kind of a message, one per discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Register,
    Scene,
    Command,
    Config,
    StateDelta,
    ToolRequest,
    ToolResponse,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        MessageKind::Register,
        MessageKind::Scene,
        MessageKind::Command,
        MessageKind::Config,
        MessageKind::StateDelta,
        MessageKind::ToolRequest,
        MessageKind::ToolResponse,
    ];

    pub fn tag(self) -> char {
        match self {
            MessageKind::Register => 'L',
            MessageKind::Scene => 'D',
            MessageKind::Command => 'C',
            MessageKind::Config => 'S',
            MessageKind::StateDelta => 'U',
            MessageKind::ToolRequest => 'T',
            MessageKind::ToolResponse => 'R',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Register => "REGISTER",
            MessageKind::Scene => "SCENE",
            MessageKind::Command => "COMMAND",
            MessageKind::Config => "CONFIG",
            MessageKind::StateDelta => "STATE_DELTA",
            MessageKind::ToolRequest => "TOOL_REQUEST",
            MessageKind::ToolResponse => "TOOL_RESPONSE",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Register(Register),
    Scene(Box<SceneMessage>),
    Command(Command),
    Config(ConfigPatch),
    StateDelta(StateDelta),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Register(_) => MessageKind::Register,
            Message::Scene(_) => MessageKind::Scene,
            Message::Command(_) => MessageKind::Command,
            Message::Config(_) => MessageKind::Config,
            Message::StateDelta(_) => MessageKind::StateDelta,
            Message::ToolRequest(_) => MessageKind::ToolRequest,
            Message::ToolResponse(_) => MessageKind::ToolResponse,
        }
    }

    /// Encode as a wire frame.
    pub fn encode(&self) -> Result<String> {
        let kind = self.kind();
        let payload = match self {
            Message::Register(p) => to_json(kind, p),
            Message::Scene(p) => to_json(kind, p),
            Message::Command(p) => to_json(kind, p),
            Message::Config(p) => to_json(kind, p),
            Message::StateDelta(p) => to_json(kind, p),
            Message::ToolRequest(p) => to_json(kind, p),
            Message::ToolResponse(p) => to_json(kind, p),
        }?;
        Ok(format!("{}:{}", kind.tag(), payload))
    }

    /// Decode an inbound text frame.
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let tag = chars
            .next()
            .ok_or_else(|| Error::UnknownMessageType(String::new()))?;
        let kind = MessageKind::from_tag(tag)
            .ok_or_else(|| Error::UnknownMessageType(tag.to_string()))?;

        let rest = chars.as_str();
        let payload = match rest.strip_prefix(':') {
            Some(p) if !p.trim().is_empty() => Some(p),
            Some(_) => None,
            None if rest.is_empty() => None,
            None => {
                return Err(Error::MalformedPayload {
                    kind: kind.name(),
                    reason: "missing ':' after discriminator".into(),
                })
            }
        };

        match kind {
            MessageKind::Register => Ok(Message::Register(match payload {
                Some(p) => from_json(kind, p)?,
                None => Register::default(),
            })),
            MessageKind::Scene => Ok(Message::Scene(Box::new(required(kind, payload)?))),
            MessageKind::Command => Ok(Message::Command(required(kind, payload)?)),
            MessageKind::Config => Ok(Message::Config(required(kind, payload)?)),
            MessageKind::StateDelta => Ok(Message::StateDelta(required(kind, payload)?)),
            MessageKind::ToolRequest => Ok(Message::ToolRequest(required(kind, payload)?)),
            MessageKind::ToolResponse => Ok(Message::ToolResponse(required(kind, payload)?)),
        }
    }

    /// Decode an inbound binary frame (UTF-8 text carried in a binary message).
    pub fn decode_bytes(frame: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(frame).map_err(|e| Error::MalformedPayload {
            kind: "frame",
            reason: format!("invalid UTF-8: {}", e),
        })?;
        Self::decode(text)
    }
}

/// Anything the core sends to a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Message),
    Failure(Failure),
}

impl Frame {
    pub fn encode(&self) -> Result<String> {
        match self {
            Frame::Message(m) => m.encode(),
            Frame::Failure(f) => Ok(format!("{}:{}", FAILURE_TAG, to_json_named("FAILURE", f)?)),
        }
    }
}

impl From<Message> for Frame {
    fn from(m: Message) -> Self {
        Frame::Message(m)
    }
}

impl From<Failure> for Frame {
    fn from(f: Failure) -> Self {
        Frame::Failure(f)
    }
}

fn required<T: DeserializeOwned>(kind: MessageKind, payload: Option<&str>) -> Result<T> {
    let payload = payload.ok_or_else(|| Error::MalformedPayload {
        kind: kind.name(),
        reason: "payload is required".into(),
    })?;
    from_json(kind, payload)
}

fn from_json<T: DeserializeOwned>(kind: MessageKind, payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| Error::MalformedPayload {
        kind: kind.name(),
        reason: e.to_string(),
    })
}

fn to_json<T: Serialize>(kind: MessageKind, payload: &T) -> Result<String> {
    to_json_named(kind.name(), payload)
}

fn to_json_named<T: Serialize>(kind: &'static str, payload: &T) -> Result<String> {
    serde_json::to_string(payload).map_err(|e| Error::MalformedPayload {
        kind,
        reason: e.to_string(),
    })
}
