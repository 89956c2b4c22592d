// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CADView-Lite Session Registry
//!
//! Tracks which peers belong to which viewing session and routes decoded
//! messages between them.
//!
//! ```rust,ignore
//! let registry: SessionRegistry<mpsc::Sender<Arc<Frame>>> = SessionRegistry::default();
//! let conn = registry.next_connection_id();
//! registry.register(&"main".into(), conn, Role::Visualization, tx)?;
//! registry.route(conn, message)?;
//! ```

pub mod error;
pub mod outbox;
pub mod registry;
pub mod sink;

pub use error::{Result, RoutingError};
pub use outbox::{forward_outbox, forward_queued};
pub use registry::{
    ConnectionId, Destination, RegistryConfig, Routed, SessionId, SessionRegistry, SessionStats,
};
pub use sink::{DeliveryError, PeerSink};
