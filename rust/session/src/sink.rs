// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound delivery to a connected peer.

use cadview_core::Frame;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a frame could not be handed to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The peer is gone; its registration should be dropped.
    Closed,
    /// The peer's queue is full; this frame is lost for that peer only.
    Full,
}

/// Non-blocking handle to a peer's outbound queue.
pub trait PeerSink: Clone + Send + Sync + 'static {
    fn deliver(&self, frame: Arc<Frame>) -> Result<(), DeliveryError>;

    fn is_closed(&self) -> bool;
}

impl PeerSink for mpsc::Sender<Arc<Frame>> {
    fn deliver(&self, frame: Arc<Frame>) -> Result<(), DeliveryError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}
