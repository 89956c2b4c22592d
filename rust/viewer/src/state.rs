// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! View state that outlives individual scenes.

use cadview_core::{Camera, Clipping, OutlineState, Scene};
use std::collections::BTreeMap;

/// Camera, clipping, outline and selection, owned by the viewer and
/// carried across scene replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// `None` until the user (or a reset) sets one; the renderer then fits
    /// the scene itself.
    pub camera: Option<Camera>,
    pub clipping: Clipping,
    pub outline: BTreeMap<String, OutlineState>,
    pub selected: Vec<String>,
}

impl ViewState {
    /// Carry the state over to `scene`.
    ///
    /// Outline entries of ids absent from `scene` are dropped, ids present
    /// in both keep their prior state, new ids take the scene's visibility.
    /// Selection is filtered the same way. Camera and clipping are kept.
    pub fn reconcile(&mut self, scene: &Scene) {
        let previous = std::mem::take(&mut self.outline);
        self.outline = scene
            .parts()
            .map(|part| {
                let state = previous
                    .get(&part.id)
                    .copied()
                    .unwrap_or_else(|| part.visibility.into());
                (part.id.clone(), state)
            })
            .collect();
        let outline = &self.outline;
        self.selected.retain(|id| outline.contains_key(id));
    }
}
