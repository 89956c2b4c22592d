// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewer configuration and CONFIG patch merging.

use crate::error::{Result, ViewerError};
use cadview_core::ConfigPatch;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display settings. Keys the viewer does not model are kept in `extra`
/// so they survive a round trip to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub theme: String,
    pub control: String,
    pub up: String,
    pub tree_width: u32,
    pub glass: bool,
    pub tools: bool,
    pub pan_speed: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    pub axes: bool,
    pub axes0: bool,
    pub grid_xy: bool,
    pub grid_xz: bool,
    pub grid_yz: bool,
    pub ticks: u32,
    pub perspective: bool,
    pub transparent: bool,
    pub black_edges: bool,
    pub default_opacity: f64,
    pub default_color: String,
    pub default_edgecolor: String,
    pub ambient_intensity: f64,
    pub direct_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            theme: "browser".into(),
            control: "trackball".into(),
            up: "Z".into(),
            tree_width: 240,
            glass: true,
            tools: true,
            pan_speed: 0.5,
            rotate_speed: 1.0,
            zoom_speed: 0.5,
            axes: false,
            axes0: false,
            grid_xy: false,
            grid_xz: false,
            grid_yz: false,
            ticks: 5,
            perspective: false,
            transparent: false,
            black_edges: false,
            default_opacity: 0.5,
            default_color: "#e8b024".into(),
            default_edgecolor: "#808080".into(),
            ambient_intensity: 1.0,
            direct_intensity: 1.1,
            metalness: 0.3,
            roughness: 0.65,
            extra: Map::new(),
        }
    }
}

impl ViewerConfig {
    /// Merge `patch` key by key. On a type mismatch nothing is applied.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) -> Result<()> {
        let current = self.to_map();
        let mut merged = current.clone();
        merged.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));

        match from_map(merged) {
            Ok(updated) => {
                *self = updated;
                Ok(())
            }
            Err(e) => {
                // Name the first key that fails on its own
                let key = patch
                    .iter()
                    .find(|(k, v)| {
                        let mut single = current.clone();
                        single.insert((*k).clone(), (*v).clone());
                        from_map(single).is_err()
                    })
                    .map(|(k, _)| k.clone())
                    .unwrap_or_default();
                Err(ViewerError::InvalidConfig {
                    key,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn from_map(map: Map<String, Value>) -> serde_json::Result<ViewerConfig> {
    serde_json::from_value(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> ConfigPatch {
        match value {
            Value::Object(map) => map,
            _ => panic!("patch must be an object"),
        }
    }

    #[test]
    fn test_patch_known_and_unknown_keys() {
        let mut config = ViewerConfig::default();
        config
            .apply_patch(&patch(json!({"theme": "dark", "tree_width": 300, "explode": true})))
            .unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.tree_width, 300);
        assert_eq!(config.extra.get("explode"), Some(&json!(true)));
        assert_eq!(config.control, "trackball");
    }

    #[test]
    fn test_bad_type_leaves_config_untouched() {
        let mut config = ViewerConfig::default();
        let err = config
            .apply_patch(&patch(json!({"theme": "dark", "ticks": "many"})))
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig { ref key, .. } if key == "ticks"));
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: ViewerConfig = serde_json::from_value(json!({"up": "Y"})).unwrap();
        assert_eq!(config.up, "Y");
        assert_eq!(config.tree_width, 240);
        assert!(config.extra.is_empty());
    }
}
