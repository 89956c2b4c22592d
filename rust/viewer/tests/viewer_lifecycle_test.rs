// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene replacement keeps the user's view.

use cadview_core::{
    Camera, DistanceMode, DistanceResult, Instance, Measurement, Message, Part, Scene, ToolKind,
    ToolOutcome, ToolResponse, Transform,
};
use cadview_viewer::{Phase, RenderBackend, ViewState, ViewerConfig, ViewerError, ViewerStateMachine};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Backend that logs every call, tagged with the scene root it saw.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    fail_next_build: bool,
    live_objects: usize,
}

impl RenderBackend for Recorder {
    fn build(&mut self, scene: &Scene, _: &ViewerConfig) -> cadview_viewer::Result<()> {
        if std::mem::take(&mut self.fail_next_build) {
            self.live_objects += 1;
            return Err(ViewerError::Backend("out of memory".into()));
        }
        self.live_objects += scene.parts().count();
        self.calls.push(format!("build {}", scene.root.id));
        Ok(())
    }
    fn apply_view(&mut self, _: &ViewState) {
        self.calls.push("apply_view".into());
    }
    fn start_animation(&mut self) {
        self.calls.push("start".into());
    }
    fn stop_animation(&mut self) {
        self.calls.push("stop".into());
    }
    fn dispose(&mut self) {
        self.live_objects = 0;
        self.calls.push("dispose".into());
    }
    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(format!("resize {}x{}", width, height));
    }
    fn apply_config(&mut self, _: &ViewerConfig) {
        self.calls.push("config".into());
    }
    fn show_measurement(&mut self, tool: ToolKind, _: &ToolOutcome) {
        self.calls.push(format!("measurement {:?}", tool));
    }
    fn screenshot(&mut self, filename: &str) {
        self.calls.push(format!("screenshot {}", filename));
    }
}

fn scene(root: &str, children: &[&str]) -> Scene {
    let instance = Arc::new(Instance::new(vec![0.0; 9], Vec::new(), vec![0, 1, 2], Vec::new()));
    let parts = children
        .iter()
        .map(|c| Part::shape(format!("{}/{}", root, c), instance.clone(), Transform::IDENTITY))
        .collect();
    Scene::new(Part::group(root, parts))
}

fn scene_message(root: &str, children: &[&str]) -> Message {
    Message::Scene(Box::new(scene(root, children).encode()))
}

fn viewer() -> (ViewerStateMachine<Recorder>, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ViewerStateMachine::new(Recorder::default(), ViewerConfig::default(), tx), rx)
}

#[test]
fn camera_survives_scene_replacement() {
    let (mut viewer, _rx) = viewer();
    viewer.handle(scene_message("/v1", &["a", "b"])).unwrap();
    assert_eq!(viewer.phase(), Phase::Rendering);

    let camera = Camera {
        zoom: 2.5,
        position: [10.0, -4.0, 3.0],
        ..Camera::default()
    };
    viewer.set_camera(camera).unwrap();
    viewer.set_clipping_intersection(true).unwrap();

    viewer.handle(scene_message("/v2", &["a"])).unwrap();
    assert_eq!(viewer.phase(), Phase::Rendering);
    assert_eq!(viewer.view().camera, Some(camera));
    assert!(viewer.view().clipping.intersection);
    assert_eq!(viewer.scene().unwrap().root.id, "/v2");
}

#[test]
fn outline_ids_missing_from_new_scene_are_dropped() {
    let (mut viewer, _rx) = viewer();
    viewer.handle(scene_message("/asm", &["keep", "gone"])).unwrap();
    viewer.toggle_shown("/asm/keep").unwrap();
    viewer.toggle_expanded("/asm/gone").unwrap();

    viewer.handle(scene_message("/asm", &["keep", "fresh"])).unwrap();
    let outline = &viewer.view().outline;
    assert!(!outline["/asm/keep"].shown);
    assert!(outline["/asm/fresh"].shown);
    assert!(!outline.contains_key("/asm/gone"));
}

#[test]
fn teardown_precedes_rebuild() {
    let (mut viewer, _rx) = viewer();
    viewer.resize(640, 480);
    viewer.handle(scene_message("/one", &["x"])).unwrap();
    viewer.handle(scene_message("/two", &["y"])).unwrap();

    assert_eq!(
        viewer.backend().calls,
        [
            "build /one",
            "apply_view",
            "resize 640x480",
            "start",
            "stop",
            "dispose",
            "build /two",
            "apply_view",
            "resize 640x480",
            "start",
        ]
    );
    // Only the second scene's objects are alive
    assert_eq!(viewer.backend().live_objects, 2);
}

#[test]
fn queued_scenes_apply_in_order() {
    let (mut viewer, _rx) = viewer();
    viewer.queue_scene(scene("/first", &["a"]));
    viewer.queue_scene(scene("/second", &["b"]));
    assert_eq!(viewer.queued_scenes(), 2);
    assert_eq!(viewer.phase(), Phase::Empty);

    viewer.pump().unwrap();
    assert_eq!(viewer.queued_scenes(), 0);
    let builds: Vec<&String> = viewer.backend().calls.iter().filter(|c| c.starts_with("build")).collect();
    assert_eq!(builds, ["build /first", "build /second"]);
    assert_eq!(viewer.scene().unwrap().root.id, "/second");
}

#[test]
fn failed_build_returns_to_empty_and_keeps_view() {
    let (mut viewer, _rx) = viewer();
    viewer.handle(scene_message("/ok", &["a"])).unwrap();
    let camera = Camera {
        zoom: 4.0,
        ..Camera::default()
    };
    viewer.set_camera(camera).unwrap();

    viewer.backend_mut().fail_next_build = true;
    let err = viewer.handle(scene_message("/bad", &["a"])).unwrap_err();
    assert_eq!(err, ViewerError::Backend("out of memory".into()));
    assert_eq!(viewer.phase(), Phase::Empty);
    assert!(viewer.scene().is_none());
    assert_eq!(viewer.backend().live_objects, 0);
    assert_eq!(viewer.view().camera, Some(camera));

    viewer.handle(scene_message("/again", &["a"])).unwrap();
    assert_eq!(viewer.phase(), Phase::Rendering);
    assert_eq!(viewer.view().camera, Some(camera));
}

#[test]
fn failed_build_keeps_outline_of_the_last_rendered_scene() {
    let (mut viewer, _rx) = viewer();
    viewer.handle(scene_message("/asm", &["a", "b"])).unwrap();
    viewer.toggle_shown("/asm/b").unwrap();

    viewer.backend_mut().fail_next_build = true;
    assert!(viewer.handle(scene_message("/asm", &["a"])).is_err());
    assert!(!viewer.view().outline["/asm/b"].shown);

    viewer.handle(scene_message("/asm", &["a", "b"])).unwrap();
    assert!(!viewer.view().outline["/asm/b"].shown);
    assert!(viewer.view().outline["/asm/a"].shown);
}

#[test]
fn pump_after_failed_build_applies_what_is_queued() {
    let (mut viewer, _rx) = viewer();
    viewer.backend_mut().fail_next_build = true;
    viewer.queue_scene(scene("/broken", &["a"]));
    viewer.queue_scene(scene("/next", &["b"]));

    assert!(viewer.pump().is_err());
    assert_eq!(viewer.phase(), Phase::Empty);
    assert_eq!(viewer.queued_scenes(), 1);

    viewer.pump().unwrap();
    assert_eq!(viewer.phase(), Phase::Rendering);
    assert_eq!(viewer.scene().unwrap().root.id, "/next");
}

#[test]
fn tool_response_is_shown_while_rendering() {
    let (mut viewer, _rx) = viewer();
    viewer.handle(scene_message("/m", &["a", "b"])).unwrap();

    let result = DistanceResult {
        mode: DistanceMode::Centroid,
        distance: 5.0,
        delta: [5.0, 0.0, 0.0],
        point1: [0.5, 0.5, 0.5],
        point2: [5.5, 0.5, 0.5],
    };
    let response = ToolResponse::ok(ToolKind::Distance, Measurement::Distance(result));
    viewer.handle(Message::ToolResponse(response.clone())).unwrap();

    assert_eq!(viewer.backend().calls.last().unwrap(), "measurement Distance");
    assert_eq!(viewer.measurement(ToolKind::Distance), Some(&response.outcome));

    // A new scene invalidates old measurements
    viewer.handle(scene_message("/m", &["a"])).unwrap();
    assert!(viewer.measurement(ToolKind::Distance).is_none());
}

#[test]
fn interactions_reach_the_outbox_in_order() {
    let (mut viewer, mut rx) = viewer();
    viewer.handle(scene_message("/o", &["a", "b"])).unwrap();

    viewer.toggle_shown("/o/a").unwrap();
    viewer.select(vec!["/o/b".into()]).unwrap();
    viewer.reset_camera().unwrap();

    let Ok(Message::StateDelta(first)) = rx.try_recv() else {
        panic!("expected outline delta");
    };
    assert!(!first.states["/o/a"].shown);
    let Ok(Message::StateDelta(second)) = rx.try_recv() else {
        panic!("expected selection delta");
    };
    assert_eq!(second.selected, Some(vec!["/o/b".to_string()]));
    let Ok(Message::StateDelta(third)) = rx.try_recv() else {
        panic!("expected camera delta");
    };
    assert_eq!(third.camera, Some(Camera::default()));
    assert!(rx.try_recv().is_err());

    assert_eq!(viewer.select(vec!["/o/zzz".into()]), Err(ViewerError::UnknownPart("/o/zzz".into())));
}

#[test]
fn scene_config_is_merged_before_build() {
    let (mut viewer, _rx) = viewer();
    let mut payload = scene("/c", &["a"]).encode();
    payload.config = json_object(r#"{"tree_width": 320, "axes": true}"#);
    viewer.handle(Message::Scene(Box::new(payload))).unwrap();

    assert_eq!(viewer.config().tree_width, 320);
    assert!(viewer.config().axes);
}

fn json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str(text) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}
