// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cadview_core::{Error, ErrorCode, Instance, Message, Part, PartKind, Scene, Transform};
use std::sync::Arc;

fn cube() -> Instance {
    let positions = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
    ];
    let normals = positions.iter().map(|v| v - 0.5).collect();
    let triangles = vec![
        0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, //
        2, 3, 7, 2, 7, 6, 1, 2, 6, 1, 6, 5, 0, 4, 7, 0, 7, 3,
    ];
    let edges = vec![0, 1, 1, 2, 2, 3, 3, 0, 4, 5, 5, 6, 6, 7, 7, 4, 0, 4, 1, 5, 2, 6, 3, 7];
    Instance::new(positions, normals, triangles, edges).with_groups(Some(vec![2; 6]), Some(vec![1; 12]))
}

#[test]
fn scene_frame_round_trip_preserves_geometry() {
    let original = Arc::new(cube());
    let scene = Scene::new(Part::group(
        "/asm",
        vec![Part::shape("/asm/box", original.clone(), Transform::IDENTITY)],
    ));

    let wire = Message::Scene(Box::new(scene.encode())).encode().unwrap();
    let Message::Scene(payload) = Message::decode(&wire).unwrap() else {
        panic!("expected a scene frame");
    };
    let decoded = Scene::decode(&payload).unwrap();

    let instance = decoded.find("/asm/box").unwrap().instance().unwrap();
    assert_eq!(**instance, *original);
}

#[test]
fn repeated_references_resolve_to_one_object() {
    let shared = Arc::new(cube());
    let n = 25;
    let children = (0..n)
        .map(|i| {
            Part::shape(
                format!("/grid/box_{}", i),
                shared.clone(),
                Transform::from_translation(i as f64 * 2.0, 0.0, 0.0),
            )
        })
        .collect();
    let scene = Scene::new(Part::group("/grid", children));

    let payload = scene.encode();
    assert_eq!(payload.instances.len(), 1);

    let decoded = Scene::decode(&payload).unwrap();
    let instances: Vec<&Arc<Instance>> = decoded.parts().filter_map(|p| p.instance()).collect();
    assert_eq!(instances.len(), n);

    let first = instances[0];
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, first)));
    // Only the decoded parts hold it; the decode cache is gone.
    assert_eq!(Arc::strong_count(first), n);
}

#[test]
fn nested_groups_keep_order_and_transforms() {
    let shared = Arc::new(cube());
    let scene = Scene::new(Part::group(
        "/a",
        vec![
            Part::group(
                "/a/b",
                vec![Part::shape("/a/b/c", shared.clone(), Transform::from_translation(0.0, 1.0, 0.0))],
            ),
            Part::shape("/a/d", shared, Transform::IDENTITY),
        ],
    ));

    let decoded = Scene::decode(&scene.encode()).unwrap();
    let ids: Vec<&str> = decoded.parts().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["/a", "/a/b", "/a/b/c", "/a/d"]);
    assert!(matches!(decoded.root.kind, PartKind::Group(_)));
    assert_eq!(
        decoded.find("/a/b/c").unwrap().transform,
        Transform::from_translation(0.0, 1.0, 0.0)
    );
}

#[test]
fn corrupted_buffer_in_scene_is_malformed_buffer() {
    let scene = Scene::new(Part::shape("/only", Arc::new(cube()), Transform::IDENTITY));
    let mut payload = scene.encode();
    // Six bytes: one float and half of another.
    payload.instances[0].vertices.buffer = "AACAPwAA".into();
    payload.instances[0].vertices.shape = 1;

    let err = Scene::decode(&payload).unwrap_err();
    assert!(matches!(err, Error::MalformedBuffer(_)));
    assert_eq!(err.code(), ErrorCode::MalformedBuffer);
}
