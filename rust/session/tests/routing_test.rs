// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing scenarios over tokio channel sinks, as the host wires them.

use cadview_core::{
    Camera, ErrorCode, Frame, Instance, Message, Part, Role, Scene, StateDelta, Transform,
};
use cadview_session::{Destination, RoutingError, SessionId, SessionRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;

type Sink = mpsc::Sender<Arc<Frame>>;

fn peer() -> (Sink, mpsc::Receiver<Arc<Frame>>) {
    mpsc::channel(16)
}

fn scene_message(tag: &str) -> Message {
    let instance = Arc::new(Instance::new(vec![0.0; 9], Vec::new(), vec![0, 1, 2], Vec::new()));
    let scene = Scene::new(Part::shape(format!("/{}", tag), instance, Transform::IDENTITY));
    Message::Scene(Box::new(scene.encode()))
}

fn camera_delta(zoom: f64) -> Message {
    Message::StateDelta(StateDelta {
        camera: Some(Camera {
            zoom,
            ..Camera::default()
        }),
        ..StateDelta::default()
    })
}

fn drain(rx: &mut mpsc::Receiver<Arc<Frame>>) -> Vec<Arc<Frame>> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn second_computation_peer_conflicts_and_first_stays_routable() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (first_tx, _first_rx) = peer();
    let first = registry.next_connection_id();
    registry.register(&session, first, Role::Computation, first_tx).unwrap();

    let (second_tx, _second_rx) = peer();
    let second = registry.next_connection_id();
    let err = registry
        .register(&session, second, Role::Computation, second_tx)
        .unwrap_err();
    assert_eq!(err, RoutingError::RoleConflict(session.clone()));
    assert_eq!(err.code(), ErrorCode::RoleConflict);
    assert_eq!(err.to_failure().code, ErrorCode::RoleConflict);

    let (viz_tx, mut viz_rx) = peer();
    registry
        .register(&session, registry.next_connection_id(), Role::Visualization, viz_tx)
        .unwrap();

    let routed = registry.route(first, scene_message("a")).unwrap();
    assert_eq!(routed.destination, Destination::AllVisualization);
    assert_eq!(routed.delivered, 1);
    assert!(viz_rx.recv().await.is_some());

    assert_eq!(
        registry.route(second, scene_message("b")),
        Err(RoutingError::NotRegistered(second))
    );
}

#[tokio::test]
async fn state_delta_waits_for_computation_peer() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (viz_tx, _viz_rx) = peer();
    let viz = registry.next_connection_id();
    registry.register(&session, viz, Role::Visualization, viz_tx).unwrap();

    for zoom in [1.5, 2.0] {
        let err = registry.route(viz, camera_delta(zoom)).unwrap_err();
        assert_eq!(err, RoutingError::NoComputationPeer(session.clone()));
    }

    let (comp_tx, mut comp_rx) = peer();
    let flushed = registry
        .register(&session, registry.next_connection_id(), Role::Computation, comp_tx)
        .unwrap();
    assert_eq!(flushed, 2);

    let frames = drain(&mut comp_rx);
    assert_eq!(frames.len(), 2);
    assert_eq!(*frames[0], Frame::Message(camera_delta(1.5)));
    assert_eq!(*frames[1], Frame::Message(camera_delta(2.0)));

    // Now routed directly
    let routed = registry.route(viz, camera_delta(3.0)).unwrap();
    assert_eq!(routed.destination, Destination::Computation);
    assert_eq!(*comp_rx.recv().await.unwrap(), Frame::Message(camera_delta(3.0)));
    assert_eq!(registry.snapshot()[0].pending, 0);
}

#[tokio::test]
async fn late_viewer_receives_only_the_last_scene() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (comp_tx, _comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&session, comp, Role::Computation, comp_tx).unwrap();

    // Nobody listening yet; the scene is still cached
    assert_eq!(registry.route(comp, scene_message("old")).unwrap().delivered, 0);
    registry.route(comp, scene_message("new")).unwrap();
    registry
        .route(comp, Message::Command(cadview_core::Command::ResetCamera))
        .unwrap();

    let (viz_tx, mut viz_rx) = peer();
    let replayed = registry
        .register(&session, registry.next_connection_id(), Role::Visualization, viz_tx)
        .unwrap();
    assert_eq!(replayed, 1);

    let frames = drain(&mut viz_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(*frames[0], Frame::Message(scene_message("new")));
    assert!(registry.snapshot()[0].has_scene);
}

#[tokio::test]
async fn dropped_receiver_unregisters_peer() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (comp_tx, _comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&session, comp, Role::Computation, comp_tx).unwrap();

    let (viz_tx, viz_rx) = peer();
    registry
        .register(&session, registry.next_connection_id(), Role::Visualization, viz_tx)
        .unwrap();
    drop(viz_rx);

    assert_eq!(registry.route(comp, scene_message("x")).unwrap().delivered, 0);
    assert_eq!(registry.snapshot()[0].visualization, 0);
    assert_eq!(registry.connection_count(), 1);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();

    let (comp_tx, _comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&"left".into(), comp, Role::Computation, comp_tx).unwrap();

    let (other_tx, mut other_rx) = peer();
    registry
        .register(&"right".into(), registry.next_connection_id(), Role::Visualization, other_tx)
        .unwrap();

    assert_eq!(registry.route(comp, scene_message("l")).unwrap().delivered, 0);
    assert!(drain(&mut other_rx).is_empty());
    assert_eq!(registry.session_count(), 2);
}

#[tokio::test]
async fn repeated_register_keeps_the_cached_scene() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (comp_tx, _comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&session, comp, Role::Computation, comp_tx).unwrap();
    registry.route(comp, scene_message("kept")).unwrap();

    let (again_tx, _again_rx) = peer();
    registry.register(&session, comp, Role::Computation, again_tx).unwrap();
    let stats = registry.snapshot();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].has_scene);
    assert!(stats[0].computation);
    assert_eq!(registry.connection_count(), 1);

    let (viz_tx, mut viz_rx) = peer();
    let replayed = registry
        .register(&session, registry.next_connection_id(), Role::Visualization, viz_tx)
        .unwrap();
    assert_eq!(replayed, 1);
    assert_eq!(*drain(&mut viz_rx)[0], Frame::Message(scene_message("kept")));
}

#[tokio::test]
async fn rejected_role_change_keeps_existing_registration() {
    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("main");

    let (comp_tx, mut comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&session, comp, Role::Computation, comp_tx).unwrap();

    let (viz_tx, mut viz_rx) = peer();
    let viz = registry.next_connection_id();
    registry.register(&session, viz, Role::Visualization, viz_tx.clone()).unwrap();

    let err = registry.register(&session, viz, Role::Computation, viz_tx).unwrap_err();
    assert_eq!(err, RoutingError::RoleConflict(session.clone()));
    assert_eq!(registry.snapshot()[0].visualization, 1);

    // Still a viewer in both directions
    assert_eq!(registry.route(comp, scene_message("a")).unwrap().delivered, 1);
    assert_eq!(drain(&mut viz_rx).len(), 1);
    registry.route(viz, camera_delta(2.0)).unwrap();
    assert_eq!(*comp_rx.recv().await.unwrap(), Frame::Message(camera_delta(2.0)));
}

fn scene_tags(frames: &[Arc<Frame>]) -> Vec<usize> {
    frames
        .iter()
        .map(|frame| match &**frame {
            Frame::Message(Message::Scene(payload)) => {
                let scene = Scene::decode(payload).unwrap();
                scene.root.id.trim_start_matches('/').parse().unwrap()
            }
            other => panic!("expected a scene, got {:?}", other),
        })
        .collect()
}

#[test]
fn broadcasts_survive_concurrent_viewer_churn() {
    const SCENES: usize = 200;
    const CHURNERS: usize = 4;
    const ROUNDS: usize = 50;

    let registry: SessionRegistry<Sink> = SessionRegistry::default();
    let session = SessionId::from("busy");

    let (comp_tx, _comp_rx) = peer();
    let comp = registry.next_connection_id();
    registry.register(&session, comp, Role::Computation, comp_tx).unwrap();
    let (steady_tx, mut steady_rx) = mpsc::channel(SCENES + 1);
    registry
        .register(&session, registry.next_connection_id(), Role::Visualization, steady_tx)
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..CHURNERS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let (tx, mut rx) = mpsc::channel(SCENES + 1);
                    let conn = registry.next_connection_id();
                    registry.register(&session, conn, Role::Visualization, tx).unwrap();
                    std::thread::yield_now();
                    assert_eq!(registry.unregister(conn), Some((session.clone(), Role::Visualization)));

                    let tags = scene_tags(&drain(&mut rx));
                    assert!(tags.windows(2).all(|w| w[0] < w[1]), "out of order: {:?}", tags);
                }
            });
        }
        for n in 0..SCENES {
            let routed = registry.route(comp, scene_message(&n.to_string())).unwrap();
            assert!(routed.delivered >= 1);
        }
    });

    assert_eq!(scene_tags(&drain(&mut steady_rx)), (0..SCENES).collect::<Vec<_>>());
    assert_eq!(registry.connection_count(), 2);
    let stats = registry.snapshot();
    assert_eq!(stats[0].visualization, 1);
    assert!(stats[0].has_scene);
}
