//! End-to-end animation scenarios through the public API.

use std::sync::Arc;

use animflow_core::breakpoint::Breakpoint;
use animflow_core::config::{AnimatorConfig, MoveMode};
use animflow_core::engine::Animator;
use animflow_core::entity::{ClientRef, Entity, EntityKind, OperatorRef, TransporterRef};
use animflow_core::geometry::Bounds;
use animflow_core::id::EntityKey;
use animflow_core::model::{StationKind, SurfaceModel, WayPointRecord};
use animflow_core::recording::RecordingLog;
use animflow_core::test_utils::*;

// ===========================================================================
// Helpers
// ===========================================================================

fn animator_with(model: SurfaceModel, config: AnimatorConfig) -> (Animator, RecordingCanvas) {
    let canvas = RecordingCanvas::new();
    let animator = Animator::new(Arc::new(model), config, Box::new(canvas.clone())).unwrap();
    (animator, canvas)
}

// ===========================================================================
// Movement
// ===========================================================================

#[test]
fn client_moves_from_a_to_b_and_rests_at_b() {
    let (mut animator, _canvas) = animator_with(two_station_model(), fast_config());
    let client = mover(7, 1, 2);
    let sim = ScriptedSimulation::new().with_client(client.clone());

    animator.process_client(&sim, Some(&client), 10);

    let statics = animator.static_icons();
    assert_eq!(statics.len(), 1);
    assert_eq!(statics[0].entity.key(), EntityKey(7));
    assert_eq!(statics[0].destination, Some(station(2)));
    assert!(animator.moving_icons().is_empty());
}

#[test]
fn waiting_clients_stay_put_while_another_moves() {
    let (mut animator, canvas) = animator_with(two_station_model(), fast_config());
    let moving = mover(1, 1, 2);
    let waiting = ClientRef {
        next_station: Some(station(1)),
        ..ClientRef::new(2)
    };
    let sim = ScriptedSimulation::new()
        .with_client(moving.clone())
        .with_client(waiting);

    animator.process_client(&sim, Some(&moving), 0);

    let positions: Vec<_> = canvas
        .frames()
        .iter()
        .filter_map(|f| f.iter().find(|i| i.entity.key() == EntityKey(2)).map(|i| i.position()))
        .collect();
    assert!(!positions.is_empty());
    assert!(positions.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn clients_in_a_sub_model_are_drawn_at_its_box() {
    let mut model = SurfaceModel::new();
    model
        .add_station(station(1), "A", StationKind::Box, Bounds::new(0, 0, 100, 50))
        .add_station(station(5), "Sub", StationKind::SubModel, Bounds::new(300, 0, 100, 50))
        .add_sub_station(station(5), station(51), "Inner", StationKind::Box, Bounds::new(10, 10, 100, 50))
        .connect(station(1), station(5), None);
    let (mut animator, canvas) = animator_with(model, fast_config());

    let client = mover(1, 1, 51);
    let sim = ScriptedSimulation::new().with_client(client.clone());
    animator.process_client(&sim, Some(&client), 0);

    // Animated towards the sub-model box.
    assert!(canvas.frame_count() > 1);
    let statics = animator.static_icons();
    assert_eq!(statics.len(), 1);
    assert_eq!((statics[0].x, statics[0].y), (375, -12));

    // Moving inside the sub-model shows no path.
    let frames_before = canvas.frame_count();
    let inner = mover(1, 51, 51);
    animator.process_client(&ScriptedSimulation::new().with_client(inner.clone()), Some(&inner), 0);
    assert_eq!(canvas.frame_count(), frames_before + 1);
}

#[test]
fn transporter_passes_its_way_points() {
    let mut model = SurfaceModel::new();
    model
        .add_station(station(1), "Depot", StationKind::TransportParking, Bounds::new(0, 0, 100, 50))
        .add_station(station(2), "Dock", StationKind::TransportDestination, Bounds::new(400, 0, 100, 50))
        .add_station(
            station(3),
            "",
            StationKind::WayPoint {
                records: vec![WayPointRecord::new("Depot", "Dock", 1)],
            },
            Bounds::new(200, 300, 10, 10),
        );
    let (mut animator, canvas) = animator_with(model, fast_config());
    let transporter = TransporterRef {
        key: EntityKey(3),
        last_position: Some(station(1)),
        position: Some(station(2)),
        ..TransporterRef::default()
    };
    let sim = ScriptedSimulation::new().with_transporter(transporter.clone());

    animator.process_transporter(&sim, &transporter, 0);

    // Depot -> way point -> Dock.
    assert_eq!(animator.route_cache().len(), 2);
    let lowest = canvas
        .frames()
        .iter()
        .flatten()
        .filter(|i| i.entity.kind() == EntityKind::Transporter)
        .map(|i| i.y)
        .max()
        .unwrap();
    assert!(lowest > 250);
}

#[test]
fn operators_sit_at_the_bottom_edge() {
    let (mut animator, _canvas) = animator_with(two_station_model(), fast_config());
    let operator = OperatorRef {
        key: EntityKey(11),
        group: "Workers".into(),
        station: Some(station(1)),
        icon: None,
    };
    let client = mover(1, 1, 2);
    let sim = ScriptedSimulation::new()
        .with_client(client.clone())
        .with_operator(operator);

    animator.process_client(&sim, Some(&client), 0);

    let op = animator
        .static_icons()
        .into_iter()
        .find(|i| i.entity.kind() == EntityKind::Operator)
        .unwrap();
    assert_eq!((op.x, op.y), (75, 25));
}

#[test]
fn resources_are_skipped_when_not_animated() {
    let config = AnimatorConfig {
        animate_resources: false,
        ..fast_config()
    };
    let (mut animator, _canvas) = animator_with(two_station_model(), config);
    let client = mover(1, 1, 2);
    let sim = ScriptedSimulation::new()
        .with_client(client.clone())
        .with_operator(OperatorRef {
            station: Some(station(1)),
            ..OperatorRef::default()
        });
    animator.process_client(&sim, Some(&client), 0);
    assert_eq!(animator.static_icons().len(), 1);
}

#[test]
fn multi_mode_moves_simultaneous_clients_together() {
    let config = AnimatorConfig {
        move_mode: MoveMode::Multi,
        ..fast_config()
    };
    let (mut animator, canvas) = animator_with(line_model(3), config);
    let a = mover(1, 1, 2);
    let b = mover(2, 2, 3);
    let c = mover(3, 1, 2);
    let sim = ScriptedSimulation::new()
        .at(100)
        .with_client(a.clone())
        .with_client(b.clone())
        .with_client(c.clone());

    animator.process_client(&sim, Some(&a), 0);
    animator.process_client(&sim, Some(&b), 0);
    animator.process_client(&sim, Some(&c), 0);
    let before = canvas.frame_count();
    animator.process_client(&sim, None, 0);

    let frames = canvas.frames();
    let batch = &frames[before..];
    let together = batch
        .iter()
        .any(|f| f.iter().filter(|i| i.source != i.destination && i.entity.key() != EntityKey(1)).count() == 2);
    assert!(together);
    assert!(animator.pending_moves().is_empty());
}

// ===========================================================================
// Breakpoints
// ===========================================================================

#[test]
fn breakpoint_fires_for_clients_heading_to_its_station() {
    let (animator, _canvas) = animator_with(line_model(6), fast_config());
    animator.set_break_points(&[
        Breakpoint::new(station(5)).with_client_type(1),
        Breakpoint::new(station(3)).with_condition("Queue >= 4"),
    ]);
    let sim = ScriptedSimulation::new()
        .with_variable("Queue", 2.0)
        .with_client_types(&["Walk-in", "Phone"]);

    let mut phone = mover(1, 4, 5);
    phone.client_type = 1;
    let mut walk_in = mover(2, 4, 5);
    walk_in.client_type = 0;

    assert!(animator.test_break_points(&sim, &Entity::Client(phone)));
    assert!(!animator.test_break_points(&sim, &Entity::Client(walk_in)));

    let to_three = Entity::Client(mover(3, 2, 3));
    assert!(!animator.test_break_points(&sim, &to_three));
    let busy = sim.clone().with_variable("Queue", 4.0);
    assert!(animator.test_break_points(&busy, &to_three));
}

// ===========================================================================
// Recording
// ===========================================================================

#[test]
fn recording_log_round_trips_a_run() {
    let (mut animator, _canvas) = animator_with(line_model(3), fast_config());
    animator.set_full_recording(true);
    let mut sim = ScriptedSimulation::new().with_client_types(&["Walk-in"]);
    let mut log = RecordingLog::new();

    let first = mover(1, 1, 2);
    sim.upsert_client(first.clone());
    animator.process_client(&sim, Some(&first), 0);
    log.push(animator.animation_step_info(sim.time, &sim.client_types));

    // Client 1 is seen resting at station 2 while client 2 arrives, then
    // moves on.
    sim.time = 1_000;
    let second = mover(2, 1, 2);
    sim.upsert_client(second.clone());
    animator.process_client(&sim, Some(&second), 0);
    let onward = mover(1, 2, 3);
    sim.upsert_client(onward.clone());
    animator.process_client(&sim, Some(&onward), 0);
    log.push(animator.animation_step_info(sim.time, &sim.client_types));

    assert_eq!(log.len(), 2);
    assert_eq!(log.steps[0].moving.len(), 1);
    assert_eq!(log.steps[0].moving[0].samples[0].type_name, "Walk-in");
    assert_eq!(log.steps[1].moving.len(), 2);
    let onward_track = log.steps[1]
        .moving
        .iter()
        .find(|m| m.samples.first().is_some_and(|s| s.id == 1))
        .unwrap();
    assert_eq!(onward_track.source_station, Some(station(2)));
    assert_eq!(onward_track.pre.as_ref().map(|p| (p.x, p.y)), Some((275, -12)));

    let bytes = log.encode().unwrap();
    let back = RecordingLog::decode(&bytes).unwrap();
    assert_eq!(back, log);
}
