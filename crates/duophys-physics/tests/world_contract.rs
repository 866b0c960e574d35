//! The world contract exercised identically on both backends.

#![cfg(all(feature = "dim2", feature = "dim3"))]

use approx::assert_relative_eq;
use duophys_physics::prelude::*;
use duophys_test_utils::{weightless_world, world_2d, world_3d};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ball_at(position: impl Into<PhysVec>) -> BodyDesc {
    BodyDesc::dynamic(position).with_shape(ShapeDesc::ball(0.5))
}

fn static_ball(position: impl Into<PhysVec>) -> BodyDesc {
    BodyDesc::fixed(position).with_shape(ShapeDesc::ball(1.0))
}

fn ground() -> BodyDesc {
    BodyDesc::fixed([0.0, 0.0, 0.0]).with_shape(ShapeDesc::cuboid([10.0, 0.5, 10.0]))
}

fn run(world: &mut dyn PhysicsWorld, frames: usize) {
    for _ in 0..frames {
        world.step(1.0 / 60.0).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Dimension handling
// ---------------------------------------------------------------------------

#[test]
fn inputs_of_either_dimension_are_accepted() {
    let (mut engine, id) = world_2d();
    let world = engine.world_mut(id).unwrap();
    // Depth is dropped and up becomes screen-space up.
    let body = world.create_body(ball_at([1.0, 2.0, 7.0])).unwrap();
    let position = world.position(body).unwrap();
    assert_eq!(position.dimension(), Dimension::Two);
    assert_relative_eq!(position.x(), 1.0);
    assert_relative_eq!(position.y(), -2.0);

    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    let body = world.create_body(ball_at([1.0, 2.0])).unwrap();
    let position = world.position(body).unwrap();
    assert_eq!(position.dimension(), Dimension::Three);
    assert_relative_eq!(position.y(), -2.0);
    assert_eq!(position.z(), Some(0.0));
}

#[test]
fn bodies_fall_down_in_both_dimensions() {
    // Screen space: down is +Y.
    let (mut engine, id) = world_2d();
    let world = engine.world_mut(id).unwrap();
    let body = world.create_body(ball_at([0.0, 10.0])).unwrap();
    run(world, 30);
    assert!(world.position(body).unwrap().y() > 10.0);

    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    let body = world.create_body(ball_at([0.0, 10.0, 0.0])).unwrap();
    run(world, 30);
    assert!(world.position(body).unwrap().y() < 10.0);
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

#[test]
fn distance_length_defaults_to_separation() {
    let (mut engine, id) = weightless_world::<Rapier2d>();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(ball_at([0.0, 0.0])).unwrap();
    let b = world.create_body(ball_at([3.0, 4.0])).unwrap();

    let joint = world
        .create_constraint(ConstraintDesc::new(ConstraintKind::Distance, a, b))
        .unwrap();
    let record = world.constraint(joint).unwrap();
    assert_relative_eq!(record.length.unwrap(), 5.0, epsilon = 1e-5);
    assert!(!record.is_degraded());
}

#[test]
fn explicit_length_wins_over_separation() {
    let (mut engine, id) = weightless_world::<Rapier3d>();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(ball_at([0.0, 0.0, 0.0])).unwrap();
    let b = world.create_body(ball_at([0.0, 0.0, 8.0])).unwrap();
    let joint = world
        .create_constraint(ConstraintDesc::new(ConstraintKind::Rope, a, b).with_length(2.5))
        .unwrap();
    assert_relative_eq!(world.constraint(joint).unwrap().length.unwrap(), 2.5);
}

#[test]
fn gear_falls_back_to_distance_with_a_record() {
    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(ball_at([0.0, 5.0, 0.0])).unwrap();
    let b = world.create_body(ball_at([2.0, 5.0, 0.0])).unwrap();

    let joint = world
        .create_constraint(ConstraintDesc::new(ConstraintKind::Gear, a, b))
        .unwrap();
    let record = world.constraint(joint).unwrap();
    assert_eq!(record.kind, ConstraintKind::Gear);
    assert_eq!(record.realized_kind(), ConstraintKind::Distance);
    assert!(
        world
            .degradations()
            .iter()
            .any(|d| d.feature == "constraint:gear" && d.fallback == "constraint:distance")
    );
}

#[test]
fn constraint_needs_both_bodies_in_this_world() {
    let (mut engine, id) = world_2d();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(ball_at([0.0, 0.0])).unwrap();
    let err = world
        .create_constraint(ConstraintDesc::new(ConstraintKind::Fixed, a, BodyId(999)))
        .unwrap_err();
    assert!(matches!(
        err,
        PhysicsError::Resource(ResourceError::MissingBody { .. })
    ));
}

#[test]
fn removing_a_body_drops_its_constraints() {
    let (mut engine, id) = world_2d();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(ball_at([0.0, 0.0])).unwrap();
    let b = world.create_body(ball_at([1.0, 0.0])).unwrap();
    world
        .create_constraint(ConstraintDesc::new(ConstraintKind::Revolute, a, b))
        .unwrap();
    world.remove_body(b).unwrap();
    assert_eq!(world.constraint_count(), 0);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn raycast_hits_come_back_nearest_first() {
    let (mut engine, id) = weightless_world::<Rapier2d>();
    let world = engine.world_mut(id).unwrap();
    // Created out of order on purpose.
    let far = world.create_body(static_ball([10.0, 0.0])).unwrap();
    let near = world.create_body(static_ball([3.0, 0.0])).unwrap();
    let mid = world.create_body(static_ball([6.0, 0.0])).unwrap();

    let hits = world.raycast([0.0, 0.0].into(), [20.0, 0.0].into(), None);
    let bodies: Vec<BodyId> = hits.iter().map(|h| h.body).collect();
    assert_eq!(bodies, vec![near, mid, far]);
    let distances: Vec<f32> = hits.iter().map(|h| h.distance).collect();
    assert_relative_eq!(distances[0], 2.0, epsilon = 1e-4);
    assert_relative_eq!(distances[1], 5.0, epsilon = 1e-4);
    assert_relative_eq!(distances[2], 9.0, epsilon = 1e-4);
}

#[test]
fn raycast_skips_sensors_and_masked_bodies() {
    let (mut engine, id) = weightless_world::<Rapier3d>();
    let world = engine.world_mut(id).unwrap();
    world
        .create_body(static_ball([3.0, 0.0, 0.0]).sensor())
        .unwrap();
    world
        .create_body(static_ball([6.0, 0.0, 0.0]).with_filter(CollisionFilter::new(0b10, u32::MAX)))
        .unwrap();
    let visible = world.create_body(static_ball([9.0, 0.0, 0.0])).unwrap();

    let hits = world.raycast([0.0, 0.0, 0.0].into(), [20.0, 0.0, 0.0].into(), Some(0b01));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].body, visible);
}

#[test]
fn point_and_area_queries_find_bodies() {
    let (mut engine, id) = weightless_world::<Rapier2d>();
    let world = engine.world_mut(id).unwrap();
    let a = world.create_body(static_ball([0.0, 0.0])).unwrap();
    let b = world.create_body(static_ball([5.0, 0.0])).unwrap();

    assert_eq!(world.query_point([0.2, 0.2].into()), vec![a]);
    let mut found = world.query_aabb(&Aabb::new([-2.0, -2.0], [7.0, 2.0]));
    found.sort();
    assert_eq!(found, vec![a, b]);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn state_machine_follows_the_lifecycle() {
    let mut engine = duophys_test_utils::ready_engine::<Rapier2d>();
    let id = engine.create_world(None).unwrap();
    let world = engine.world_mut(id).unwrap();
    assert_eq!(world.state(), WorldState::Created);
    assert!(!world.tick(0.1).unwrap());

    world.start().unwrap();
    assert_eq!(world.state(), WorldState::Running);
    assert!(world.tick(0.1).unwrap());

    world.pause().unwrap();
    let time = world.simulated_time();
    world.step(0.1).unwrap();
    assert_relative_eq!(world.simulated_time(), time);

    world.resume().unwrap();
    assert_eq!(world.state(), WorldState::Running);
    world.stop().unwrap();
    assert_eq!(world.state(), WorldState::Stopped);
    assert!(!world.tick(0.1).unwrap());

    world.destroy();
    assert_eq!(world.state(), WorldState::Destroyed);
    assert!(world.start().is_err());
    assert!(matches!(
        world.step(0.1),
        Err(ResourceError::WorldDestroyed(_))
    ));
}

#[test]
fn clear_keeps_the_world_usable() {
    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    world.create_body(ground()).unwrap();
    world.create_body(ball_at([0.0, 2.0, 0.0])).unwrap();
    world.clear();
    assert_eq!(world.body_count(), 0);
    assert!(world.is_running());
    world.create_body(ball_at([0.0, 2.0, 0.0])).unwrap();
    assert_eq!(world.body_count(), 1);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn collision_phases_pair_up() {
    let (mut engine, id) = world_2d();
    let world = engine.world_mut(id).unwrap();
    let floor = world.create_body(ground()).unwrap();
    let ball = world.create_body(ball_at([0.0, -2.0])).unwrap();
    let events = world.collision_mailbox(Topic::World);
    let ball_events = world.collision_mailbox(Topic::Body(ball));

    run(world, 120);
    let seen = events.drain();
    assert_eq!(seen.first().map(|e| e.kind), Some(CollisionKind::Start));
    assert!(seen.iter().all(|e| e.body_a == floor && e.body_b == ball));
    assert!(seen.iter().any(|e| e.kind == CollisionKind::Active));
    assert!(seen.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let mut touching = false;
    for event in &seen {
        match event.kind {
            CollisionKind::Start => {
                assert!(!touching);
                touching = true;
            }
            CollisionKind::Active => assert!(touching),
            CollisionKind::End => {
                assert!(touching);
                touching = false;
            }
        }
    }
    assert!(touching);
    assert!(world.check_collision(ball, floor));
    assert_eq!(world.contact_pairs(), vec![(floor, ball)]);
    assert_eq!(ball_events.len(), seen.len());

    world.remove_body(ball).unwrap();
    let after = events.drain();
    assert_eq!(after.last().map(|e| e.kind), Some(CollisionKind::End));
    assert!(!world.check_collision(ball, floor));
}

#[test]
fn mailboxes_fan_out_independently() {
    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    let first = world.body_event_mailbox(Topic::World);
    let second = world.body_event_mailbox(Topic::World);

    let body = world.create_body(ball_at([0.0, 1.0, 0.0])).unwrap();
    world.set_mass(body, 3.0).unwrap();

    assert_eq!(first.drain().len(), 2);
    assert_eq!(second.len(), 2);
    assert!(world.unsubscribe_body_events(first.id()));
    world.set_user_data(body, 7).unwrap();
    assert!(first.is_empty());
    assert_eq!(second.len(), 3);
}

#[test]
fn callbacks_receive_collision_events() {
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    world.create_body(ground()).unwrap();
    let ball = world.create_body(ball_at([0.0, 1.5, 0.0])).unwrap();

    let starts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&starts);
    world.on_collision(
        Topic::Body(ball),
        Box::new(move |event| {
            if event.kind == CollisionKind::Start {
                counter.set(counter.get() + 1);
            }
        }),
    );
    run(world, 90);
    assert!(starts.get() >= 1);
}

// ---------------------------------------------------------------------------
// Pooling
// ---------------------------------------------------------------------------

#[test]
fn pooled_handles_come_back_reset() {
    let (mut engine, id) = world_2d();
    let body = {
        let world = engine.world_mut(id).unwrap();
        let body = world
            .create_body(ball_at([4.0, 4.0]).with_velocity([1.0, 1.0]))
            .unwrap();
        world.remove_body(body).unwrap();
        body
    };
    assert_eq!(engine.pooled_handles(), 1);

    let world = engine.world_mut(id).unwrap();
    let reused = world.create_body(ball_at([0.0, 0.0])).unwrap();
    assert_ne!(reused, body);
    let state = world.body_state(reused).unwrap();
    assert_relative_eq!(state.velocity.x(), 0.0);
    assert_relative_eq!(state.position.x(), 0.0);
    assert_eq!(engine.pooled_handles(), 0);
}

#[test]
fn gameplay_style_access_through_body_mut() {
    let (mut engine, id) = world_3d();
    let world = engine.world_mut(id).unwrap();
    let body = world.create_body(ball_at([0.0, 1.0, 0.0])).unwrap();
    {
        let mut handle = world.body_mut(body).unwrap();
        handle.set_velocity([1.0, 0.0, 0.0]).unwrap();
        handle.set_mass(4.0).unwrap();
        handle.set_user_data(42).unwrap();
        handle.set_gravity_scale(0.5).unwrap();
        assert_eq!(handle.user_data().unwrap(), 42);
    }
    assert_relative_eq!(world.mass(body).unwrap(), 4.0, epsilon = 1e-4);
    assert_relative_eq!(world.gravity_scale(body).unwrap(), 0.5);
    assert_relative_eq!(world.velocity(body).unwrap().x(), 1.0);
    assert!(world.body_mut(BodyId(12_345)).is_err());
}
