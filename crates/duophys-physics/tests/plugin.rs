//! The bevy plugin driving the manager from `Time`.

#![cfg(all(feature = "dim2", feature = "dim3"))]

use std::time::Duration;

use bevy_time::Time;
use duophys_physics::prelude::*;
use duophys_test_utils::{headless_physics_app, minimal_test_app};

#[test]
fn screen_space_bodies_fall_down_the_screen() {
    let mut app = headless_physics_app(Dimension::Two);
    let body = app
        .world_mut()
        .non_send_resource_mut::<PhysicsManager>()
        .create_body(BodyDesc::dynamic([0.0, 0.0]).with_shape(ShapeDesc::ball(0.5)))
        .unwrap();
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_millis(16));

    for _ in 0..20 {
        app.update();
    }

    let manager = app.world().non_send_resource::<PhysicsManager>();
    let world = manager.world().unwrap();
    assert_eq!(world.dimension(), Dimension::Two);
    assert!(world.position(body).unwrap().y() > 0.0);
}

#[test]
fn without_time_the_world_stays_put() {
    let mut app = minimal_test_app();
    let body = app
        .world_mut()
        .non_send_resource_mut::<PhysicsManager>()
        .create_body(BodyDesc::dynamic([0.0, 0.0]).with_shape(ShapeDesc::ball(0.5)))
        .unwrap();
    app.update();
    app.update();

    let manager = app.world().non_send_resource::<PhysicsManager>();
    let world = manager.world().unwrap();
    assert_eq!(world.simulated_time(), 0.0);
    assert_eq!(world.position(body).unwrap().y(), 0.0);
}
