//! Manager lifecycle, engine selection and adaptive quality.

#![cfg(all(feature = "dim2", feature = "dim3"))]

use approx::assert_relative_eq;
use duophys_physics::prelude::*;
use duophys_test_utils::{
    desktop_device, jittered_frames, low_end_mobile_device, mid_range_mobile_device,
    ready_manager, steady_frames,
};

fn manager(device: DeviceInfo) -> PhysicsManager {
    PhysicsManager::new(PhysicsConfig::default(), device)
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[test]
fn unknown_engine_publishes_an_error() {
    let mut manager = manager(desktop_device());
    let events = manager.mailbox();
    let err = pollster::block_on(manager.initialize(Dimension::Two, Some("box2d"))).unwrap_err();
    assert!(matches!(
        err,
        InitError::InvalidConfig(ConfigError::UnsupportedEngine { .. })
    ));
    assert!(!manager.is_initialized());
    let seen = events.drain();
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0], ManagerEvent::Error { .. }));
}

#[test]
fn engine_name_must_match_the_dimension() {
    let mut manager = manager(desktop_device());
    assert!(pollster::block_on(manager.initialize(Dimension::Two, Some("rapier3d"))).is_err());
    assert!(pollster::block_on(manager.initialize(Dimension::Two, Some("rapier2d"))).is_ok());
    assert_eq!(
        manager.engine().map(ActiveEngine::engine_type),
        Some(EngineType::Rapier2d)
    );
}

#[test]
fn switching_engines_drops_old_worlds() {
    let mut manager = ready_manager(Dimension::Two, desktop_device());
    manager
        .create_body(BodyDesc::dynamic([0.0, 1.0]).with_shape(ShapeDesc::ball(0.5)))
        .unwrap();
    let events = manager.mailbox();

    pollster::block_on(manager.switch_engine(Dimension::Three, None)).unwrap();
    assert!(manager.active_world().is_none());
    assert_eq!(
        manager.engine().map(ActiveEngine::dimension),
        Some(Dimension::Three)
    );
    let seen = events.drain();
    assert_eq!(seen[0], ManagerEvent::Destroyed);
    assert!(matches!(seen[1], ManagerEvent::Initialized { .. }));

    manager.create_world(None).unwrap();
    assert_eq!(manager.world().unwrap().dimension(), Dimension::Three);
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

#[test]
fn bodies_go_to_the_active_world() {
    let mut manager = ready_manager(Dimension::Three, desktop_device());
    let first = manager.active_world().unwrap();
    let second = manager.create_world(None).unwrap();
    assert_eq!(manager.active_world(), Some(second));

    manager.set_active_world(first).unwrap();
    manager
        .create_body(SimpleBodyConfig::new(SimpleShape::Sphere { radius: 0.5 }, [0.0, 1.0, 0.0]))
        .unwrap();
    assert_eq!(manager.world_by_id(first).unwrap().body_count(), 1);
    assert_eq!(manager.world_by_id(second).unwrap().body_count(), 0);
}

#[test]
fn update_ticks_running_worlds() {
    let mut manager = ready_manager(Dimension::Two, desktop_device());
    let body = manager
        .create_body(BodyDesc::dynamic([0.0, 10.0]).with_shape(ShapeDesc::ball(0.5)))
        .unwrap();
    for dt in steady_frames(60.0, 30) {
        manager.update(dt).unwrap();
    }
    let world = manager.world().unwrap();
    assert!(world.position(body).unwrap().y() > 10.0);
    assert_relative_eq!(world.simulated_time(), 0.5, epsilon = 1e-3);

    let metrics = manager.performance_metrics().unwrap();
    assert_eq!(metrics.worlds, 1);
    assert_eq!(metrics.bodies, 1);
}

// ---------------------------------------------------------------------------
// Adaptive quality
// ---------------------------------------------------------------------------

#[test]
fn slow_frames_lower_quality_and_notify() {
    let mut manager = ready_manager(Dimension::Three, desktop_device());
    assert_eq!(manager.quality(), Some(QualityLevel::High));
    let events = manager.mailbox();

    let decisions: Vec<OptimizerDecision> = steady_frames(30.0, 10)
        .into_iter()
        .map(|dt| manager.update(dt).unwrap())
        .collect();
    assert_eq!(decisions[9].quality, Some(QualityLevel::Medium));
    assert_eq!(manager.quality(), Some(QualityLevel::Medium));
    assert!(events.drain().contains(&ManagerEvent::QualityChanged {
        from: QualityLevel::High,
        to: QualityLevel::Medium,
    }));

    let medium = PhysicsConfig::default().quality.preset(QualityLevel::Medium);
    assert_eq!(
        manager.world().unwrap().solver_iterations(),
        medium.solver_iterations
    );
}

#[test]
fn jitter_around_the_target_never_changes_quality() {
    let mut manager = ready_manager(Dimension::Two, desktop_device());
    let events = manager.mailbox();
    for dt in jittered_frames(60.0, 0.05, 300, 11) {
        let decision = manager.update(dt).unwrap();
        assert!(decision.quality.is_none());
    }
    assert_eq!(manager.quality(), Some(QualityLevel::High));
    assert!(
        !events
            .drain()
            .iter()
            .any(|e| matches!(e, ManagerEvent::QualityChanged { .. }))
    );
}

#[test]
fn mid_range_phone_starts_at_medium() {
    let manager = ready_manager(Dimension::Three, mid_range_mobile_device());
    assert!(manager.device().is_mobile());
    assert_eq!(manager.tier(), DeviceTier::Medium);
    assert_eq!(manager.quality(), Some(QualityLevel::Medium));
}

#[test]
fn low_tier_tops_out_at_medium() {
    let mut manager = ready_manager(Dimension::Two, low_end_mobile_device());
    assert_eq!(manager.quality(), Some(QualityLevel::Low));
    for dt in steady_frames(120.0, 200) {
        manager.update(dt).unwrap();
    }
    assert_eq!(manager.quality(), Some(QualityLevel::Medium));
}

#[test]
fn tier_override_applies_the_device_preset() {
    let mut manager = ready_manager(Dimension::Two, desktop_device());
    manager.set_device_tier(DeviceTier::Low).unwrap();
    assert_eq!(manager.tier(), DeviceTier::Low);
    let low = PhysicsConfig::default().device.preset(DeviceTier::Low);
    assert_eq!(
        manager.world().unwrap().solver_iterations(),
        low.solver_iterations
    );
}

#[test]
fn mobile_bundle_reaches_later_worlds() {
    let mut manager = ready_manager(Dimension::Three, low_end_mobile_device());
    manager.enable_mobile_optimizations().unwrap();
    manager.create_world(None).unwrap();
    let mobile = PhysicsConfig::default().mobile;
    let world = manager.world().unwrap();
    assert_eq!(world.sleep_thresholds(), mobile.sleep_thresholds);
    assert_eq!(world.solver_iterations(), mobile.solver_iterations);
    assert!(
        world
            .degradations()
            .iter()
            .any(|d| d.feature == "broad_phase:mobile")
    );
}
