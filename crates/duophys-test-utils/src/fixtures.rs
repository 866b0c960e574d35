//! Ready-to-use engines, worlds, managers and device profiles.

use duophys_core::prelude::*;
use duophys_physics::engine::Engine;
use duophys_physics::kernel::Kernel;
use duophys_physics::manager::PhysicsManager;
use duophys_physics::rapier::{Rapier2d, Rapier3d};

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// 16 GB, 8 cores, desktop: the High tier.
pub fn desktop_device() -> DeviceInfo {
    DeviceInfo::new(Some(16.0), 8, "Mozilla/5.0 (X11; Linux x86_64)")
}

/// 2 GB, 2 cores, Android: the Low tier.
pub fn low_end_mobile_device() -> DeviceInfo {
    DeviceInfo::new(Some(2.0), 2, "Mozilla/5.0 (Linux; Android 9)")
}

/// 4 GB, 6 cores, iPhone: the Medium tier.
pub fn mid_range_mobile_device() -> DeviceInfo {
    DeviceInfo::new(
        Some(4.0),
        6,
        "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X)",
    )
}

// ---------------------------------------------------------------------------
// Engines and worlds
// ---------------------------------------------------------------------------

/// An initialized engine with the default configuration.
///
/// # Panics
///
/// Panics if the default configuration does not validate.
pub fn ready_engine<K: Kernel>() -> Engine<K> {
    let mut engine = Engine::new(PhysicsConfig::default());
    pollster::block_on(engine.initialize()).expect("default config initializes");
    engine
}

fn running_world<K: Kernel>(config: Option<WorldConfig>) -> (Engine<K>, WorldId) {
    let mut engine = ready_engine::<K>();
    let id = engine.create_world(config).expect("world is created");
    {
        use duophys_physics::contract::PhysicsWorld;
        engine
            .world_mut(id)
            .expect("world exists")
            .start()
            .expect("world starts");
    }
    (engine, id)
}

/// A running 2-D world with default gravity.
pub fn world_2d() -> (Engine<Rapier2d>, WorldId) {
    running_world(None)
}

/// A running 3-D world with default gravity.
pub fn world_3d() -> (Engine<Rapier3d>, WorldId) {
    running_world(None)
}

/// A running world of `dimension` without gravity.
pub fn weightless_world<K: Kernel>() -> (Engine<K>, WorldId) {
    let config = WorldConfig::new(K::DIMENSION).with_gravity(PhysVec::zero(K::DIMENSION));
    running_world(Some(config))
}

// ---------------------------------------------------------------------------
// Managers
// ---------------------------------------------------------------------------

/// A manager initialized for `dimension` on `device`, with one active world.
///
/// # Panics
///
/// Panics if initialization or world creation fails.
pub fn ready_manager(dimension: Dimension, device: DeviceInfo) -> PhysicsManager {
    let mut manager = PhysicsManager::new(PhysicsConfig::default(), device);
    pollster::block_on(manager.initialize(dimension, None)).expect("manager initializes");
    manager.create_world(None).expect("world is created");
    manager
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
