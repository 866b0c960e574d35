//! Bevy frame driver for the physics manager.

use bevy_app::{App, Plugin, Update};
use bevy_ecs::system::{NonSendMut, Res};
use bevy_time::Time;
use duophys_core::prelude::*;
use tracing::{error, warn};

use crate::manager::PhysicsManager;

/// Bevy plugin that owns a [`PhysicsManager`] and ticks it every frame.
///
/// # Usage
///
/// ```ignore
/// app.add_plugins(DuophysPlugin::new(Dimension::Two));
/// ```
///
/// Initialization runs to completion inside [`build`](Plugin::build). When it
/// fails the error is logged and the app keeps running without physics; the
/// manager is still inserted so it can be initialized again later.
#[derive(Debug, Clone)]
pub struct DuophysPlugin {
    pub dimension: Dimension,
    /// Backend name; the dimension default when `None`.
    pub engine: Option<String>,
    pub config: PhysicsConfig,
    /// Detected from the host when `None`.
    pub device: Option<DeviceInfo>,
    pub create_default_world: bool,
}

impl DuophysPlugin {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            engine: None,
            config: PhysicsConfig::default(),
            device: None,
            create_default_world: true,
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PhysicsConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = Some(device);
        self
    }

    #[must_use]
    pub const fn without_default_world(mut self) -> Self {
        self.create_default_world = false;
        self
    }
}

impl Plugin for DuophysPlugin {
    fn build(&self, app: &mut App) {
        let device = self.device.clone().unwrap_or_else(DeviceInfo::from_host);
        let mut manager = PhysicsManager::new(self.config.clone(), device);
        match pollster::block_on(manager.initialize(self.dimension, self.engine.as_deref())) {
            Ok(()) if self.create_default_world => {
                if let Err(e) = manager.create_world(None) {
                    error!("duophys: failed to create the default world: {e}");
                }
            }
            Ok(()) => {}
            Err(e) => error!("duophys: continuing without physics: {e}"),
        }
        app.insert_non_send_resource(manager);
        app.add_systems(Update, physics_update_system);
    }
}

/// Feed the frame delta to the manager.
pub fn physics_update_system(time: Option<Res<Time>>, manager: Option<NonSendMut<PhysicsManager>>) {
    let (Some(time), Some(mut manager)) = (time, manager) else {
        return;
    };
    if !manager.is_initialized() {
        return;
    }
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    if let Err(e) = manager.update(dt) {
        warn!("duophys: update failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "dim2", feature = "dim3"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::contract::PhysicsWorld;

    fn desktop() -> DeviceInfo {
        DeviceInfo::new(Some(16.0), 8, "linux/x86_64")
    }

    fn app_with(plugin: DuophysPlugin) -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_plugins(plugin);
        app.finish();
        app.cleanup();
        app
    }

    #[test]
    fn update_moves_bodies_in_the_default_world() {
        let mut app = app_with(DuophysPlugin::new(Dimension::Three).with_device(desktop()));
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(20));
        let body = app
            .world_mut()
            .non_send_resource_mut::<PhysicsManager>()
            .create_body(BodyDesc::dynamic([0.0, 10.0, 0.0]).with_shape(ShapeDesc::ball(0.5)))
            .unwrap();

        for _ in 0..30 {
            app.update();
        }

        let manager = app.world().non_send_resource::<PhysicsManager>();
        let world = manager.world().unwrap();
        assert!(world.position(body).unwrap().y() < 10.0);
        assert!(world.simulated_time() > 0.0);
    }

    #[test]
    fn failed_initialize_keeps_the_app_running() {
        let mut app = app_with(
            DuophysPlugin::new(Dimension::Two)
                .with_engine("box2d")
                .with_device(desktop()),
        );
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(16));
        app.update();
        assert!(!app.world().non_send_resource::<PhysicsManager>().is_initialized());
    }
}
