//! Bevy test app builders around [`DuophysPlugin`].

use bevy_app::App;
use bevy_time::Time;
use duophys_core::prelude::*;
use duophys_physics::DuophysPlugin;

use crate::fixtures::desktop_device;

/// Create a minimal test app with a 2-D physics plugin on a desktop device.
///
/// Provides the `PhysicsManager` non-send resource and one running world,
/// but no `Time` resource: updates do not step physics.
pub fn minimal_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(DuophysPlugin::new(Dimension::Two).with_device(desktop_device()));
    app.finish();
    app.cleanup();
    app
}

/// Create a test app for `dimension` with a manually advanced `Time` resource.
///
/// Call `Time::advance_by` before `app.update()` to step physics.
pub fn headless_physics_app(dimension: Dimension) -> App {
    let mut app = App::new();
    app.insert_resource(Time::<()>::default());
    app.add_plugins(DuophysPlugin::new(dimension).with_device(desktop_device()));
    app.finish();
    app.cleanup();
    app
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duophys_physics::PhysicsManager;

    #[test]
    fn minimal_app_builds() {
        let app = minimal_test_app();
        let manager = app.world().non_send_resource::<PhysicsManager>();
        assert!(manager.is_initialized());
        assert!(manager.active_world().is_some());
    }

    #[test]
    fn minimal_app_can_update() {
        let mut app = minimal_test_app();
        app.update();
        app.update();
    }

    #[test]
    fn headless_app_steps_with_time() {
        let mut app = headless_physics_app(Dimension::Three);
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(std::time::Duration::from_millis(20));
        app.update();
        let manager = app.world().non_send_resource::<PhysicsManager>();
        assert!(manager.world().unwrap().simulated_time() > 0.0);
    }
}
