// duophys-physics: One world contract over rapier2d and rapier3d, with engines, adaptive quality and a bevy frame driver.
//
// A `Kernel` is the narrow vendor interface; `World<K>` and `Engine<K>` are
// written once against it. `PhysicsWorld` is the object-safe contract the
// manager hands out regardless of which dimension is active.

#[cfg(not(any(feature = "dim2", feature = "dim3")))]
compile_error!("duophys-physics needs at least one of the `dim2` or `dim3` features");

pub mod body;
pub mod constraint;
pub mod contract;
pub mod debug;
pub mod engine;
pub mod kernel;
pub mod manager;
pub mod optimizer;
pub mod plugin;
pub mod rapier;
pub mod world;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        body::BodyState,
        constraint::PhysicsConstraint,
        contract::{BodyMut, PhysicsWorld, PhysicsWorldExt, WorldState},
        debug::DebugPrimitive,
        engine::Engine,
        kernel::Kernel,
        manager::{ActiveEngine, PhysicsManager},
        optimizer::{AdaptiveOptimizer, OptimizerDecision},
        plugin::{DuophysPlugin, physics_update_system},
        world::World,
    };
    #[cfg(feature = "dim2")]
    pub use crate::rapier::Rapier2d;
    #[cfg(feature = "dim3")]
    pub use crate::rapier::Rapier3d;
    pub use duophys_core::prelude::*;
}

pub use manager::PhysicsManager;
pub use plugin::DuophysPlugin;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_exports() {
        use prelude::*;

        fn _accepts_world(_: &mut dyn PhysicsWorld) {}
        let _plugin = DuophysPlugin::new(Dimension::Two);
        let _state = WorldState::Created;
    }
}
