// duophys-gameplay: Platformer, top-down, trigger zone and particle helpers over any duophys world.
//
// Every helper works in canonical 3-D space (+Y up, Z depth) and hands its
// vectors to the world, which converts them. Nothing here branches on the
// dimension except to add or omit depth.

pub mod canonical;
pub mod particles;
pub mod platformer;
pub mod topdown;
pub mod trigger;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        particles::{EmitterSettings, ParticleEmitter},
        platformer::{PlatformerController, PlatformerInput, PlatformerSettings, WallSide},
        topdown::{TopDownController, TopDownSettings},
        trigger::{TriggerEvent, TriggerEventKind, TriggerZone},
    };
}
