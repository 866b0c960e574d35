//! Shared test fixtures for duophys crates.
//!
//! Provides ready engines and managers for either dimension, canned device
//! profiles, seeded frame-time streams and bevy test apps.

pub mod app;
pub mod fixtures;
pub mod frames;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use app::{headless_physics_app, minimal_test_app};
pub use fixtures::{
    desktop_device, low_end_mobile_device, mid_range_mobile_device, ready_engine, ready_manager,
    weightless_world, world_2d, world_3d,
};
pub use frames::{jittered_frames, steady_frames};
