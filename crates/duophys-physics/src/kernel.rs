//! The narrow interface a vendor simulation kernel exposes to [`World`](crate::world::World).
//!
//! A kernel speaks only its own dimension: every vector handed to it has
//! already been converted by the world, and every vector it returns is in
//! its native dimension. Methods addressing a handle that no longer exists
//! return `None` or do nothing.

use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;

use duophys_core::prelude::*;
use duophys_core::types::UserData;

use crate::constraint::JointSpec;

// ---------------------------------------------------------------------------
// Exchange types
// ---------------------------------------------------------------------------

/// Surface parameters applied to one collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderParams {
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    pub filter: CollisionFilter,
    pub sensor: bool,
}

impl ColliderParams {
    /// Parameters from a material, with an optional per-shape density.
    #[must_use]
    pub fn from_material(
        material: &PhysicsMaterial,
        density: Option<f32>,
        filter: CollisionFilter,
        sensor: bool,
    ) -> Self {
        Self {
            friction: material.friction,
            restitution: material.restitution,
            density: density.unwrap_or(material.density),
            filter,
            sensor,
        }
    }
}

/// A begin or end notification between two bodies, as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub started: bool,
    pub point: Option<PhysVec>,
    /// Points from `body_a` towards `body_b`.
    pub normal: Option<PhysVec>,
}

/// Current contact geometry of a touching pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSample {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub point: PhysVec,
    pub normal: PhysVec,
}

/// State of a native handle outside of any world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeSnapshot {
    pub position: PhysVec,
    pub velocity: PhysVec,
    pub angular_velocity: AngularVec,
    pub user_data: UserData,
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

/// One simulation instance of a vendor backend.
pub trait Kernel: Sized + 'static {
    const DIMENSION: Dimension;
    const ENGINE: EngineType;

    /// Reusable native body kept in the engine's pool.
    type NativeBody;
    type BodyHandle: Copy + Eq + Hash + Debug;
    type ShapeHandle: Copy + Eq + Hash + Debug;
    type JointHandle: Copy + Eq + Debug;

    fn new(config: &WorldConfig) -> Self;

    /// Put a detached native body back into its canonical zero state.
    fn reset_native(body: &mut Self::NativeBody);

    fn native_snapshot(body: &Self::NativeBody) -> NativeSnapshot;

    // -- Bodies --

    /// Insert a body, reusing `recycled` when given.
    fn insert_body(
        &mut self,
        id: BodyId,
        kind: BodyKind,
        position: &PhysVec,
        rotation: &Rotation,
        recycled: Option<Self::NativeBody>,
    ) -> Self::BodyHandle;

    /// Remove a body with its colliders and joints, handing back the native body.
    fn remove_body(&mut self, body: Self::BodyHandle) -> Option<Self::NativeBody>;

    /// `None` when the kernel cannot build the shape.
    fn attach_shape(
        &mut self,
        body: Self::BodyHandle,
        shape: &ShapeDesc,
        params: &ColliderParams,
    ) -> Option<Self::ShapeHandle>;

    fn detach_shape(&mut self, shape: Self::ShapeHandle);

    fn configure_shape(&mut self, shape: Self::ShapeHandle, params: &ColliderParams);

    /// Spread `mass` over the body's colliders, replacing density-derived mass.
    fn set_mass(&mut self, body: Self::BodyHandle, mass: f32);

    // -- Getters --

    fn position(&self, body: Self::BodyHandle) -> Option<PhysVec>;
    fn rotation(&self, body: Self::BodyHandle) -> Option<Rotation>;
    fn velocity(&self, body: Self::BodyHandle) -> Option<PhysVec>;
    fn angular_velocity(&self, body: Self::BodyHandle) -> Option<AngularVec>;
    fn mass(&self, body: Self::BodyHandle) -> Option<f32>;
    /// Union of the body's collider bounds.
    fn aabb(&self, body: Self::BodyHandle) -> Option<Aabb>;
    fn is_sleeping(&self, body: Self::BodyHandle) -> Option<bool>;

    // -- Setters --

    fn set_position(&mut self, body: Self::BodyHandle, position: &PhysVec);
    fn set_rotation(&mut self, body: Self::BodyHandle, rotation: &Rotation);
    fn set_velocity(&mut self, body: Self::BodyHandle, velocity: &PhysVec);
    fn set_angular_velocity(&mut self, body: Self::BodyHandle, angular: &AngularVec);
    fn set_kind(&mut self, body: Self::BodyHandle, kind: BodyKind);
    fn set_gravity_scale(&mut self, body: Self::BodyHandle, scale: f32);
    fn set_damping(&mut self, body: Self::BodyHandle, linear: f32, angular: f32);
    fn set_fixed_rotation(&mut self, body: Self::BodyHandle, fixed: bool);
    fn set_ccd(&mut self, body: Self::BodyHandle, enabled: bool);
    fn set_enabled(&mut self, body: Self::BodyHandle, enabled: bool);
    fn set_user_data(&mut self, body: Self::BodyHandle, user_data: UserData);
    /// `None` disables sleeping for the body.
    fn set_sleep_params(
        &mut self,
        body: Self::BodyHandle,
        thresholds: Option<SleepThresholds>,
        time_until_sleep: Option<f32>,
    );
    fn wake_up(&mut self, body: Self::BodyHandle);
    fn sleep(&mut self, body: Self::BodyHandle);

    // -- Forces --

    fn add_force(&mut self, body: Self::BodyHandle, force: &PhysVec, point: Option<&PhysVec>);
    fn apply_impulse(&mut self, body: Self::BodyHandle, impulse: &PhysVec, point: Option<&PhysVec>);
    fn add_torque(&mut self, body: Self::BodyHandle, torque: &AngularVec);

    /// Drop accumulated forces and torques on every body.
    fn clear_forces(&mut self);

    // -- Joints --

    fn insert_joint(
        &mut self,
        body_a: Self::BodyHandle,
        body_b: Self::BodyHandle,
        spec: &JointSpec,
    ) -> Option<Self::JointHandle>;

    fn remove_joint(&mut self, joint: Self::JointHandle);

    // -- Stepping --

    /// Advance one fixed substep, appending begin/end notifications to `contacts`.
    fn step(&mut self, contacts: &mut Vec<RawContact>);

    /// Geometry of every pair currently in contact.
    fn contact_samples(&self) -> Vec<ContactSample>;

    // -- Queries --

    /// Nearest hit per body along the segment, unordered.
    fn cast_ray(&self, origin: &PhysVec, direction: &PhysVec, max_distance: f32) -> Vec<RaycastHit>;
    fn bodies_in_aabb(&self, aabb: &Aabb) -> Vec<BodyId>;
    fn bodies_at_point(&self, point: &PhysVec) -> Vec<BodyId>;

    // -- Parameters --

    fn gravity(&self) -> PhysVec;
    fn set_gravity(&mut self, gravity: &PhysVec);
    fn set_time_step(&mut self, dt: f32);
    fn set_solver_iterations(&mut self, iterations: NonZeroUsize);
    fn set_max_ccd_substeps(&mut self, substeps: usize);
}
