//! The dimension-agnostic world contract.
//!
//! [`PhysicsWorld`] is object safe: the manager hands out
//! `&mut dyn PhysicsWorld` regardless of which backend is active, and the
//! gameplay helpers are generic over `W: PhysicsWorld + ?Sized`. Every vector
//! argument may be of either dimension and is converted on entry; every
//! vector returned is in the world's own dimension.

use std::sync::Arc;

use duophys_core::events::SubscriptionId;
use duophys_core::prelude::*;
use duophys_core::types::UserData;

use crate::body::BodyState;
use crate::constraint::PhysicsConstraint;
use crate::debug::DebugPrimitive;

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

/// Lifecycle of a world.
///
/// `Created -> Running <-> Paused`, `Stopped` via [`PhysicsWorld::stop`],
/// `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldState {
    Created,
    Running,
    Paused,
    Stopped,
    Destroyed,
}

impl WorldState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

pub trait PhysicsWorld {
    // -- Identity --

    fn id(&self) -> WorldId;
    fn dimension(&self) -> Dimension;
    fn engine_type(&self) -> EngineType;
    fn config(&self) -> &WorldConfig;
    fn state(&self) -> WorldState;

    fn is_running(&self) -> bool {
        self.state() == WorldState::Running
    }

    // -- Lifecycle --

    /// Schedule the world for host-driven ticking.
    fn start(&mut self) -> Result<(), ResourceError>;
    /// Unschedule the world.
    fn stop(&mut self) -> Result<(), ResourceError>;
    /// Keep the schedule but skip the physical step.
    fn pause(&mut self) -> Result<(), ResourceError>;
    fn resume(&mut self) -> Result<(), ResourceError>;

    /// Advance by `dt` seconds in fixed substeps and dispatch collision events.
    ///
    /// A no-op while paused, an error once destroyed.
    fn step(&mut self, dt: f32) -> Result<(), ResourceError>;

    /// Step only when running. Returns whether a step happened.
    fn tick(&mut self, dt: f32) -> Result<bool, ResourceError>;

    /// Remove every body and constraint, keeping the world alive.
    fn clear(&mut self);
    fn destroy(&mut self);

    /// Seconds of simulation advanced so far.
    fn simulated_time(&self) -> f64;

    // -- Bodies --

    fn create_body(&mut self, desc: BodyDesc) -> Result<BodyId, PhysicsError>;
    /// Publishes `End` for live contacts and returns the native handle to the pool.
    fn remove_body(&mut self, body: BodyId) -> Result<(), ResourceError>;
    fn contains_body(&self, body: BodyId) -> bool;
    fn body_ids(&self) -> Vec<BodyId>;
    fn body_count(&self) -> usize;
    fn body_state(&self, body: BodyId) -> Result<BodyState, ResourceError>;

    fn position(&self, body: BodyId) -> Result<PhysVec, ResourceError>;
    fn set_position(&mut self, body: BodyId, position: PhysVec) -> Result<(), ResourceError>;
    fn rotation(&self, body: BodyId) -> Result<Rotation, ResourceError>;
    fn set_rotation(&mut self, body: BodyId, rotation: Rotation) -> Result<(), ResourceError>;
    fn velocity(&self, body: BodyId) -> Result<PhysVec, ResourceError>;
    fn set_velocity(&mut self, body: BodyId, velocity: PhysVec) -> Result<(), ResourceError>;
    fn angular_velocity(&self, body: BodyId) -> Result<AngularVec, ResourceError>;
    fn set_angular_velocity(
        &mut self,
        body: BodyId,
        angular_velocity: AngularVec,
    ) -> Result<(), ResourceError>;
    fn mass(&self, body: BodyId) -> Result<f32, ResourceError>;
    fn set_mass(&mut self, body: BodyId, mass: f32) -> Result<(), ResourceError>;
    fn material(&self, body: BodyId) -> Result<Arc<PhysicsMaterial>, ResourceError>;
    fn set_material(&mut self, body: BodyId, material: &str) -> Result<(), ResourceError>;
    fn gravity_scale(&self, body: BodyId) -> Result<f32, ResourceError>;
    fn set_gravity_scale(&mut self, body: BodyId, scale: f32) -> Result<(), ResourceError>;
    /// `(linear, angular)`.
    fn damping(&self, body: BodyId) -> Result<(f32, f32), ResourceError>;
    fn set_damping(&mut self, body: BodyId, linear: f32, angular: f32)
    -> Result<(), ResourceError>;
    fn collision_filter(&self, body: BodyId) -> Result<CollisionFilter, ResourceError>;
    fn set_collision_filter(
        &mut self,
        body: BodyId,
        filter: CollisionFilter,
    ) -> Result<(), ResourceError>;
    fn user_data(&self, body: BodyId) -> Result<UserData, ResourceError>;
    fn set_user_data(&mut self, body: BodyId, user_data: UserData) -> Result<(), ResourceError>;

    fn apply_force(
        &mut self,
        body: BodyId,
        force: PhysVec,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError>;
    fn apply_impulse(
        &mut self,
        body: BodyId,
        impulse: PhysVec,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError>;
    fn apply_torque(&mut self, body: BodyId, torque: AngularVec) -> Result<(), ResourceError>;

    fn kind(&self, body: BodyId) -> Result<BodyKind, ResourceError>;
    fn set_kind(&mut self, body: BodyId, kind: BodyKind) -> Result<(), ResourceError>;

    fn set_static(&mut self, body: BodyId, is_static: bool) -> Result<(), ResourceError> {
        let kind = if is_static {
            BodyKind::Static
        } else {
            BodyKind::Dynamic
        };
        self.set_kind(body, kind)
    }

    fn set_kinematic(&mut self, body: BodyId, kinematic: bool) -> Result<(), ResourceError> {
        let kind = if kinematic {
            BodyKind::Kinematic
        } else {
            BodyKind::Dynamic
        };
        self.set_kind(body, kind)
    }

    fn is_sensor(&self, body: BodyId) -> Result<bool, ResourceError>;
    fn set_sensor(&mut self, body: BodyId, sensor: bool) -> Result<(), ResourceError>;
    fn is_active(&self, body: BodyId) -> Result<bool, ResourceError>;
    /// Inactive bodies keep their state but take no part in the simulation.
    fn set_active(&mut self, body: BodyId, active: bool) -> Result<(), ResourceError>;
    fn wake_up(&mut self, body: BodyId) -> Result<(), ResourceError>;
    fn sleep(&mut self, body: BodyId) -> Result<(), ResourceError>;
    fn sleep_state(&self, body: BodyId) -> Result<SleepState, ResourceError>;

    /// Attach another shape. Kinds the backend cannot build fall back with a
    /// degradation record; `None` when not even the fallback could be built.
    fn add_shape(&mut self, body: BodyId, shape: ShapeDesc)
    -> Result<Option<ShapeId>, ResourceError>;
    /// `Ok(false)` when the shape is unknown or is the body's last one.
    fn remove_shape(&mut self, body: BodyId, shape: ShapeId) -> Result<bool, ResourceError>;
    fn shape_ids(&self, body: BodyId) -> Result<Vec<ShapeId>, ResourceError>;
    fn aabb(&self, body: BodyId) -> Result<Aabb, ResourceError>;

    // -- Constraints --

    /// Both bodies must belong to this world. Unsupported kinds fall back to
    /// a distance joint and never fail.
    fn create_constraint(&mut self, desc: ConstraintDesc) -> Result<ConstraintId, PhysicsError>;
    fn remove_constraint(&mut self, constraint: ConstraintId) -> Result<(), ResourceError>;
    fn constraint(&self, constraint: ConstraintId) -> Option<&PhysicsConstraint>;
    fn constraint_ids(&self) -> Vec<ConstraintId>;
    fn constraint_count(&self) -> usize;
    /// Store motor settings and re-apply them to the native joint when it has a motor.
    fn set_motor(&mut self, constraint: ConstraintId, motor: Motor) -> Result<(), ResourceError>;

    // -- Queries --

    /// Hits along the segment by ascending distance, one per body. Sensors,
    /// inactive bodies and bodies outside `mask` are skipped.
    fn raycast(&self, from: PhysVec, to: PhysVec, mask: Option<u32>) -> Vec<RaycastHit>;
    fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyId>;
    fn query_point(&self, point: PhysVec) -> Vec<BodyId>;
    /// Whether the pair is in the contact set of the last step.
    fn check_collision(&self, a: BodyId, b: BodyId) -> bool;
    /// Every pair currently touching, smaller id first.
    fn contact_pairs(&self) -> Vec<(BodyId, BodyId)>;

    // -- Events --

    fn on_collision(
        &mut self,
        topic: Topic,
        callback: Box<dyn FnMut(&CollisionEvent)>,
    ) -> SubscriptionId;
    fn collision_mailbox(&mut self, topic: Topic) -> Mailbox<CollisionEvent>;
    fn unsubscribe_collisions(&mut self, id: SubscriptionId) -> bool;
    fn on_body_event(&mut self, topic: Topic, callback: Box<dyn FnMut(&BodyEvent)>)
    -> SubscriptionId;
    fn body_event_mailbox(&mut self, topic: Topic) -> Mailbox<BodyEvent>;
    fn unsubscribe_body_events(&mut self, id: SubscriptionId) -> bool;

    // -- Parameters --

    fn gravity(&self) -> PhysVec;
    fn set_gravity(&mut self, gravity: PhysVec);
    fn time_step(&self) -> f32;
    fn set_time_step(&mut self, time_step: f32) -> Result<(), ConfigError>;
    fn solver_iterations(&self) -> usize;
    fn set_solver_iterations(&mut self, iterations: usize) -> Result<(), ConfigError>;
    fn sleep_thresholds(&self) -> SleepThresholds;
    /// Applies to every body without its own override.
    fn set_sleep_thresholds(&mut self, thresholds: SleepThresholds);
    /// Sleep on, mobile sleep thresholds, fewer solver iterations and CCD substeps.
    fn optimize_for_mobile(&mut self);

    // -- Diagnostics --

    fn performance_metrics(&self) -> PerformanceMetrics;
    fn last_step_ms(&self) -> f64;
    fn enable_debug_draw(&mut self, enabled: bool);
    fn debug_draw_enabled(&self) -> bool;
    /// Empty unless debug draw is enabled.
    fn debug_primitives(&self) -> Vec<DebugPrimitive>;
    fn degradations(&self) -> &[Degradation];
}

// ---------------------------------------------------------------------------
// BodyMut
// ---------------------------------------------------------------------------

/// A body handle borrowed from its world.
pub struct BodyMut<'a, W: PhysicsWorld + ?Sized> {
    world: &'a mut W,
    id: BodyId,
}

impl<'a, W: PhysicsWorld + ?Sized> BodyMut<'a, W> {
    pub fn new(world: &'a mut W, id: BodyId) -> Result<Self, ResourceError> {
        if world.contains_body(id) {
            Ok(Self { world, id })
        } else {
            Err(ResourceError::MissingBody {
                body: id,
                world: world.id(),
            })
        }
    }

    #[must_use]
    pub const fn id(&self) -> BodyId {
        self.id
    }

    pub fn state(&self) -> Result<BodyState, ResourceError> {
        self.world.body_state(self.id)
    }

    pub fn position(&self) -> Result<PhysVec, ResourceError> {
        self.world.position(self.id)
    }

    pub fn set_position(&mut self, position: impl Into<PhysVec>) -> Result<(), ResourceError> {
        self.world.set_position(self.id, position.into())
    }

    pub fn rotation(&self) -> Result<Rotation, ResourceError> {
        self.world.rotation(self.id)
    }

    pub fn set_rotation(&mut self, rotation: impl Into<Rotation>) -> Result<(), ResourceError> {
        self.world.set_rotation(self.id, rotation.into())
    }

    pub fn velocity(&self) -> Result<PhysVec, ResourceError> {
        self.world.velocity(self.id)
    }

    pub fn set_velocity(&mut self, velocity: impl Into<PhysVec>) -> Result<(), ResourceError> {
        self.world.set_velocity(self.id, velocity.into())
    }

    pub fn angular_velocity(&self) -> Result<AngularVec, ResourceError> {
        self.world.angular_velocity(self.id)
    }

    pub fn set_angular_velocity(
        &mut self,
        angular_velocity: impl Into<AngularVec>,
    ) -> Result<(), ResourceError> {
        self.world
            .set_angular_velocity(self.id, angular_velocity.into())
    }

    pub fn mass(&self) -> Result<f32, ResourceError> {
        self.world.mass(self.id)
    }

    pub fn set_mass(&mut self, mass: f32) -> Result<(), ResourceError> {
        self.world.set_mass(self.id, mass)
    }

    pub fn set_material(&mut self, material: &str) -> Result<(), ResourceError> {
        self.world.set_material(self.id, material)
    }

    pub fn set_gravity_scale(&mut self, scale: f32) -> Result<(), ResourceError> {
        self.world.set_gravity_scale(self.id, scale)
    }

    pub fn set_damping(&mut self, linear: f32, angular: f32) -> Result<(), ResourceError> {
        self.world.set_damping(self.id, linear, angular)
    }

    pub fn set_collision_filter(&mut self, filter: CollisionFilter) -> Result<(), ResourceError> {
        self.world.set_collision_filter(self.id, filter)
    }

    pub fn user_data(&self) -> Result<UserData, ResourceError> {
        self.world.user_data(self.id)
    }

    pub fn set_user_data(&mut self, user_data: UserData) -> Result<(), ResourceError> {
        self.world.set_user_data(self.id, user_data)
    }

    pub fn apply_force(
        &mut self,
        force: impl Into<PhysVec>,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError> {
        self.world.apply_force(self.id, force.into(), point)
    }

    pub fn apply_impulse(
        &mut self,
        impulse: impl Into<PhysVec>,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError> {
        self.world.apply_impulse(self.id, impulse.into(), point)
    }

    pub fn apply_torque(&mut self, torque: impl Into<AngularVec>) -> Result<(), ResourceError> {
        self.world.apply_torque(self.id, torque.into())
    }

    pub fn set_static(&mut self, is_static: bool) -> Result<(), ResourceError> {
        self.world.set_static(self.id, is_static)
    }

    pub fn set_kinematic(&mut self, kinematic: bool) -> Result<(), ResourceError> {
        self.world.set_kinematic(self.id, kinematic)
    }

    pub fn set_sensor(&mut self, sensor: bool) -> Result<(), ResourceError> {
        self.world.set_sensor(self.id, sensor)
    }

    pub fn set_active(&mut self, active: bool) -> Result<(), ResourceError> {
        self.world.set_active(self.id, active)
    }

    pub fn wake_up(&mut self) -> Result<(), ResourceError> {
        self.world.wake_up(self.id)
    }

    pub fn sleep(&mut self) -> Result<(), ResourceError> {
        self.world.sleep(self.id)
    }

    pub fn sleep_state(&self) -> Result<SleepState, ResourceError> {
        self.world.sleep_state(self.id)
    }

    pub fn add_shape(&mut self, shape: ShapeDesc) -> Result<Option<ShapeId>, ResourceError> {
        self.world.add_shape(self.id, shape)
    }

    pub fn remove_shape(&mut self, shape: ShapeId) -> Result<bool, ResourceError> {
        self.world.remove_shape(self.id, shape)
    }

    pub fn aabb(&self) -> Result<Aabb, ResourceError> {
        self.world.aabb(self.id)
    }

    /// Remove the body from its world.
    pub fn destroy(self) -> Result<(), ResourceError> {
        self.world.remove_body(self.id)
    }
}

/// Borrowing body access for any world, including `dyn PhysicsWorld`.
pub trait PhysicsWorldExt: PhysicsWorld {
    fn body_mut(&mut self, id: BodyId) -> Result<BodyMut<'_, Self>, ResourceError> {
        BodyMut::new(self, id)
    }
}

impl<W: PhysicsWorld + ?Sized> PhysicsWorldExt for W {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _accepts(_: &mut dyn PhysicsWorld) {}
    }

    #[test]
    fn state_names() {
        assert_eq!(WorldState::Paused.as_str(), "paused");
        assert_eq!(WorldState::Destroyed.as_str(), "destroyed");
    }
}
