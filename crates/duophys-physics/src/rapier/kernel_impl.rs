//! Rapier pipeline wrapped as a [`Kernel`]. Compiled once per dimension.

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use duophys_core::prelude::*;
use duophys_core::types::UserData;

use super::rapier::parry::bounding_volume::Aabb as NativeAabb;
use super::rapier::parry::query::{PointQuery, Ray, RayCast};
use super::rapier::prelude::{
    ActiveCollisionTypes, ActiveEvents, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet,
    CollisionEvent as NativeCollisionEvent, ContactPair, DefaultBroadPhase, EventHandler,
    FixedJointBuilder, GenericJoint, Group, ImpulseJointHandle, ImpulseJointSet,
    IntegrationParameters, InteractionGroups, IslandManager, Isometry, JointAxis,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, Point, PrismaticJointBuilder, Real,
    RigidBody, RigidBodyActivation, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
    RigidBodyType, RopeJointBuilder, Rotation as NativeRotation, SpringJointBuilder, Vector,
};
use super::{
    DIMENSION, ENGINE, angular, from_point, from_rotation, from_vector, point, read_angular,
    revolute_builder, rotation, shape, unit_axis, vector,
};

use crate::constraint::{JointModel, JointSpec, MOTOR_FACTOR};
use crate::kernel::{ColliderParams, ContactSample, Kernel, NativeSnapshot, RawContact};

// ---------------------------------------------------------------------------
// Event collection
// ---------------------------------------------------------------------------

struct Captured {
    collider1: ColliderHandle,
    collider2: ColliderHandle,
    started: bool,
    contact: Option<(Point<Real>, Vector<Real>)>,
}

/// Buffers rapier's begin/end notifications for one step.
#[derive(Default)]
struct ContactCollector {
    events: Mutex<Vec<Captured>>,
}

impl ContactCollector {
    fn take(&self) -> Vec<Captured> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: NativeCollisionEvent,
        contact_pair: Option<&ContactPair>,
    ) {
        let contact = contact_pair.and_then(|pair| {
            let (point, normal) = deepest_contact(pair, colliders)?;
            // Orient the normal from the event's first collider.
            if pair.collider1 == event.collider1() {
                Some((point, normal))
            } else {
                Some((point, -normal))
            }
        });
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Captured {
                collider1: event.collider1(),
                collider2: event.collider2(),
                started: event.started(),
                contact,
            });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// World-space point and normal (collider1 towards collider2) of the deepest contact.
fn deepest_contact(pair: &ContactPair, colliders: &ColliderSet) -> Option<(Point<Real>, Vector<Real>)> {
    let (manifold, contact) = pair.find_deepest_contact()?;
    let collider = colliders.get(pair.collider1)?;
    Some((collider.position() * contact.local_p1, manifold.data.normal))
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn body_type(kind: BodyKind) -> RigidBodyType {
    match kind {
        BodyKind::Static => RigidBodyType::Fixed,
        BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
        BodyKind::Dynamic => RigidBodyType::Dynamic,
    }
}

fn groups(filter: CollisionFilter) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(filter.group),
        Group::from_bits_truncate(filter.mask),
    )
}

/// Sensors must also see static and kinematic bodies.
fn collision_types(sensor: bool) -> ActiveCollisionTypes {
    if sensor {
        ActiveCollisionTypes::all()
    } else {
        ActiveCollisionTypes::default()
    }
}

fn from_aabb(aabb: &NativeAabb) -> Aabb {
    Aabb::new(from_point(&aabb.mins), from_point(&aabb.maxs))
}

fn build_joint(spec: &JointSpec) -> GenericJoint {
    let anchor1 = point(&spec.anchor_a);
    let anchor2 = point(&spec.anchor_b);
    match spec.model {
        JointModel::Distance { length } => {
            let mut joint: GenericJoint = RopeJointBuilder::new(length)
                .local_anchor1(anchor1)
                .local_anchor2(anchor2)
                .build()
                .into();
            joint.set_limits(JointAxis::LinX, [length, length]);
            joint
        }
        JointModel::Rope { max_length } => RopeJointBuilder::new(max_length)
            .local_anchor1(anchor1)
            .local_anchor2(anchor2)
            .build()
            .into(),
        JointModel::Spring {
            rest_length,
            stiffness,
            damping,
        } => SpringJointBuilder::new(rest_length, stiffness, damping)
            .local_anchor1(anchor1)
            .local_anchor2(anchor2)
            .build()
            .into(),
        JointModel::Revolute {
            axis,
            limits,
            motor,
        } => {
            let mut builder = revolute_builder(axis.as_ref())
                .local_anchor1(anchor1)
                .local_anchor2(anchor2);
            if let Some(limits) = limits {
                builder = builder.limits([limits.min, limits.max]);
            }
            if let Some(motor) = motor.filter(|m| m.enabled) {
                builder = builder
                    .motor_velocity(motor.speed, MOTOR_FACTOR)
                    .motor_max_force(motor.max_force);
            }
            builder.build().into()
        }
        JointModel::Fixed => FixedJointBuilder::new()
            .local_anchor1(anchor1)
            .local_anchor2(anchor2)
            .build()
            .into(),
        JointModel::Prismatic { axis, motor } => {
            let mut builder = PrismaticJointBuilder::new(unit_axis(axis.as_ref()))
                .local_anchor1(anchor1)
                .local_anchor2(anchor2);
            if let Some(motor) = motor.filter(|m| m.enabled) {
                builder = builder
                    .motor_velocity(motor.speed, MOTOR_FACTOR)
                    .motor_max_force(motor.max_force);
            }
            builder.build().into()
        }
    }
}

// ---------------------------------------------------------------------------
// RapierKernel
// ---------------------------------------------------------------------------

/// All rapier state of one world.
///
/// `PhysicsPipeline::step()` needs every set at once, so they live together.
pub struct RapierKernel {
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    gravity: Vector<Real>,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    collector: ContactCollector,

    ids: HashMap<RigidBodyHandle, BodyId>,
    owners: HashMap<ColliderHandle, BodyId>,
    /// Removed colliders whose stop notification arrives on the next step.
    detached: Vec<ColliderHandle>,
}

impl RapierKernel {
    fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    fn recompute_mass(&mut self, handle: RigidBodyHandle) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.colliders);
        }
    }
}

impl Kernel for RapierKernel {
    const DIMENSION: Dimension = DIMENSION;
    const ENGINE: EngineType = ENGINE;

    type NativeBody = RigidBody;
    type BodyHandle = RigidBodyHandle;
    type ShapeHandle = ColliderHandle;
    type JointHandle = ImpulseJointHandle;

    fn new(config: &WorldConfig) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = config.time_step;
        params.num_solver_iterations =
            NonZeroUsize::new(config.solver_iterations).unwrap_or(NonZeroUsize::MIN);
        Self {
            pipeline: PhysicsPipeline::new(),
            params,
            gravity: vector(&config.resolved_gravity()),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            collector: ContactCollector::default(),
            ids: HashMap::new(),
            owners: HashMap::new(),
            detached: Vec::new(),
        }
    }

    fn reset_native(rb: &mut RigidBody) {
        rb.set_translation(Vector::zeros(), false);
        rb.set_rotation(NativeRotation::identity(), false);
        rb.set_linvel(Vector::zeros(), false);
        rb.set_angvel(angular(&AngularVec::zero(DIMENSION)), false);
        rb.reset_forces(false);
        rb.reset_torques(false);
        rb.set_gravity_scale(1.0, false);
        rb.set_linear_damping(0.0);
        rb.set_angular_damping(0.0);
        rb.lock_rotations(false, false);
        rb.enable_ccd(false);
        rb.set_enabled(true);
        *rb.activation_mut() = RigidBodyActivation::active();
        rb.user_data = 0;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn native_snapshot(rb: &RigidBody) -> NativeSnapshot {
        NativeSnapshot {
            position: from_vector(rb.translation()),
            velocity: from_vector(rb.linvel()),
            angular_velocity: read_angular(rb),
            user_data: rb.user_data as UserData,
        }
    }

    // -- Bodies --

    fn insert_body(
        &mut self,
        id: BodyId,
        kind: BodyKind,
        position: &PhysVec,
        rot: &Rotation,
        recycled: Option<RigidBody>,
    ) -> RigidBodyHandle {
        let iso = Isometry::from_parts(vector(position).into(), rotation(rot));
        let rb = match recycled {
            Some(mut rb) => {
                rb.set_body_type(body_type(kind), false);
                rb.set_position(iso, false);
                rb
            }
            None => RigidBodyBuilder::new(body_type(kind)).position(iso).build(),
        };
        let handle = self.bodies.insert(rb);
        self.ids.insert(handle, id);
        handle
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        let rb = self.bodies.get(handle)?;
        for collider in rb.colliders() {
            self.owners.remove(collider);
        }
        self.ids.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )
    }

    fn attach_shape(
        &mut self,
        body: RigidBodyHandle,
        desc: &ShapeDesc,
        params: &ColliderParams,
    ) -> Option<ColliderHandle> {
        let id = *self.ids.get(&body)?;
        let native = shape(&desc.kind)?;
        let mut builder = ColliderBuilder::new(native)
            .friction(params.friction)
            .restitution(params.restitution)
            .density(params.density)
            .sensor(params.sensor)
            .collision_groups(groups(params.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(collision_types(params.sensor));
        if let Some(offset) = &desc.offset {
            builder = builder.translation(vector(offset));
        }
        let handle = self
            .colliders
            .insert_with_parent(builder.build(), body, &mut self.bodies);
        self.owners.insert(handle, id);
        self.recompute_mass(body);
        Some(handle)
    }

    fn detach_shape(&mut self, shape: ColliderHandle) {
        let parent = self.colliders.get(shape).and_then(|c| c.parent());
        if self
            .colliders
            .remove(shape, &mut self.islands, &mut self.bodies, true)
            .is_some()
        {
            self.detached.push(shape);
        }
        if let Some(parent) = parent {
            self.recompute_mass(parent);
        }
    }

    fn configure_shape(&mut self, shape: ColliderHandle, params: &ColliderParams) {
        let Some(collider) = self.colliders.get_mut(shape) else {
            return;
        };
        collider.set_friction(params.friction);
        collider.set_restitution(params.restitution);
        collider.set_density(params.density);
        collider.set_sensor(params.sensor);
        collider.set_collision_groups(groups(params.filter));
        collider.set_active_collision_types(collision_types(params.sensor));
        if let Some(parent) = collider.parent() {
            self.recompute_mass(parent);
        }
    }

    fn set_mass(&mut self, body: RigidBodyHandle, mass: f32) {
        let Some(rb) = self.bodies.get(body) else {
            return;
        };
        let colliders = rb.colliders().to_vec();
        if colliders.is_empty() {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = mass / colliders.len() as f32;
        for handle in colliders {
            if let Some(collider) = self.colliders.get_mut(handle) {
                collider.set_mass(share);
            }
        }
        self.recompute_mass(body);
    }

    // -- Getters --

    fn position(&self, body: RigidBodyHandle) -> Option<PhysVec> {
        self.body(body).map(|rb| from_vector(rb.translation()))
    }

    fn rotation(&self, body: RigidBodyHandle) -> Option<Rotation> {
        self.body(body).map(|rb| from_rotation(rb.rotation()))
    }

    fn velocity(&self, body: RigidBodyHandle) -> Option<PhysVec> {
        self.body(body).map(|rb| from_vector(rb.linvel()))
    }

    fn angular_velocity(&self, body: RigidBodyHandle) -> Option<AngularVec> {
        self.body(body).map(read_angular)
    }

    fn mass(&self, body: RigidBodyHandle) -> Option<f32> {
        self.body(body).map(RigidBody::mass)
    }

    fn aabb(&self, body: RigidBodyHandle) -> Option<Aabb> {
        let rb = self.body(body)?;
        rb.colliders()
            .iter()
            .filter_map(|h| self.colliders.get(*h))
            .map(|c| from_aabb(&c.compute_aabb()))
            .reduce(|a, b| a.merged(&b))
            .or_else(|| {
                let p = from_vector(rb.translation());
                Some(Aabb::new(p, p))
            })
    }

    fn is_sleeping(&self, body: RigidBodyHandle) -> Option<bool> {
        self.body(body).map(RigidBody::is_sleeping)
    }

    // -- Setters --

    fn set_position(&mut self, body: RigidBodyHandle, position: &PhysVec) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_translation(vector(position), true);
        }
        // Queries between steps must see the teleported colliders.
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
    }

    fn set_rotation(&mut self, body: RigidBodyHandle, rot: &Rotation) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_rotation(rotation(rot), true);
        }
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
    }

    fn set_velocity(&mut self, body: RigidBodyHandle, velocity: &PhysVec) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linvel(vector(velocity), true);
        }
    }

    fn set_angular_velocity(&mut self, body: RigidBodyHandle, value: &AngularVec) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_angvel(angular(value), true);
        }
    }

    fn set_kind(&mut self, body: RigidBodyHandle, kind: BodyKind) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_body_type(body_type(kind), true);
        }
    }

    fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_gravity_scale(scale, true);
        }
    }

    fn set_damping(&mut self, body: RigidBodyHandle, linear: f32, angular_damping: f32) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linear_damping(linear);
            rb.set_angular_damping(angular_damping);
        }
    }

    fn set_fixed_rotation(&mut self, body: RigidBodyHandle, fixed: bool) {
        if let Some(rb) = self.body_mut(body) {
            rb.lock_rotations(fixed, true);
        }
    }

    fn set_ccd(&mut self, body: RigidBodyHandle, enabled: bool) {
        if let Some(rb) = self.body_mut(body) {
            rb.enable_ccd(enabled);
        }
    }

    fn set_enabled(&mut self, body: RigidBodyHandle, enabled: bool) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_enabled(enabled);
        }
    }

    fn set_user_data(&mut self, body: RigidBodyHandle, user_data: UserData) {
        if let Some(rb) = self.body_mut(body) {
            rb.user_data = u128::from(user_data);
        }
    }

    fn set_sleep_params(
        &mut self,
        body: RigidBodyHandle,
        thresholds: Option<SleepThresholds>,
        time_until_sleep: Option<f32>,
    ) {
        let Some(rb) = self.body_mut(body) else {
            return;
        };
        let activation = rb.activation_mut();
        match thresholds {
            Some(t) => {
                activation.normalized_linear_threshold = t.linear;
                activation.angular_threshold = t.angular;
            }
            // Negative thresholds never let the body fall asleep.
            None => {
                activation.normalized_linear_threshold = -1.0;
                activation.angular_threshold = -1.0;
            }
        }
        if let Some(time) = time_until_sleep {
            activation.time_until_sleep = time;
        }
        if thresholds.is_none() {
            rb.wake_up(true);
        }
    }

    fn wake_up(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.body_mut(body) {
            rb.wake_up(true);
        }
    }

    fn sleep(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.body_mut(body) {
            rb.sleep();
        }
    }

    // -- Forces --

    fn add_force(&mut self, body: RigidBodyHandle, force: &PhysVec, at: Option<&PhysVec>) {
        if let Some(rb) = self.body_mut(body) {
            match at {
                Some(p) => rb.add_force_at_point(vector(force), point(p), true),
                None => rb.add_force(vector(force), true),
            }
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: &PhysVec, at: Option<&PhysVec>) {
        if let Some(rb) = self.body_mut(body) {
            match at {
                Some(p) => rb.apply_impulse_at_point(vector(impulse), point(p), true),
                None => rb.apply_impulse(vector(impulse), true),
            }
        }
    }

    fn add_torque(&mut self, body: RigidBodyHandle, torque: &AngularVec) {
        if let Some(rb) = self.body_mut(body) {
            rb.add_torque(angular(torque), true);
        }
    }

    fn clear_forces(&mut self) {
        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
    }

    // -- Joints --

    fn insert_joint(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        spec: &JointSpec,
    ) -> Option<ImpulseJointHandle> {
        if !self.bodies.contains(body_a) || !self.bodies.contains(body_b) {
            return None;
        }
        Some(self.impulse_joints.insert(body_a, body_b, build_joint(spec), true))
    }

    fn remove_joint(&mut self, joint: ImpulseJointHandle) {
        self.impulse_joints.remove(joint, true);
    }

    // -- Stepping --

    fn step(&mut self, contacts: &mut Vec<RawContact>) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.collector,
        );

        for captured in self.collector.take() {
            let (Some(&a), Some(&b)) = (
                self.owners.get(&captured.collider1),
                self.owners.get(&captured.collider2),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            contacts.push(RawContact {
                body_a: a,
                body_b: b,
                started: captured.started,
                point: captured.contact.map(|(p, _)| from_point(&p)),
                normal: captured.contact.map(|(_, n)| from_vector(&n)),
            });
        }
        for handle in self.detached.drain(..) {
            self.owners.remove(&handle);
        }
    }

    fn contact_samples(&self) -> Vec<ContactSample> {
        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter_map(|pair| {
                let a = *self.owners.get(&pair.collider1)?;
                let b = *self.owners.get(&pair.collider2)?;
                let (point, normal) = deepest_contact(pair, &self.colliders)?;
                Some(ContactSample {
                    body_a: a,
                    body_b: b,
                    point: from_point(&point),
                    normal: from_vector(&normal),
                })
            })
            .collect()
    }

    // -- Queries --

    fn cast_ray(&self, origin: &PhysVec, direction: &PhysVec, max_distance: f32) -> Vec<RaycastHit> {
        let ray = Ray::new(point(origin), vector(direction));
        let mut nearest: HashMap<BodyId, RaycastHit> = HashMap::new();
        for (handle, collider) in self.colliders.iter() {
            let Some(&body) = self.owners.get(&handle) else {
                continue;
            };
            let Some(hit) =
                collider
                    .shape()
                    .cast_ray_and_get_normal(collider.position(), &ray, max_distance, true)
            else {
                continue;
            };
            let distance = hit.time_of_impact;
            if nearest.get(&body).is_some_and(|h| h.distance <= distance) {
                continue;
            }
            nearest.insert(
                body,
                RaycastHit {
                    body,
                    point: from_point(&ray.point_at(distance)),
                    normal: from_vector(&hit.normal),
                    distance,
                    fraction: if max_distance > 0.0 { distance / max_distance } else { 0.0 },
                },
            );
        }
        nearest.into_values().collect()
    }

    fn bodies_in_aabb(&self, area: &Aabb) -> Vec<BodyId> {
        let area = area.into_dimension(DIMENSION);
        let found: BTreeSet<BodyId> = self
            .colliders
            .iter()
            .filter(|(_, c)| from_aabb(&c.compute_aabb()).intersects(&area))
            .filter_map(|(h, _)| self.owners.get(&h).copied())
            .collect();
        found.into_iter().collect()
    }

    fn bodies_at_point(&self, at: &PhysVec) -> Vec<BodyId> {
        let p = point(at);
        let found: BTreeSet<BodyId> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.shape().contains_point(c.position(), &p))
            .filter_map(|(h, _)| self.owners.get(&h).copied())
            .collect();
        found.into_iter().collect()
    }

    // -- Parameters --

    fn gravity(&self) -> PhysVec {
        from_vector(&self.gravity)
    }

    fn set_gravity(&mut self, gravity: &PhysVec) {
        self.gravity = vector(gravity);
    }

    fn set_time_step(&mut self, dt: f32) {
        self.params.dt = dt;
    }

    fn set_solver_iterations(&mut self, iterations: NonZeroUsize) {
        self.params.num_solver_iterations = iterations;
    }

    fn set_max_ccd_substeps(&mut self, substeps: usize) {
        self.params.max_ccd_substeps = substeps;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
