//! [`World`]: one simulation instance over a [`Kernel`].
//!
//! The world owns the dimension conversion (every vector entering is moved
//! into `K::DIMENSION`), the body and constraint registries, the fixed-step
//! accumulator, the contact counter that turns kernel notifications into
//! `Start`/`Active`/`End` events, and the degradation log.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use duophys_core::events::SubscriptionId;
use duophys_core::material::DEFAULT_MATERIAL;
use duophys_core::metrics::RollingAverage;
use duophys_core::prelude::*;
use duophys_core::types::UserData;
use tracing::{debug, info, warn};

use crate::body::{BodyRecord, BodyState, ShapeSlot};
use crate::constraint::PhysicsConstraint;
use crate::contract::{PhysicsWorld, WorldState};
use crate::debug::DebugPrimitive;
use crate::engine::EngineContext;
use crate::kernel::{Kernel, RawContact};

/// Step durations kept for the rolling average.
const STEP_SAMPLES: usize = 60;

/// Slack when comparing the accumulator against the time step.
const ACCUMULATOR_EPSILON: f32 = 1.0e-6;

// ---------------------------------------------------------------------------
// Internal records
// ---------------------------------------------------------------------------

struct ConstraintSlot<K: Kernel> {
    record: PhysicsConstraint,
    joint: Option<K::JointHandle>,
}

/// Live contact between two bodies. `count` is the number of touching
/// collider pairs.
#[derive(Debug, Clone, Copy, Default)]
struct PairState {
    count: u32,
    point: Option<PhysVec>,
    normal: Option<PhysVec>,
}

/// Pair key with the smaller id first, plus whether the input was swapped.
fn ordered(a: BodyId, b: BodyId) -> ((BodyId, BodyId), bool) {
    if a <= b { ((a, b), false) } else { ((b, a), true) }
}

/// Attach `shape` to `record`, falling back to a cuboid for kinds the
/// dimension lacks and to a ball when the kernel rejects the geometry.
fn attach_with_fallback<K: Kernel>(
    kernel: &mut K,
    degradations: &mut Vec<Degradation>,
    world: WorldId,
    record: &mut BodyRecord<K>,
    shape: ShapeDesc,
) -> Option<ShapeId> {
    let mut shape = shape.into_dimension(K::DIMENSION);

    if !shape.kind.supported_in(K::DIMENSION) {
        let (half_height, radius) = match shape.kind {
            ShapeKind::Cylinder {
                half_height,
                radius,
            }
            | ShapeKind::Cone {
                half_height,
                radius,
            } => (half_height, radius),
            _ => (shape.bounding_radius(), shape.bounding_radius()),
        };
        let degradation = Degradation::new(
            format!("shape:{}", shape.kind.name()),
            "shape:cuboid",
            format!("{} has no {} in {}", record.id, shape.kind.name(), K::DIMENSION),
        );
        warn!("duophys: world {world} degraded {degradation}");
        degradations.push(degradation);
        let half_extents = match K::DIMENSION {
            Dimension::Two => PhysVec::xy(radius, half_height),
            Dimension::Three => PhysVec::xyz(radius, half_height, radius),
        };
        shape = ShapeDesc {
            kind: ShapeKind::Cuboid { half_extents },
            ..shape
        };
    }

    let params = record.collider_params(shape.density);
    let handle = match kernel.attach_shape(record.handle, &shape, &params) {
        Some(handle) => handle,
        None => {
            let degradation = Degradation::new(
                format!("shape:{}", shape.kind.name()),
                "shape:ball",
                format!("{} got a bounding ball for an unbuildable shape", record.id),
            );
            warn!("duophys: world {world} degraded {degradation}");
            degradations.push(degradation);
            shape = ShapeDesc {
                kind: ShapeKind::Ball {
                    radius: shape.bounding_radius(),
                },
                ..shape
            };
            kernel.attach_shape(record.handle, &shape, &params)?
        }
    };

    let id = record.allocate_shape_id();
    record.shapes.push(ShapeSlot {
        id,
        handle,
        desc: shape,
    });
    Some(id)
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// A world simulated by kernel `K`.
pub struct World<K: Kernel> {
    id: WorldId,
    config: WorldConfig,
    state: WorldState,
    kernel: K,
    context: Rc<EngineContext<K>>,
    bodies: BTreeMap<BodyId, BodyRecord<K>>,
    constraints: BTreeMap<ConstraintId, ConstraintSlot<K>>,
    next_body: u64,
    next_constraint: u64,
    contacts: BTreeMap<(BodyId, BodyId), PairState>,
    collisions: EventBus<CollisionEvent>,
    body_events: EventBus<BodyEvent>,
    accumulator: f32,
    simulated_time: f64,
    step_times: RollingAverage,
    last_step_ms: f64,
    degradations: Vec<Degradation>,
    sleep_thresholds: SleepThresholds,
    time_until_sleep: Option<f32>,
    raw: Vec<RawContact>,
}

impl<K: Kernel> World<K> {
    /// A world in state `Created`. `config` is moved into `K::DIMENSION`.
    pub(crate) fn new(id: WorldId, mut config: WorldConfig, context: Rc<EngineContext<K>>) -> Self {
        config.dimension = K::DIMENSION;
        config.gravity = Some(config.resolved_gravity());
        config.bounds = config.bounds.map(|b| b.into_dimension(K::DIMENSION));

        let mut degradations = Vec::new();
        if config.bounds.is_some() {
            let degradation = Degradation::new(
                "world_bounds",
                "culling_metric",
                "bodies outside the bounds are counted as culled, not removed",
            );
            warn!("duophys: world {id} degraded {degradation}");
            degradations.push(degradation);
        }

        let sleep_thresholds = context.config.optimizer.initial_sleep_thresholds;
        debug!(
            "duophys: world {id} created ({}, dt={}, iterations={})",
            K::ENGINE,
            config.time_step,
            config.solver_iterations
        );
        Self {
            id,
            kernel: K::new(&config),
            config,
            state: WorldState::Created,
            context,
            bodies: BTreeMap::new(),
            constraints: BTreeMap::new(),
            next_body: 0,
            next_constraint: 0,
            contacts: BTreeMap::new(),
            collisions: EventBus::new(),
            body_events: EventBus::new(),
            accumulator: 0.0,
            simulated_time: 0.0,
            step_times: RollingAverage::new(STEP_SAMPLES),
            last_step_ms: 0.0,
            degradations,
            sleep_thresholds,
            time_until_sleep: None,
            raw: Vec::new(),
        }
    }

    /// The underlying kernel, for inspection.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    // -- Helpers --

    fn ensure_alive(&self) -> Result<(), ResourceError> {
        if self.state == WorldState::Destroyed {
            Err(ResourceError::WorldDestroyed(self.id))
        } else {
            Ok(())
        }
    }

    const fn missing(&self, body: BodyId) -> ResourceError {
        ResourceError::MissingBody {
            body,
            world: self.id,
        }
    }

    fn record(&self, body: BodyId) -> Result<&BodyRecord<K>, ResourceError> {
        self.ensure_alive()?;
        self.bodies.get(&body).ok_or(self.missing(body))
    }

    fn record_mut(&mut self, body: BodyId) -> Result<&mut BodyRecord<K>, ResourceError> {
        self.ensure_alive()?;
        let missing = self.missing(body);
        self.bodies.get_mut(&body).ok_or(missing)
    }

    fn handle(&self, body: BodyId) -> Result<K::BodyHandle, ResourceError> {
        self.record(body).map(|r| r.handle)
    }

    fn emit(&mut self, event: BodyEvent) {
        self.body_events
            .publish_all(&[Topic::Body(event.body()), Topic::World], &event);
    }

    fn degrade(&mut self, degradation: Degradation) {
        warn!("duophys: world {} degraded {degradation}", self.id);
        self.degradations.push(degradation);
    }

    fn publish_collision(
        &mut self,
        kind: CollisionKind,
        (body_a, body_b): (BodyId, BodyId),
        contact_point: Option<PhysVec>,
        contact_normal: Option<PhysVec>,
    ) {
        let event = CollisionEvent {
            kind,
            body_a,
            body_b,
            contact_point,
            contact_normal,
            timestamp: self.simulated_time,
        };
        self.collisions.publish_all(
            &[Topic::World, Topic::Body(body_a), Topic::Body(body_b)],
            &event,
        );
    }

    fn resolve_material(&self, id: &str) -> Result<Arc<PhysicsMaterial>, ResourceError> {
        self.context
            .materials
            .borrow()
            .get(id)
            .ok_or_else(|| ResourceError::MissingMaterial(id.to_owned()))
    }

    /// Push every shape's collider parameters again, then the mass override.
    fn reconfigure_shapes(&mut self, body: BodyId) {
        let Some(record) = self.bodies.get(&body) else {
            return;
        };
        for slot in &record.shapes {
            self.kernel
                .configure_shape(slot.handle, &record.collider_params(slot.desc.density));
        }
        if let Some(mass) = record.mass_override {
            self.kernel.set_mass(record.handle, mass);
        }
    }

    fn reapply_sleep_params(&mut self) {
        for record in self.bodies.values() {
            let params = record.sleep_params(self.config.sleeping, self.sleep_thresholds);
            self.kernel
                .set_sleep_params(record.handle, params, self.time_until_sleep);
        }
    }

    /// Fold this step's kernel notifications into the pair counters and
    /// publish the resulting events.
    fn dispatch_contacts(&mut self) {
        let mut raw = std::mem::take(&mut self.raw);
        let mut started = BTreeSet::new();

        for contact in &raw {
            let (key, swapped) = ordered(contact.body_a, contact.body_b);
            let normal = contact.normal.map(|n| if swapped { -n } else { n });
            if contact.started {
                let pair = self.contacts.entry(key).or_default();
                pair.count += 1;
                if contact.point.is_some() {
                    pair.point = contact.point;
                    pair.normal = normal;
                }
                let pair = *pair;
                if pair.count == 1 {
                    started.insert(key);
                    self.publish_collision(CollisionKind::Start, key, pair.point, pair.normal);
                }
            } else if let Some(pair) = self.contacts.get_mut(&key) {
                pair.count = pair.count.saturating_sub(1);
                if pair.count == 0 {
                    let pair = *pair;
                    self.contacts.remove(&key);
                    self.publish_collision(CollisionKind::End, key, pair.point, pair.normal);
                }
            }
        }

        let samples = self.kernel.contact_samples();
        let live: Vec<(BodyId, BodyId)> = self
            .contacts
            .keys()
            .filter(|key| !started.contains(*key))
            .copied()
            .collect();
        for key in live {
            let sample = samples
                .iter()
                .find(|s| ordered(s.body_a, s.body_b).0 == key);
            let Some(pair) = self.contacts.get_mut(&key) else {
                continue;
            };
            if let Some(sample) = sample {
                let swapped = sample.body_a != key.0;
                pair.point = Some(sample.point);
                pair.normal = Some(if swapped { -sample.normal } else { sample.normal });
            }
            let pair = *pair;
            self.publish_collision(CollisionKind::Active, key, pair.point, pair.normal);
        }

        raw.clear();
        self.raw = raw;
    }

    fn refresh_sleep_states(&mut self) {
        let mut changed = Vec::new();
        for record in self.bodies.values_mut() {
            let Some(sleeping) = self.kernel.is_sleeping(record.handle) else {
                continue;
            };
            let state = if sleeping {
                SleepState::Sleeping
            } else {
                SleepState::Active
            };
            if state != record.sleep_state {
                record.sleep_state = state;
                changed.push((record.id, state));
            }
        }
        for (body, state) in changed {
            self.emit(BodyEvent::SleepChanged { body, state });
        }
    }

    fn set_state(&mut self, state: WorldState) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        if self.state != state {
            debug!(
                "duophys: world {} {} -> {}",
                self.id,
                self.state.as_str(),
                state.as_str()
            );
            self.state = state;
        }
        Ok(())
    }
}

impl<K: Kernel> PhysicsWorld for World<K> {
    // -- Identity --

    fn id(&self) -> WorldId {
        self.id
    }

    fn dimension(&self) -> Dimension {
        K::DIMENSION
    }

    fn engine_type(&self) -> EngineType {
        K::ENGINE
    }

    fn config(&self) -> &WorldConfig {
        &self.config
    }

    fn state(&self) -> WorldState {
        self.state
    }

    // -- Lifecycle --

    fn start(&mut self) -> Result<(), ResourceError> {
        self.set_state(WorldState::Running)
    }

    fn stop(&mut self) -> Result<(), ResourceError> {
        self.set_state(WorldState::Stopped)
    }

    fn pause(&mut self) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        if self.state == WorldState::Running {
            self.set_state(WorldState::Paused)?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        if self.state == WorldState::Paused {
            self.set_state(WorldState::Running)?;
        }
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), ResourceError> {
        match self.state {
            WorldState::Destroyed => return Err(ResourceError::WorldDestroyed(self.id)),
            WorldState::Paused => return Ok(()),
            _ => {}
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(());
        }

        let started = Instant::now();
        let time_step = self.config.time_step;
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator + ACCUMULATOR_EPSILON >= time_step
            && substeps < self.config.max_substeps
        {
            self.kernel.step(&mut self.raw);
            self.accumulator -= time_step;
            self.simulated_time += f64::from(time_step);
            substeps += 1;
        }
        if self.accumulator + ACCUMULATOR_EPSILON >= time_step {
            debug!(
                "duophys: world {} dropped {:.4}s of backlog after {substeps} substeps",
                self.id, self.accumulator
            );
            self.accumulator = 0.0;
        }
        self.accumulator = self.accumulator.max(0.0);

        if substeps > 0 {
            self.kernel.clear_forces();
            self.dispatch_contacts();
            self.refresh_sleep_states();
        }

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        self.last_step_ms = elapsed;
        self.step_times.push(elapsed);
        Ok(())
    }

    fn tick(&mut self, dt: f32) -> Result<bool, ResourceError> {
        match self.state {
            WorldState::Running => self.step(dt).map(|()| true),
            WorldState::Destroyed => Err(ResourceError::WorldDestroyed(self.id)),
            _ => Ok(false),
        }
    }

    fn clear(&mut self) {
        let joints: Vec<K::JointHandle> = std::mem::take(&mut self.constraints)
            .into_values()
            .filter_map(|slot| slot.joint)
            .collect();
        for joint in joints {
            self.kernel.remove_joint(joint);
        }
        let ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        for id in ids {
            // Only fails for unknown ids, which cannot happen here.
            let _ = self.remove_body(id);
        }
        self.accumulator = 0.0;
    }

    fn destroy(&mut self) {
        if self.state == WorldState::Destroyed {
            return;
        }
        self.clear();
        self.collisions.clear();
        self.body_events.clear();
        self.state = WorldState::Destroyed;
        info!("duophys: world {} destroyed", self.id);
    }

    fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    // -- Bodies --

    fn create_body(&mut self, desc: BodyDesc) -> Result<BodyId, PhysicsError> {
        self.ensure_alive()?;
        desc.validate()?;
        let material =
            self.resolve_material(desc.material.as_deref().unwrap_or(DEFAULT_MATERIAL))?;

        let id = BodyId(self.next_body);
        self.next_body += 1;

        let position = desc.position.into_dimension(K::DIMENSION);
        let rotation = desc.rotation.map_or_else(
            || Rotation::identity(K::DIMENSION),
            |r| r.into_dimension(K::DIMENSION),
        );
        let recycled = self.context.pool.borrow_mut().acquire();
        let handle = self
            .kernel
            .insert_body(id, desc.kind, &position, &rotation, recycled);
        let mut record = BodyRecord::new(id, handle, &desc, material);

        for shape in &desc.shapes {
            attach_with_fallback(
                &mut self.kernel,
                &mut self.degradations,
                self.id,
                &mut record,
                shape.clone(),
            );
        }
        if record.shapes.is_empty() {
            if let Some(native) = self.kernel.remove_body(handle) {
                self.context.pool.borrow_mut().release(native);
            }
            return Err(ConfigError::InvalidBodyConfig(format!("{id}: no shape could be built")).into());
        }

        // Second pass: everything that depends on the attached colliders.
        if let Some(mass) = record.mass_override {
            self.kernel.set_mass(handle, mass);
        }
        record.linear_damping = desc
            .linear_damping
            .or(record.material.linear_damping)
            .or(record.material.air_friction)
            .unwrap_or(0.0);
        record.angular_damping = desc
            .angular_damping
            .or(record.material.angular_damping)
            .unwrap_or(0.0);
        self.kernel
            .set_damping(handle, record.linear_damping, record.angular_damping);
        self.kernel.set_gravity_scale(handle, desc.gravity_scale);
        self.kernel.set_fixed_rotation(handle, desc.fixed_rotation);
        self.kernel.set_ccd(handle, desc.ccd);
        self.kernel.set_sleep_params(
            handle,
            record.sleep_params(self.config.sleeping, self.sleep_thresholds),
            self.time_until_sleep,
        );
        if let Some(velocity) = desc.velocity {
            self.kernel
                .set_velocity(handle, &velocity.into_dimension(K::DIMENSION));
        }
        if let Some(angular) = desc.angular_velocity {
            self.kernel
                .set_angular_velocity(handle, &angular.into_dimension(K::DIMENSION));
        }
        self.kernel.set_user_data(handle, desc.user_data);

        self.bodies.insert(id, record);
        self.emit(BodyEvent::Created { body: id });
        Ok(id)
    }

    fn remove_body(&mut self, body: BodyId) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        let record = self.bodies.remove(&body).ok_or(self.missing(body))?;

        let pairs: Vec<(BodyId, BodyId)> = self
            .contacts
            .keys()
            .filter(|(a, b)| *a == body || *b == body)
            .copied()
            .collect();
        for key in pairs {
            if let Some(pair) = self.contacts.remove(&key) {
                self.publish_collision(CollisionKind::End, key, pair.point, pair.normal);
            }
        }

        let attached: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|(_, slot)| slot.record.connects(body))
            .map(|(id, _)| *id)
            .collect();
        for id in attached {
            if let Some(joint) = self.constraints.remove(&id).and_then(|slot| slot.joint) {
                self.kernel.remove_joint(joint);
            }
            debug!("duophys: world {} dropped {id} with {body}", self.id);
        }

        if let Some(native) = self.kernel.remove_body(record.handle) {
            self.context.pool.borrow_mut().release(native);
        }
        self.emit(BodyEvent::Removed { body });
        self.collisions.clear_topic(Topic::Body(body));
        self.body_events.clear_topic(Topic::Body(body));
        Ok(())
    }

    fn contains_body(&self, body: BodyId) -> bool {
        self.bodies.contains_key(&body)
    }

    fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.keys().copied().collect()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_state(&self, body: BodyId) -> Result<BodyState, ResourceError> {
        let record = self.record(body)?;
        let h = record.handle;
        let missing = || self.missing(body);
        Ok(BodyState {
            id: body,
            kind: record.kind,
            position: self.kernel.position(h).ok_or_else(missing)?,
            rotation: self.kernel.rotation(h).ok_or_else(missing)?,
            velocity: self.kernel.velocity(h).ok_or_else(missing)?,
            angular_velocity: self.kernel.angular_velocity(h).ok_or_else(missing)?,
            mass: self.kernel.mass(h).ok_or_else(missing)?,
            material: record.material.id.clone(),
            filter: record.filter,
            sensor: record.sensor,
            active: record.active,
            sleep_state: record.sleep_state,
            aabb: self.kernel.aabb(h),
            user_data: record.user_data,
            shapes: record.shapes.iter().map(|s| s.id).collect(),
        })
    }

    fn position(&self, body: BodyId) -> Result<PhysVec, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.position(h).ok_or(self.missing(body))
    }

    fn set_position(&mut self, body: BodyId, position: PhysVec) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let position = position.into_dimension(K::DIMENSION);
        self.kernel.set_position(h, &position);
        self.emit(BodyEvent::PositionChanged { body, position });
        Ok(())
    }

    fn rotation(&self, body: BodyId) -> Result<Rotation, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.rotation(h).ok_or(self.missing(body))
    }

    fn set_rotation(&mut self, body: BodyId, rotation: Rotation) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let rotation = rotation.into_dimension(K::DIMENSION);
        self.kernel.set_rotation(h, &rotation);
        self.emit(BodyEvent::RotationChanged { body, rotation });
        Ok(())
    }

    fn velocity(&self, body: BodyId) -> Result<PhysVec, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.velocity(h).ok_or(self.missing(body))
    }

    fn set_velocity(&mut self, body: BodyId, velocity: PhysVec) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let velocity = velocity.into_dimension(K::DIMENSION);
        self.kernel.set_velocity(h, &velocity);
        self.emit(BodyEvent::VelocityChanged { body, velocity });
        Ok(())
    }

    fn angular_velocity(&self, body: BodyId) -> Result<AngularVec, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.angular_velocity(h).ok_or(self.missing(body))
    }

    fn set_angular_velocity(
        &mut self,
        body: BodyId,
        angular_velocity: AngularVec,
    ) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let angular_velocity = angular_velocity.into_dimension(K::DIMENSION);
        self.kernel.set_angular_velocity(h, &angular_velocity);
        self.emit(BodyEvent::AngularVelocityChanged {
            body,
            angular_velocity,
        });
        Ok(())
    }

    fn mass(&self, body: BodyId) -> Result<f32, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.mass(h).ok_or(self.missing(body))
    }

    fn set_mass(&mut self, body: BodyId, mass: f32) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.mass_override = Some(mass);
        let h = record.handle;
        self.kernel.set_mass(h, mass);
        self.emit(BodyEvent::MassChanged { body, mass });
        Ok(())
    }

    fn material(&self, body: BodyId) -> Result<Arc<PhysicsMaterial>, ResourceError> {
        self.record(body).map(|r| Arc::clone(&r.material))
    }

    fn set_material(&mut self, body: BodyId, material: &str) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        let material = self.resolve_material(material)?;
        let id = material.id.clone();
        self.record_mut(body)?.material = material;
        self.reconfigure_shapes(body);
        self.emit(BodyEvent::MaterialChanged { body, material: id });
        Ok(())
    }

    fn gravity_scale(&self, body: BodyId) -> Result<f32, ResourceError> {
        self.record(body).map(|r| r.gravity_scale)
    }

    fn set_gravity_scale(&mut self, body: BodyId, scale: f32) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.gravity_scale = scale;
        let h = record.handle;
        self.kernel.set_gravity_scale(h, scale);
        self.emit(BodyEvent::GravityScaleChanged { body, scale });
        Ok(())
    }

    fn damping(&self, body: BodyId) -> Result<(f32, f32), ResourceError> {
        self.record(body)
            .map(|r| (r.linear_damping, r.angular_damping))
    }

    fn set_damping(
        &mut self,
        body: BodyId,
        linear: f32,
        angular: f32,
    ) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.linear_damping = linear;
        record.angular_damping = angular;
        let h = record.handle;
        self.kernel.set_damping(h, linear, angular);
        self.emit(BodyEvent::DampingChanged {
            body,
            linear,
            angular,
        });
        Ok(())
    }

    fn collision_filter(&self, body: BodyId) -> Result<CollisionFilter, ResourceError> {
        self.record(body).map(|r| r.filter)
    }

    fn set_collision_filter(
        &mut self,
        body: BodyId,
        filter: CollisionFilter,
    ) -> Result<(), ResourceError> {
        self.record_mut(body)?.filter = filter;
        self.reconfigure_shapes(body);
        self.emit(BodyEvent::FilterChanged {
            body,
            group: filter.group,
            mask: filter.mask,
        });
        Ok(())
    }

    fn user_data(&self, body: BodyId) -> Result<UserData, ResourceError> {
        self.record(body).map(|r| r.user_data)
    }

    fn set_user_data(&mut self, body: BodyId, user_data: UserData) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.user_data = user_data;
        let h = record.handle;
        self.kernel.set_user_data(h, user_data);
        self.emit(BodyEvent::UserDataChanged { body, user_data });
        Ok(())
    }

    fn apply_force(
        &mut self,
        body: BodyId,
        force: PhysVec,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let force = force.into_dimension(K::DIMENSION);
        let point = point.map(|p| p.into_dimension(K::DIMENSION));
        self.kernel.add_force(h, &force, point.as_ref());
        self.emit(BodyEvent::ForceApplied { body, force, point });
        Ok(())
    }

    fn apply_impulse(
        &mut self,
        body: BodyId,
        impulse: PhysVec,
        point: Option<PhysVec>,
    ) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let impulse = impulse.into_dimension(K::DIMENSION);
        let point = point.map(|p| p.into_dimension(K::DIMENSION));
        self.kernel.apply_impulse(h, &impulse, point.as_ref());
        self.emit(BodyEvent::ImpulseApplied {
            body,
            impulse,
            point,
        });
        Ok(())
    }

    fn apply_torque(&mut self, body: BodyId, torque: AngularVec) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        let torque = torque.into_dimension(K::DIMENSION);
        self.kernel.add_torque(h, &torque);
        self.emit(BodyEvent::TorqueApplied { body, torque });
        Ok(())
    }

    fn kind(&self, body: BodyId) -> Result<BodyKind, ResourceError> {
        self.record(body).map(|r| r.kind)
    }

    fn set_kind(&mut self, body: BodyId, kind: BodyKind) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.kind = kind;
        let h = record.handle;
        self.kernel.set_kind(h, kind);
        self.emit(BodyEvent::KindChanged { body, kind });
        Ok(())
    }

    fn is_sensor(&self, body: BodyId) -> Result<bool, ResourceError> {
        self.record(body).map(|r| r.sensor)
    }

    fn set_sensor(&mut self, body: BodyId, sensor: bool) -> Result<(), ResourceError> {
        self.record_mut(body)?.sensor = sensor;
        self.reconfigure_shapes(body);
        self.emit(BodyEvent::SensorChanged { body, sensor });
        Ok(())
    }

    fn is_active(&self, body: BodyId) -> Result<bool, ResourceError> {
        self.record(body).map(|r| r.active)
    }

    fn set_active(&mut self, body: BodyId, active: bool) -> Result<(), ResourceError> {
        let record = self.record_mut(body)?;
        record.active = active;
        let h = record.handle;
        self.kernel.set_enabled(h, active);
        self.emit(BodyEvent::ActiveChanged { body, active });
        Ok(())
    }

    fn wake_up(&mut self, body: BodyId) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        self.kernel.wake_up(h);
        let record = self.record_mut(body)?;
        if record.sleep_state == SleepState::Sleeping {
            record.sleep_state = SleepState::Active;
            self.emit(BodyEvent::SleepChanged {
                body,
                state: SleepState::Active,
            });
        }
        Ok(())
    }

    fn sleep(&mut self, body: BodyId) -> Result<(), ResourceError> {
        let h = self.handle(body)?;
        self.kernel.sleep(h);
        let record = self.record_mut(body)?;
        if record.sleep_state == SleepState::Active {
            record.sleep_state = SleepState::Sleeping;
            self.emit(BodyEvent::SleepChanged {
                body,
                state: SleepState::Sleeping,
            });
        }
        Ok(())
    }

    fn sleep_state(&self, body: BodyId) -> Result<SleepState, ResourceError> {
        let record = self.record(body)?;
        Ok(match self.kernel.is_sleeping(record.handle) {
            Some(true) => SleepState::Sleeping,
            Some(false) => SleepState::Active,
            None => record.sleep_state,
        })
    }

    fn add_shape(
        &mut self,
        body: BodyId,
        shape: ShapeDesc,
    ) -> Result<Option<ShapeId>, ResourceError> {
        self.ensure_alive()?;
        let missing = self.missing(body);
        let record = self.bodies.get_mut(&body).ok_or(missing)?;
        let id = attach_with_fallback(
            &mut self.kernel,
            &mut self.degradations,
            self.id,
            record,
            shape,
        );
        if let Some(mass) = record.mass_override {
            self.kernel.set_mass(record.handle, mass);
        }
        if let Some(shape) = id {
            self.emit(BodyEvent::ShapeAdded { body, shape });
        }
        Ok(id)
    }

    fn remove_shape(&mut self, body: BodyId, shape: ShapeId) -> Result<bool, ResourceError> {
        let record = self.record(body)?;
        let Some(index) = record.shape_index(shape) else {
            return Ok(false);
        };
        if record.shapes.len() == 1 {
            self.degrade(Degradation::new(
                "remove_shape",
                "shape_kept",
                format!("{shape} is the last shape of {body}"),
            ));
            return Ok(false);
        }

        let record = self.record_mut(body)?;
        let slot = record.shapes.remove(index);
        let mass = record.mass_override;
        let h = record.handle;
        self.kernel.detach_shape(slot.handle);
        if let Some(mass) = mass {
            self.kernel.set_mass(h, mass);
        }
        self.emit(BodyEvent::ShapeRemoved { body, shape });
        Ok(true)
    }

    fn shape_ids(&self, body: BodyId) -> Result<Vec<ShapeId>, ResourceError> {
        self.record(body)
            .map(|r| r.shapes.iter().map(|s| s.id).collect())
    }

    fn aabb(&self, body: BodyId) -> Result<Aabb, ResourceError> {
        let h = self.handle(body)?;
        self.kernel.aabb(h).ok_or(self.missing(body))
    }

    // -- Constraints --

    fn create_constraint(&mut self, desc: ConstraintDesc) -> Result<ConstraintId, PhysicsError> {
        let a = self.handle(desc.body_a)?;
        let b = self.handle(desc.body_b)?;
        let separation = match (self.kernel.position(a), self.kernel.position(b)) {
            (Some(pa), Some(pb)) => pa.distance(&pb),
            _ => 0.0,
        };

        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        let record = PhysicsConstraint::new(id, &desc, K::DIMENSION, separation);
        if let Some(degradation) = record.degradation() {
            self.degrade(degradation);
        }
        let joint = self.kernel.insert_joint(a, b, &record.joint_spec());
        if joint.is_none() {
            warn!(
                "duophys: world {} could not build a native joint for {id}",
                self.id
            );
        }
        debug!(
            "duophys: world {} created {id} ({} between {} and {})",
            self.id,
            record.realized_kind(),
            record.body_a,
            record.body_b
        );
        self.constraints.insert(id, ConstraintSlot { record, joint });
        Ok(id)
    }

    fn remove_constraint(&mut self, constraint: ConstraintId) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        let slot = self
            .constraints
            .remove(&constraint)
            .ok_or(ResourceError::MissingConstraint {
                constraint,
                world: self.id,
            })?;
        if let Some(joint) = slot.joint {
            self.kernel.remove_joint(joint);
        }
        Ok(())
    }

    fn constraint(&self, constraint: ConstraintId) -> Option<&PhysicsConstraint> {
        self.constraints.get(&constraint).map(|slot| &slot.record)
    }

    fn constraint_ids(&self) -> Vec<ConstraintId> {
        self.constraints.keys().copied().collect()
    }

    fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn set_motor(&mut self, constraint: ConstraintId, motor: Motor) -> Result<(), ResourceError> {
        self.ensure_alive()?;
        let world = self.id;
        let slot = self
            .constraints
            .get_mut(&constraint)
            .ok_or(ResourceError::MissingConstraint { constraint, world })?;
        slot.record.motor = Some(motor);
        if !matches!(
            slot.record.realized_kind(),
            ConstraintKind::Revolute | ConstraintKind::Motorized | ConstraintKind::Prismatic
        ) {
            return Ok(());
        }

        let a = self.bodies.get(&slot.record.body_a).map(|r| r.handle);
        let b = self.bodies.get(&slot.record.body_b).map(|r| r.handle);
        if let Some(joint) = slot.joint.take() {
            self.kernel.remove_joint(joint);
        }
        if let (Some(a), Some(b)) = (a, b) {
            slot.joint = self.kernel.insert_joint(a, b, &slot.record.joint_spec());
        }
        Ok(())
    }

    // -- Queries --

    fn raycast(&self, from: PhysVec, to: PhysVec, mask: Option<u32>) -> Vec<RaycastHit> {
        if self.state == WorldState::Destroyed {
            return Vec::new();
        }
        let from = from.into_dimension(K::DIMENSION);
        let to = to.into_dimension(K::DIMENSION);
        let delta = to - from;
        let length = delta.length();
        if !(length > 0.0) {
            return Vec::new();
        }

        let mut hits: Vec<RaycastHit> = self
            .kernel
            .cast_ray(&from, &(delta * (1.0 / length)), length)
            .into_iter()
            .filter(|hit| {
                self.bodies.get(&hit.body).is_some_and(|r| {
                    !r.sensor && r.active && mask.is_none_or(|m| r.filter.matches_mask(m))
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyId> {
        let aabb = aabb.into_dimension(K::DIMENSION);
        self.kernel
            .bodies_in_aabb(&aabb)
            .into_iter()
            .filter(|id| self.bodies.contains_key(id))
            .collect()
    }

    fn query_point(&self, point: PhysVec) -> Vec<BodyId> {
        let point = point.into_dimension(K::DIMENSION);
        self.kernel
            .bodies_at_point(&point)
            .into_iter()
            .filter(|id| self.bodies.contains_key(id))
            .collect()
    }

    fn check_collision(&self, a: BodyId, b: BodyId) -> bool {
        self.contacts.contains_key(&ordered(a, b).0)
    }

    fn contact_pairs(&self) -> Vec<(BodyId, BodyId)> {
        self.contacts.keys().copied().collect()
    }

    // -- Events --

    fn on_collision(
        &mut self,
        topic: Topic,
        callback: Box<dyn FnMut(&CollisionEvent)>,
    ) -> SubscriptionId {
        self.collisions.subscribe(topic, callback)
    }

    fn collision_mailbox(&mut self, topic: Topic) -> Mailbox<CollisionEvent> {
        self.collisions.mailbox(topic)
    }

    fn unsubscribe_collisions(&mut self, id: SubscriptionId) -> bool {
        self.collisions.unsubscribe(id)
    }

    fn on_body_event(
        &mut self,
        topic: Topic,
        callback: Box<dyn FnMut(&BodyEvent)>,
    ) -> SubscriptionId {
        self.body_events.subscribe(topic, callback)
    }

    fn body_event_mailbox(&mut self, topic: Topic) -> Mailbox<BodyEvent> {
        self.body_events.mailbox(topic)
    }

    fn unsubscribe_body_events(&mut self, id: SubscriptionId) -> bool {
        self.body_events.unsubscribe(id)
    }

    // -- Parameters --

    fn gravity(&self) -> PhysVec {
        self.kernel.gravity()
    }

    fn set_gravity(&mut self, gravity: PhysVec) {
        let gravity = gravity.into_dimension(K::DIMENSION);
        self.kernel.set_gravity(&gravity);
        self.config.gravity = Some(gravity);
        let handles: Vec<K::BodyHandle> = self
            .bodies
            .values()
            .filter(|r| r.kind == BodyKind::Dynamic)
            .map(|r| r.handle)
            .collect();
        for h in handles {
            self.kernel.wake_up(h);
        }
    }

    fn time_step(&self) -> f32 {
        self.config.time_step
    }

    fn set_time_step(&mut self, time_step: f32) -> Result<(), ConfigError> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "time_step".into(),
                message: format!("{time_step} (must be > 0)"),
            });
        }
        self.config.time_step = time_step;
        self.kernel.set_time_step(time_step);
        Ok(())
    }

    fn solver_iterations(&self) -> usize {
        self.config.solver_iterations
    }

    fn set_solver_iterations(&mut self, iterations: usize) -> Result<(), ConfigError> {
        let n = NonZeroUsize::new(iterations).ok_or_else(|| ConfigError::InvalidValue {
            field: "solver_iterations".into(),
            message: "must be >= 1".into(),
        })?;
        self.config.solver_iterations = iterations;
        self.kernel.set_solver_iterations(n);
        Ok(())
    }

    fn sleep_thresholds(&self) -> SleepThresholds {
        self.sleep_thresholds
    }

    fn set_sleep_thresholds(&mut self, thresholds: SleepThresholds) {
        self.sleep_thresholds = thresholds;
        self.reapply_sleep_params();
    }

    fn optimize_for_mobile(&mut self) {
        let mobile = self.context.config.mobile.clone();
        self.config.sleeping = true;
        self.sleep_thresholds = mobile.sleep_thresholds;
        self.time_until_sleep = Some(mobile.time_until_sleep);
        if let Some(n) = NonZeroUsize::new(mobile.solver_iterations) {
            self.config.solver_iterations = mobile.solver_iterations;
            self.kernel.set_solver_iterations(n);
        }
        self.kernel.set_max_ccd_substeps(mobile.max_ccd_substeps);
        self.reapply_sleep_params();

        if !self.degradations.iter().any(|d| d.feature == "broad_phase:mobile") {
            self.degrade(Degradation::new(
                "broad_phase:mobile",
                "broad_phase:default",
                format!("{} keeps its own broad phase", K::ENGINE),
            ));
        }
        info!(
            "duophys: world {} optimized for mobile (iterations={}, ccd substeps={})",
            self.id, self.config.solver_iterations, mobile.max_ccd_substeps
        );
    }

    // -- Diagnostics --

    fn performance_metrics(&self) -> PerformanceMetrics {
        let mut active_bodies = 0;
        let mut sleeping_bodies = 0;
        let mut culled_bodies = 0;
        for record in self.bodies.values() {
            if record.kind != BodyKind::Static && record.active {
                if self.kernel.is_sleeping(record.handle).unwrap_or(false) {
                    sleeping_bodies += 1;
                } else {
                    active_bodies += 1;
                }
            }
            if let (Some(bounds), Some(position)) =
                (&self.config.bounds, self.kernel.position(record.handle))
            {
                if !bounds.contains_point(&position) {
                    culled_bodies += 1;
                }
            }
        }

        PerformanceMetrics {
            average_step_ms: self.step_times.mean().unwrap_or(0.0),
            last_step_ms: self.last_step_ms,
            bodies: self.bodies.len(),
            constraints: self.constraints.len(),
            contacts: self.contacts.len(),
            active_bodies,
            sleeping_bodies,
            culled_bodies,
            estimated_memory_bytes: PerformanceMetrics::estimate_memory(
                self.bodies.len(),
                self.constraints.len(),
                self.contacts.len(),
            ),
            worlds: 1,
            pooled_handles: 0,
        }
    }

    fn last_step_ms(&self) -> f64 {
        self.last_step_ms
    }

    fn enable_debug_draw(&mut self, enabled: bool) {
        self.config.debug_draw = enabled;
    }

    fn debug_draw_enabled(&self) -> bool {
        self.config.debug_draw
    }

    fn debug_primitives(&self) -> Vec<DebugPrimitive> {
        if !self.config.debug_draw {
            return Vec::new();
        }
        let mut primitives = Vec::new();
        for record in self.bodies.values() {
            if let Some(aabb) = self.kernel.aabb(record.handle) {
                primitives.push(DebugPrimitive::Bounds {
                    body: record.id,
                    aabb,
                    sleeping: record.sleep_state == SleepState::Sleeping,
                });
            }
        }
        for slot in self.constraints.values() {
            let from = self
                .bodies
                .get(&slot.record.body_a)
                .and_then(|r| self.kernel.position(r.handle));
            let to = self
                .bodies
                .get(&slot.record.body_b)
                .and_then(|r| self.kernel.position(r.handle));
            if let (Some(from), Some(to)) = (from, to) {
                primitives.push(DebugPrimitive::Joint {
                    constraint: slot.record.id,
                    from,
                    to,
                });
            }
        }
        for sample in self.kernel.contact_samples() {
            primitives.push(DebugPrimitive::Contact {
                point: sample.point,
                normal: sample.normal,
            });
        }
        primitives
    }

    fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
