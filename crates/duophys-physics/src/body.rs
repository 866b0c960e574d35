//! Per-body bookkeeping kept by a world next to the native handle.

use std::sync::Arc;

use duophys_core::prelude::*;
use duophys_core::types::UserData;

use crate::kernel::{ColliderParams, Kernel};

/// One attached collider.
pub(crate) struct ShapeSlot<K: Kernel> {
    pub id: ShapeId,
    pub handle: K::ShapeHandle,
    pub desc: ShapeDesc,
}

/// State the kernel does not carry, or carries in a form we cannot read back.
pub(crate) struct BodyRecord<K: Kernel> {
    pub id: BodyId,
    pub handle: K::BodyHandle,
    pub kind: BodyKind,
    pub sensor: bool,
    pub active: bool,
    pub material: Arc<PhysicsMaterial>,
    pub filter: CollisionFilter,
    pub user_data: UserData,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub mass_override: Option<f32>,
    pub can_sleep: bool,
    pub sleep_override: Option<SleepThresholds>,
    pub shapes: Vec<ShapeSlot<K>>,
    pub next_shape: u32,
    pub sleep_state: SleepState,
}

impl<K: Kernel> BodyRecord<K> {
    pub fn new(
        id: BodyId,
        handle: K::BodyHandle,
        desc: &BodyDesc,
        material: Arc<PhysicsMaterial>,
    ) -> Self {
        Self {
            id,
            handle,
            kind: desc.kind,
            sensor: desc.sensor,
            active: true,
            material,
            filter: desc.filter,
            user_data: desc.user_data,
            gravity_scale: desc.gravity_scale,
            linear_damping: 0.0,
            angular_damping: 0.0,
            mass_override: desc.mass,
            can_sleep: desc.can_sleep,
            sleep_override: desc.sleep_thresholds,
            shapes: Vec::new(),
            next_shape: 0,
            sleep_state: SleepState::Active,
        }
    }

    /// Collider parameters for a shape with an optional own density.
    pub fn collider_params(&self, density: Option<f32>) -> ColliderParams {
        ColliderParams::from_material(&self.material, density, self.filter, self.sensor)
    }

    /// Thresholds to hand the kernel, `None` when the body may not sleep.
    pub fn sleep_params(
        &self,
        world_sleeping: bool,
        world_thresholds: SleepThresholds,
    ) -> Option<SleepThresholds> {
        (world_sleeping && self.can_sleep).then(|| self.sleep_override.unwrap_or(world_thresholds))
    }

    pub fn allocate_shape_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_shape);
        self.next_shape += 1;
        id
    }

    pub fn shape_index(&self, shape: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id == shape)
    }
}

/// Read-only snapshot of a body, in the world's dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: PhysVec,
    pub rotation: Rotation,
    pub velocity: PhysVec,
    pub angular_velocity: AngularVec,
    pub mass: f32,
    pub material: String,
    pub filter: CollisionFilter,
    pub sensor: bool,
    pub active: bool,
    pub sleep_state: SleepState,
    pub aabb: Option<Aabb>,
    pub user_data: UserData,
    pub shapes: Vec<ShapeId>,
}

impl BodyState {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.sleep_state == SleepState::Sleeping
    }
}
