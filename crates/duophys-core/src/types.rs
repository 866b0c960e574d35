//! Identifiers, descriptors and small value types shared by every backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::vector::{Aabb, AngularVec, Dimension, PhysVec, Rotation};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of a body, unique within its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// Identifier of a world, unique within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u32);

/// Identifier of a constraint, unique within its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

/// Identifier of a shape attached to a body, unique within that body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EngineType
// ---------------------------------------------------------------------------

/// The vendor kernel backing an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Rapier2d,
    Rapier3d,
}

impl EngineType {
    /// Default engine for a dimension.
    #[must_use]
    pub const fn for_dimension(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::Rapier2d,
            Dimension::Three => Self::Rapier3d,
        }
    }

    /// Dimension this engine simulates.
    #[must_use]
    pub const fn dimension(self) -> Dimension {
        match self {
            Self::Rapier2d => Dimension::Two,
            Self::Rapier3d => Dimension::Three,
        }
    }

    /// Stable name, e.g. `"rapier2d"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rapier2d => "rapier2d",
            Self::Rapier3d => "rapier3d",
        }
    }

    /// Resolve an optional engine name against a dimension.
    ///
    /// `None` and the generic `"rapier"` pick the dimension's default. A name
    /// that is unknown or belongs to the other dimension is rejected.
    pub fn resolve(dimension: Dimension, name: Option<&str>) -> Result<Self, ConfigError> {
        let Some(name) = name else {
            return Ok(Self::for_dimension(dimension));
        };
        let candidate = match name.trim().to_ascii_lowercase().as_str() {
            "rapier" => Some(Self::for_dimension(dimension)),
            "rapier2d" => Some(Self::Rapier2d),
            "rapier3d" => Some(Self::Rapier3d),
            _ => None,
        };
        match candidate {
            Some(engine) if engine.dimension() == dimension => Ok(engine),
            _ => Err(ConfigError::UnsupportedEngine {
                engine: name.to_string(),
                dimension,
            }),
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// Never moves.
    Static,
    /// Moved by the caller, pushes dynamic bodies, ignores forces.
    Kinematic,
    /// Fully simulated.
    #[default]
    Dynamic,
}

/// Whether a body currently takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepState {
    Active,
    Sleeping,
}

/// Velocity thresholds below which a body may fall asleep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepThresholds {
    /// Linear speed threshold.
    pub linear: f32,
    /// Angular speed threshold.
    pub angular: f32,
}

impl Default for SleepThresholds {
    fn default() -> Self {
        Self {
            linear: 0.1,
            angular: 0.1,
        }
    }
}

impl SleepThresholds {
    #[must_use]
    pub const fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Multiply both thresholds and clamp them into `[floor, cap]`.
    #[must_use]
    pub fn scaled(self, factor: f32, floor: f32, cap: f32) -> Self {
        Self {
            linear: (self.linear * factor).clamp(floor, cap),
            angular: (self.angular * factor).clamp(floor, cap),
        }
    }
}

/// Collision group membership and filter bitmasks.
///
/// Two bodies interact when each one's group intersects the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionFilter {
    /// Member of every group, collides with everything.
    pub const ALL: Self = Self {
        group: u32::MAX,
        mask: u32::MAX,
    };

    #[must_use]
    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Symmetric interaction test.
    #[must_use]
    pub const fn interacts_with(&self, other: &Self) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }

    /// Whether a query with `mask` may see this body.
    #[must_use]
    pub const fn matches_mask(&self, mask: u32) -> bool {
        (self.group & mask) != 0
    }
}

/// Geometry of one collider.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Circle in 2-D, sphere in 3-D.
    Ball { radius: f32 },
    /// Rectangle in 2-D, box in 3-D.
    Cuboid { half_extents: PhysVec },
    /// Vertical capsule (segment along Y).
    Capsule { half_height: f32, radius: f32 },
    /// 3-D only; 2-D worlds fall back to a rectangle.
    Cylinder { half_height: f32, radius: f32 },
    /// 3-D only; 2-D worlds fall back to a rectangle.
    Cone { half_height: f32, radius: f32 },
    /// Convex hull of the given points.
    ConvexHull { points: Vec<PhysVec> },
}

impl ShapeKind {
    /// Short name used in logs and degradation records.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ball { .. } => "ball",
            Self::Cuboid { .. } => "cuboid",
            Self::Capsule { .. } => "capsule",
            Self::Cylinder { .. } => "cylinder",
            Self::Cone { .. } => "cone",
            Self::ConvexHull { .. } => "convex_hull",
        }
    }

    /// Whether a backend of `dimension` can build this shape natively.
    #[must_use]
    pub const fn supported_in(&self, dimension: Dimension) -> bool {
        match self {
            Self::Cylinder { .. } | Self::Cone { .. } => matches!(dimension, Dimension::Three),
            _ => true,
        }
    }
}

/// A collider description attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDesc {
    pub kind: ShapeKind,
    /// Offset from the body origin.
    pub offset: Option<PhysVec>,
    /// Overrides the material density for this shape.
    pub density: Option<f32>,
}

impl ShapeDesc {
    #[must_use]
    pub const fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            offset: None,
            density: None,
        }
    }

    #[must_use]
    pub const fn ball(radius: f32) -> Self {
        Self::new(ShapeKind::Ball { radius })
    }

    #[must_use]
    pub fn cuboid(half_extents: impl Into<PhysVec>) -> Self {
        Self::new(ShapeKind::Cuboid {
            half_extents: half_extents.into(),
        })
    }

    #[must_use]
    pub const fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(ShapeKind::Capsule {
            half_height,
            radius,
        })
    }

    #[must_use]
    pub const fn cylinder(half_height: f32, radius: f32) -> Self {
        Self::new(ShapeKind::Cylinder {
            half_height,
            radius,
        })
    }

    #[must_use]
    pub const fn cone(half_height: f32, radius: f32) -> Self {
        Self::new(ShapeKind::Cone {
            half_height,
            radius,
        })
    }

    #[must_use]
    pub const fn convex_hull(points: Vec<PhysVec>) -> Self {
        Self::new(ShapeKind::ConvexHull { points })
    }

    /// Express every vector of the shape in `dimension`.
    ///
    /// Half extents stay positive after the Y flip. A rectangle promoted to
    /// 3-D takes its X half extent as depth.
    #[must_use]
    pub fn into_dimension(self, dimension: Dimension) -> Self {
        let kind = match self.kind {
            ShapeKind::Cuboid { half_extents } => {
                let from = half_extents.dimension();
                let half = match half_extents.into_dimension(dimension) {
                    PhysVec::D2(v) => PhysVec::xy(v.x.abs(), v.y.abs()),
                    PhysVec::D3(v) if from == Dimension::Two => {
                        PhysVec::xyz(v.x.abs(), v.y.abs(), v.x.abs())
                    }
                    PhysVec::D3(v) => PhysVec::xyz(v.x.abs(), v.y.abs(), v.z.abs()),
                };
                ShapeKind::Cuboid { half_extents: half }
            }
            ShapeKind::ConvexHull { points } => ShapeKind::ConvexHull {
                points: points
                    .into_iter()
                    .map(|p| p.into_dimension(dimension))
                    .collect(),
            },
            other => other,
        };
        Self {
            kind,
            offset: self.offset.map(|o| o.into_dimension(dimension)),
            density: self.density,
        }
    }

    /// Radius of a sphere around the origin enclosing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match &self.kind {
            ShapeKind::Ball { radius } => *radius,
            ShapeKind::Cuboid { half_extents } => half_extents.length(),
            ShapeKind::Capsule {
                half_height,
                radius,
            } => half_height + radius,
            ShapeKind::Cylinder {
                half_height,
                radius,
            }
            | ShapeKind::Cone {
                half_height,
                radius,
            } => half_height.hypot(*radius),
            ShapeKind::ConvexHull { points } => {
                points.iter().map(PhysVec::length).fold(0.0, f32::max)
            }
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: impl Into<PhysVec>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    #[must_use]
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = Some(density);
        self
    }
}

/// Opaque caller payload carried by a body.
pub type UserData = u64;

/// Everything needed to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: PhysVec,
    pub rotation: Option<Rotation>,
    /// One or more shapes; the first builds the native handle.
    pub shapes: Vec<ShapeDesc>,
    /// Registered material name, `"default"` when absent.
    pub material: Option<String>,
    pub filter: CollisionFilter,
    /// Replaces the mass derived from density and volume.
    pub mass: Option<f32>,
    pub linear_damping: Option<f32>,
    pub angular_damping: Option<f32>,
    pub gravity_scale: f32,
    pub fixed_rotation: bool,
    pub can_sleep: bool,
    pub sleep_thresholds: Option<SleepThresholds>,
    pub ccd: bool,
    pub sensor: bool,
    pub velocity: Option<PhysVec>,
    pub angular_velocity: Option<AngularVec>,
    pub user_data: UserData,
}

impl BodyDesc {
    /// Body of `kind` at `position` with no shapes yet.
    #[must_use]
    pub fn new(kind: BodyKind, position: impl Into<PhysVec>) -> Self {
        Self {
            kind,
            position: position.into(),
            rotation: None,
            shapes: Vec::new(),
            material: None,
            filter: CollisionFilter::default(),
            mass: None,
            linear_damping: None,
            angular_damping: None,
            gravity_scale: 1.0,
            fixed_rotation: false,
            can_sleep: true,
            sleep_thresholds: None,
            ccd: false,
            sensor: false,
            velocity: None,
            angular_velocity: None,
            user_data: 0,
        }
    }

    #[must_use]
    pub fn dynamic(position: impl Into<PhysVec>) -> Self {
        Self::new(BodyKind::Dynamic, position)
    }

    #[must_use]
    pub fn fixed(position: impl Into<PhysVec>) -> Self {
        Self::new(BodyKind::Static, position)
    }

    #[must_use]
    pub fn kinematic(position: impl Into<PhysVec>) -> Self {
        Self::new(BodyKind::Kinematic, position)
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ShapeDesc) -> Self {
        self.shapes.push(shape);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: impl Into<Rotation>) -> Self {
        self.rotation = Some(rotation.into());
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    #[must_use]
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = Some(linear);
        self.angular_damping = Some(angular);
        self
    }

    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    #[must_use]
    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    #[must_use]
    pub fn with_sleep(mut self, can_sleep: bool, thresholds: Option<SleepThresholds>) -> Self {
        self.can_sleep = can_sleep;
        self.sleep_thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_ccd(mut self, ccd: bool) -> Self {
        self.ccd = ccd;
        self
    }

    #[must_use]
    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: impl Into<PhysVec>) -> Self {
        self.velocity = Some(velocity.into());
        self
    }

    #[must_use]
    pub fn with_angular_velocity(mut self, angular: impl Into<AngularVec>) -> Self {
        self.angular_velocity = Some(angular.into());
        self
    }

    #[must_use]
    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = user_data;
        self
    }

    /// Reject descriptions no backend can build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shapes.is_empty() {
            return Err(ConfigError::InvalidBodyConfig(
                "a body needs at least one shape".into(),
            ));
        }
        if !self.position.is_finite() {
            return Err(ConfigError::InvalidBodyConfig(format!(
                "non-finite position {}",
                self.position
            )));
        }
        Ok(())
    }
}

/// Simplified shape vocabulary for [`SimpleBodyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimpleShape {
    Circle { radius: f32 },
    Sphere { radius: f32 },
    Rectangle { width: f32, height: f32 },
    Box { width: f32, height: f32, depth: f32 },
    Capsule { radius: f32, height: f32 },
}

/// Convenience body description used by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleBodyConfig {
    pub shape: SimpleShape,
    pub position: PhysVec,
    pub is_static: bool,
    pub is_sensor: bool,
    pub material: Option<String>,
    pub mass: Option<f32>,
}

impl SimpleBodyConfig {
    #[must_use]
    pub fn new(shape: SimpleShape, position: impl Into<PhysVec>) -> Self {
        Self {
            shape,
            position: position.into(),
            is_static: false,
            is_sensor: false,
            material: None,
            mass: None,
        }
    }

    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Expand into a full [`BodyDesc`].
    #[must_use]
    pub fn to_body_desc(&self) -> BodyDesc {
        let shape = match self.shape {
            SimpleShape::Circle { radius } | SimpleShape::Sphere { radius } => {
                ShapeDesc::ball(radius)
            }
            SimpleShape::Rectangle { width, height } => {
                ShapeDesc::cuboid(PhysVec::xy(width * 0.5, height * 0.5))
            }
            SimpleShape::Box {
                width,
                height,
                depth,
            } => ShapeDesc::cuboid(PhysVec::xyz(width * 0.5, height * 0.5, depth * 0.5)),
            SimpleShape::Capsule { radius, height } => ShapeDesc::capsule(height * 0.5, radius),
        };
        let kind = if self.is_static {
            BodyKind::Static
        } else {
            BodyKind::Dynamic
        };
        BodyDesc {
            material: self.material.clone(),
            mass: self.mass,
            sensor: self.is_sensor,
            ..BodyDesc::new(kind, self.position).with_shape(shape)
        }
    }
}

impl From<SimpleBodyConfig> for BodyDesc {
    fn from(config: SimpleBodyConfig) -> Self {
        config.to_body_desc()
    }
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Unified constraint taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Distance,
    Spring,
    Revolute,
    Fixed,
    Rope,
    Prismatic,
    Gear,
    Pulley,
    Mouse,
    Motorized,
}

impl ConstraintKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Spring => "spring",
            Self::Revolute => "revolute",
            Self::Fixed => "fixed",
            Self::Rope => "rope",
            Self::Prismatic => "prismatic",
            Self::Gear => "gear",
            Self::Pulley => "pulley",
            Self::Mouse => "mouse",
            Self::Motorized => "motorized",
        }
    }

    /// Kinds whose length defaults to the body separation.
    #[must_use]
    pub const fn uses_length(self) -> bool {
        matches!(self, Self::Distance | Self::Spring | Self::Rope)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Motor settings, stored on every constraint whether or not the native
/// joint can drive them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    /// Target velocity (rad/s or m/s depending on the joint).
    pub speed: f32,
    pub max_force: f32,
    pub enabled: bool,
}

impl Motor {
    #[must_use]
    pub const fn new(speed: f32, max_force: f32) -> Self {
        Self {
            speed,
            max_force,
            enabled: true,
        }
    }
}

/// Angular limits in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularLimits {
    pub min: f32,
    pub max: f32,
}

/// Everything needed to create a constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDesc {
    pub kind: ConstraintKind,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Resolved from body separation when absent.
    pub length: Option<f32>,
    pub stiffness: f32,
    pub damping: f32,
    /// Local anchor on body A (origin when absent).
    pub anchor_a: Option<PhysVec>,
    /// Local anchor on body B (origin when absent).
    pub anchor_b: Option<PhysVec>,
    /// Joint axis for revolute (3-D) and prismatic joints.
    pub axis: Option<PhysVec>,
    pub motor: Option<Motor>,
    pub limits: Option<AngularLimits>,
}

impl ConstraintDesc {
    #[must_use]
    pub const fn new(kind: ConstraintKind, body_a: BodyId, body_b: BodyId) -> Self {
        Self {
            kind,
            body_a,
            body_b,
            length: None,
            stiffness: 1.0,
            damping: 0.0,
            anchor_a: None,
            anchor_b: None,
            axis: None,
            motor: None,
            limits: None,
        }
    }

    #[must_use]
    pub const fn with_length(mut self, length: f32) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub const fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    #[must_use]
    pub fn with_anchors(mut self, a: impl Into<PhysVec>, b: impl Into<PhysVec>) -> Self {
        self.anchor_a = Some(a.into());
        self.anchor_b = Some(b.into());
        self
    }

    #[must_use]
    pub fn with_axis(mut self, axis: impl Into<PhysVec>) -> Self {
        self.axis = Some(axis.into());
        self
    }

    #[must_use]
    pub const fn with_motor(mut self, motor: Motor) -> Self {
        self.motor = Some(motor);
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.limits = Some(AngularLimits { min, max });
        self
    }
}

// ---------------------------------------------------------------------------
// Queries and records
// ---------------------------------------------------------------------------

/// One body hit by a raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: BodyId,
    pub point: PhysVec,
    pub normal: PhysVec,
    /// Distance from the ray origin.
    pub distance: f32,
    /// Distance as a fraction of the ray length.
    pub fraction: f32,
}

/// A non-fatal fallback taken because the backend lacks a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// What was requested, e.g. `"constraint:gear"`.
    pub feature: String,
    /// What was realized instead.
    pub fallback: String,
    pub detail: String,
}

impl Degradation {
    #[must_use]
    pub fn new(
        feature: impl Into<String>,
        fallback: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            fallback: fallback.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.feature, self.fallback, self.detail)
    }
}

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Parameters of one world. Built from [`WorldSettings`](crate::config::WorldSettings).
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub dimension: Dimension,
    /// Dimension default when absent.
    pub gravity: Option<PhysVec>,
    /// Fixed substep length in seconds.
    pub time_step: f32,
    pub max_substeps: u32,
    pub solver_iterations: usize,
    pub sleeping: bool,
    /// Bodies outside these bounds count as culled.
    pub bounds: Option<Aabb>,
    pub debug_draw: bool,
}

impl WorldConfig {
    /// Defaults for `dimension`.
    #[must_use]
    pub fn new(dimension: Dimension) -> Self {
        crate::config::WorldSettings::default().world_config(dimension)
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: impl Into<PhysVec>) -> Self {
        self.gravity = Some(gravity.into());
        self
    }

    #[must_use]
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Gravity in this world's dimension.
    #[must_use]
    pub fn resolved_gravity(&self) -> PhysVec {
        self.gravity
            .unwrap_or_else(|| default_gravity(self.dimension))
            .into_dimension(self.dimension)
    }
}

/// Default gravity: `(0, 9.81)` in screen-space 2-D, `(0, -9.81, 0)` in 3-D.
#[must_use]
pub fn default_gravity(dimension: Dimension) -> PhysVec {
    match dimension {
        Dimension::Two => PhysVec::xy(0.0, 9.81),
        Dimension::Three => PhysVec::xyz(0.0, -9.81, 0.0),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display() {
        assert_eq!(BodyId(3).to_string(), "body#3");
        assert_eq!(WorldId(1).to_string(), "world#1");
        assert_eq!(ConstraintId(9).to_string(), "constraint#9");
    }

    #[test]
    fn engine_type_resolution() {
        assert_eq!(EngineType::resolve(Dimension::Two, None).ok(), Some(EngineType::Rapier2d));
        assert_eq!(
            EngineType::resolve(Dimension::Three, Some("rapier")).ok(),
            Some(EngineType::Rapier3d)
        );
        assert!(matches!(
            EngineType::resolve(Dimension::Two, Some("rapier3d")),
            Err(ConfigError::UnsupportedEngine { .. })
        ));
        assert!(matches!(
            EngineType::resolve(Dimension::Three, Some("box2d")),
            Err(ConfigError::UnsupportedEngine { .. })
        ));
    }

    #[test]
    fn collision_filter_interaction() {
        let player = CollisionFilter::new(0b01, 0b10);
        let enemy = CollisionFilter::new(0b10, 0b01);
        let ghost = CollisionFilter::new(0b100, 0);
        assert!(player.interacts_with(&enemy));
        assert!(!player.interacts_with(&ghost));
        assert!(CollisionFilter::ALL.matches_mask(0b1000));
        assert!(!player.matches_mask(0b10));
    }

    #[test]
    fn body_desc_without_shapes_is_invalid() {
        let desc = BodyDesc::dynamic(PhysVec::xy(0.0, 0.0));
        assert!(matches!(desc.validate(), Err(ConfigError::InvalidBodyConfig(_))));
        let desc = desc.with_shape(ShapeDesc::ball(1.0));
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn simple_rectangle_expands_to_half_extents() {
        let desc = SimpleBodyConfig::new(
            SimpleShape::Rectangle {
                width: 4.0,
                height: 2.0,
            },
            PhysVec::xy(1.0, 1.0),
        )
        .fixed()
        .to_body_desc();
        assert_eq!(desc.kind, BodyKind::Static);
        assert_eq!(desc.shapes.len(), 1);
        assert_eq!(
            desc.shapes[0].kind,
            ShapeKind::Cuboid {
                half_extents: PhysVec::xy(2.0, 1.0)
            }
        );
    }

    #[test]
    fn cylinder_is_three_d_only() {
        let kind = ShapeDesc::cylinder(1.0, 0.5).kind;
        assert!(!kind.supported_in(Dimension::Two));
        assert!(kind.supported_in(Dimension::Three));
    }

    #[test]
    fn cuboid_conversion_keeps_extents_positive() {
        let shape = ShapeDesc::cuboid(PhysVec::xyz(1.0, 2.0, 3.0)).into_dimension(Dimension::Two);
        assert_eq!(
            shape.kind,
            ShapeKind::Cuboid {
                half_extents: PhysVec::xy(1.0, 2.0)
            }
        );
        let shape = ShapeDesc::cuboid(PhysVec::xy(1.0, 2.0)).into_dimension(Dimension::Three);
        assert_eq!(
            shape.kind,
            ShapeKind::Cuboid {
                half_extents: PhysVec::xyz(1.0, 2.0, 1.0)
            }
        );
    }

    #[test]
    fn offsets_follow_the_convention() {
        let shape = ShapeDesc::ball(0.5)
            .with_offset(PhysVec::xy(0.0, 1.0))
            .into_dimension(Dimension::Three);
        assert_eq!(shape.offset, Some(PhysVec::xyz(0.0, -1.0, 0.0)));
    }

    #[test]
    fn sleep_thresholds_scale_and_clamp() {
        let t = SleepThresholds::new(0.29, 0.06).scaled(1.1, 0.05, 0.3);
        assert!((t.linear - 0.3).abs() < 1e-6);
        assert!((t.angular - 0.066).abs() < 1e-6);
    }

    #[test]
    fn default_gravity_per_dimension() {
        assert_eq!(WorldConfig::new(Dimension::Two).resolved_gravity(), PhysVec::xy(0.0, 9.81));
        assert_eq!(
            WorldConfig::new(Dimension::Three).resolved_gravity(),
            PhysVec::xyz(0.0, -9.81, 0.0)
        );
    }

    #[test]
    fn foreign_gravity_is_converted() {
        let config = WorldConfig::new(Dimension::Two).with_gravity(PhysVec::xyz(0.0, -5.0, 0.0));
        assert_eq!(config.resolved_gravity(), PhysVec::xy(0.0, 5.0));
    }

    #[test]
    fn constraint_kind_length_usage() {
        assert!(ConstraintKind::Distance.uses_length());
        assert!(ConstraintKind::Rope.uses_length());
        assert!(!ConstraintKind::Revolute.uses_length());
    }
}
