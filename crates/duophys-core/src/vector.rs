//! Dimension-polymorphic vectors and the 2-D ⇄ 3-D coordinate convention.
//!
//! Every position, velocity, force or impulse crossing the public API is a
//! [`PhysVec`], which is either a 2-component point or a 3-component vector.
//! The variant itself is the discriminator: there is no separate dimension
//! argument anywhere in the API.
//!
//! # Convention
//!
//! 2-D space is screen-like (+Y points down), 3-D space is world-like (+Y
//! points up, Z is depth).
//!
//! ```text
//! promote  (x, y)     -> (x, -y, 0)
//! demote   (x, y, z)  -> (x, -y)
//! ```
//!
//! All crossings go through [`PhysVec::into_dimension`] (and the matching
//! methods on [`Rotation`], [`AngularVec`] and [`Aabb`]); nothing else in the
//! workspace flips a sign by hand.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// Whether a world, body or vector lives in 2-D or 3-D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Planar space, 2-component vectors, scalar angles.
    #[serde(rename = "2d", alias = "two")]
    Two,
    /// Volumetric space, 3-component vectors, unit quaternions.
    #[serde(rename = "3d", alias = "three")]
    Three,
}

impl Dimension {
    /// Number of vector components in this dimension.
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Two => write!(f, "2d"),
            Self::Three => write!(f, "3d"),
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d" | "2" | "two" => Ok(Self::Two),
            "3d" | "3" | "three" => Ok(Self::Three),
            other => Err(format!("unknown dimension '{other}' (expected 2d or 3d)")),
        }
    }
}

// ---------------------------------------------------------------------------
// PhysVec
// ---------------------------------------------------------------------------

/// A point or direction in either 2-D or 3-D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysVec {
    /// Screen-space 2-D vector (+Y down).
    D2(Vector2<f32>),
    /// World-space 3-D vector (+Y up, Z depth).
    D3(Vector3<f32>),
}

impl PhysVec {
    /// 2-D vector.
    #[must_use]
    pub fn xy(x: f32, y: f32) -> Self {
        Self::D2(Vector2::new(x, y))
    }

    /// 3-D vector.
    #[must_use]
    pub fn xyz(x: f32, y: f32, z: f32) -> Self {
        Self::D3(Vector3::new(x, y, z))
    }

    /// The zero vector of the given dimension.
    #[must_use]
    pub fn zero(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::D2(Vector2::zeros()),
            Dimension::Three => Self::D3(Vector3::zeros()),
        }
    }

    /// Build from a component slice. The presence of a third component picks
    /// the 3-D variant; any other length is rejected.
    #[must_use]
    pub fn from_slice(components: &[f32]) -> Option<Self> {
        match *components {
            [x, y] => Some(Self::xy(x, y)),
            [x, y, z] => Some(Self::xyz(x, y, z)),
            _ => None,
        }
    }

    /// Which variant this is.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        match self {
            Self::D2(_) => Dimension::Two,
            Self::D3(_) => Dimension::Three,
        }
    }

    /// X component (shared by both conventions).
    #[must_use]
    pub fn x(&self) -> f32 {
        match self {
            Self::D2(v) => v.x,
            Self::D3(v) => v.x,
        }
    }

    /// Y component in this vector's own convention.
    #[must_use]
    pub fn y(&self) -> f32 {
        match self {
            Self::D2(v) => v.y,
            Self::D3(v) => v.y,
        }
    }

    /// Depth component, absent for 2-D vectors.
    #[must_use]
    pub fn z(&self) -> Option<f32> {
        match self {
            Self::D2(_) => None,
            Self::D3(v) => Some(v.z),
        }
    }

    /// Components as a slice of length 2 or 3.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        match self {
            Self::D2(v) => v.as_slice(),
            Self::D3(v) => v.as_slice(),
        }
    }

    /// This vector in 2-D screen space, demoting if needed.
    #[must_use]
    pub fn to_2d(&self) -> Vector2<f32> {
        match self {
            Self::D2(v) => *v,
            Self::D3(v) => Vector2::new(v.x, -v.y),
        }
    }

    /// This vector in 3-D world space, promoting if needed.
    #[must_use]
    pub fn to_3d(&self) -> Vector3<f32> {
        match self {
            Self::D2(v) => Vector3::new(v.x, -v.y, 0.0),
            Self::D3(v) => *v,
        }
    }

    /// Convert into `dimension`; a no-op when it already matches.
    #[must_use]
    pub fn into_dimension(self, dimension: Dimension) -> Self {
        match (self, dimension) {
            (Self::D2(_), Dimension::Two) | (Self::D3(_), Dimension::Three) => self,
            (_, Dimension::Two) => Self::D2(self.to_2d()),
            (_, Dimension::Three) => Self::D3(self.to_3d()),
        }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(&self) -> f32 {
        match self {
            Self::D2(v) => v.norm(),
            Self::D3(v) => v.norm(),
        }
    }

    /// Euclidean distance, measured in `self`'s dimension.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        (*self - *other).length()
    }

    /// Dot product, measured in `self`'s dimension.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        match self {
            Self::D2(v) => v.dot(&other.to_2d()),
            Self::D3(v) => v.dot(&other.to_3d()),
        }
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return *self;
        }
        *self * (1.0 / len)
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|c| c.is_finite())
    }
}

impl Add for PhysVec {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match self {
            Self::D2(a) => Self::D2(a + rhs.to_2d()),
            Self::D3(a) => Self::D3(a + rhs.to_3d()),
        }
    }
}

impl Sub for PhysVec {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        match self {
            Self::D2(a) => Self::D2(a - rhs.to_2d()),
            Self::D3(a) => Self::D3(a - rhs.to_3d()),
        }
    }
}

impl Mul<f32> for PhysVec {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        match self {
            Self::D2(a) => Self::D2(a * rhs),
            Self::D3(a) => Self::D3(a * rhs),
        }
    }
}

impl Neg for PhysVec {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::D2(a) => Self::D2(-a),
            Self::D3(a) => Self::D3(-a),
        }
    }
}

impl fmt::Display for PhysVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::D2(v) => write!(f, "({}, {})", v.x, v.y),
            Self::D3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
        }
    }
}

impl From<Vector2<f32>> for PhysVec {
    fn from(v: Vector2<f32>) -> Self {
        Self::D2(v)
    }
}

impl From<Vector3<f32>> for PhysVec {
    fn from(v: Vector3<f32>) -> Self {
        Self::D3(v)
    }
}

impl From<[f32; 2]> for PhysVec {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::xy(x, y)
    }
}

impl From<[f32; 3]> for PhysVec {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::xyz(x, y, z)
    }
}

impl From<(f32, f32)> for PhysVec {
    fn from((x, y): (f32, f32)) -> Self {
        Self::xy(x, y)
    }
}

impl From<(f32, f32, f32)> for PhysVec {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self::xyz(x, y, z)
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Orientation: a scalar angle (radians) in 2-D, a unit quaternion in 3-D.
///
/// The Y flip mirrors handedness, so a 2-D angle `θ` is a rotation of `-θ`
/// about the depth axis in 3-D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Planar angle in radians.
    Angle(f32),
    /// Spatial orientation.
    Quat(UnitQuaternion<f32>),
}

impl Rotation {
    /// The identity orientation of the given dimension.
    #[must_use]
    pub fn identity(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::Angle(0.0),
            Dimension::Three => Self::Quat(UnitQuaternion::identity()),
        }
    }

    /// Which variant this is.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        match self {
            Self::Angle(_) => Dimension::Two,
            Self::Quat(_) => Dimension::Three,
        }
    }

    /// Planar angle, demoting a quaternion to its rotation about depth.
    #[must_use]
    pub fn to_angle(&self) -> f32 {
        match self {
            Self::Angle(a) => *a,
            Self::Quat(q) => -q.euler_angles().2,
        }
    }

    /// Quaternion, promoting an angle to a rotation about depth.
    #[must_use]
    pub fn to_quat(&self) -> UnitQuaternion<f32> {
        match self {
            Self::Angle(a) => UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -*a),
            Self::Quat(q) => *q,
        }
    }

    /// Convert into `dimension`.
    #[must_use]
    pub fn into_dimension(self, dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::Angle(self.to_angle()),
            Dimension::Three => Self::Quat(self.to_quat()),
        }
    }
}

impl From<f32> for Rotation {
    fn from(angle: f32) -> Self {
        Self::Angle(angle)
    }
}

impl From<UnitQuaternion<f32>> for Rotation {
    fn from(q: UnitQuaternion<f32>) -> Self {
        Self::Quat(q)
    }
}

// ---------------------------------------------------------------------------
// AngularVec
// ---------------------------------------------------------------------------

/// Angular velocity or torque: scalar in 2-D, axis vector in 3-D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngularVec {
    /// Rotation rate about the (implicit) out-of-screen axis.
    Scalar(f32),
    /// Rotation rate about each world axis.
    Vector(Vector3<f32>),
}

impl AngularVec {
    /// Zero of the given dimension.
    #[must_use]
    pub fn zero(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::Scalar(0.0),
            Dimension::Three => Self::Vector(Vector3::zeros()),
        }
    }

    /// Which variant this is.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        match self {
            Self::Scalar(_) => Dimension::Two,
            Self::Vector(_) => Dimension::Three,
        }
    }

    /// Planar rate; a 3-D vector keeps only its depth-axis part.
    #[must_use]
    pub fn to_scalar(&self) -> f32 {
        match self {
            Self::Scalar(w) => *w,
            Self::Vector(v) => -v.z,
        }
    }

    /// Spatial rate; a scalar becomes a depth-axis vector.
    #[must_use]
    pub fn to_vector(&self) -> Vector3<f32> {
        match self {
            Self::Scalar(w) => Vector3::new(0.0, 0.0, -*w),
            Self::Vector(v) => *v,
        }
    }

    /// Convert into `dimension`.
    #[must_use]
    pub fn into_dimension(self, dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::Scalar(self.to_scalar()),
            Dimension::Three => Self::Vector(self.to_vector()),
        }
    }

    /// Magnitude of the rate.
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        match self {
            Self::Scalar(w) => w.abs(),
            Self::Vector(v) => v.norm(),
        }
    }
}

impl From<f32> for AngularVec {
    fn from(w: f32) -> Self {
        Self::Scalar(w)
    }
}

impl From<Vector3<f32>> for AngularVec {
    fn from(v: Vector3<f32>) -> Self {
        Self::Vector(v)
    }
}

impl From<[f32; 3]> for AngularVec {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::Vector(Vector3::new(x, y, z))
    }
}

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box. `min` and `max` always share a dimension and
/// are ordered component-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Component-wise minimum corner.
    pub min: PhysVec,
    /// Component-wise maximum corner.
    pub max: PhysVec,
}

impl Aabb {
    /// Box spanning two corners in any order. `b` is converted into `a`'s
    /// dimension first.
    #[must_use]
    pub fn new(a: impl Into<PhysVec>, b: impl Into<PhysVec>) -> Self {
        let a = a.into();
        let b = b.into().into_dimension(a.dimension());
        let (min, max) = match (a, b) {
            (PhysVec::D2(a), PhysVec::D2(b)) => (PhysVec::D2(a.inf(&b)), PhysVec::D2(a.sup(&b))),
            (PhysVec::D3(a), PhysVec::D3(b)) => (PhysVec::D3(a.inf(&b)), PhysVec::D3(a.sup(&b))),
            // `b` was converted above.
            _ => (a, b),
        };
        Self { min, max }
    }

    /// Box centered at `center` with the given half extents.
    #[must_use]
    pub fn from_center(center: PhysVec, half_extents: PhysVec) -> Self {
        let half = half_extents.into_dimension(center.dimension());
        Self::new(center - half, center + half)
    }

    /// Dimension of both corners.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.min.dimension()
    }

    /// Convert into `dimension`, re-sorting corners after the Y flip.
    #[must_use]
    pub fn into_dimension(self, dimension: Dimension) -> Self {
        Self::new(
            self.min.into_dimension(dimension),
            self.max.into_dimension(dimension),
        )
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> PhysVec {
        (self.min + self.max) * 0.5
    }

    /// Half extents along each axis.
    #[must_use]
    pub fn half_extents(&self) -> PhysVec {
        (self.max - self.min) * 0.5
    }

    /// Smallest box containing both, in `self`'s dimension.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let other = other.into_dimension(self.dimension());
        let min = Self::new(self.min, other.min).min;
        let max = Self::new(self.max, other.max).max;
        Self { min, max }
    }

    /// Whether the two boxes overlap (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let other = other.into_dimension(self.dimension());
        let (a_min, a_max) = (self.min.as_slice(), self.max.as_slice());
        let (b_min, b_max) = (other.min.as_slice(), other.max.as_slice());
        (0..a_min.len()).all(|i| a_min[i] <= b_max[i] && b_min[i] <= a_max[i])
    }

    /// Whether `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, point: &PhysVec) -> bool {
        let p = point.into_dimension(self.dimension());
        let (min, max, p) = (self.min.as_slice(), self.max.as_slice(), p.as_slice());
        (0..p.len()).all(|i| min[i] <= p[i] && p[i] <= max[i])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
