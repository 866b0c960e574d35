//! `rapier2d` kernel. Native space is the screen-like 2-D convention (+Y down).

use duophys_core::prelude::*;
use rapier2d as rapier;
use rapier::na::{Unit, UnitComplex};
use rapier::prelude::{
    AngVector, Point, Real, RevoluteJointBuilder, RigidBody, Rotation as NativeRotation,
    SharedShape, UnitVector, Vector,
};

#[path = "kernel_impl.rs"]
mod kernel;

/// The 2-D rapier kernel.
pub type Rapier2d = kernel::RapierKernel;

const DIMENSION: Dimension = Dimension::Two;
const ENGINE: EngineType = EngineType::Rapier2d;

fn vector(v: &PhysVec) -> Vector<Real> {
    let v = v.to_2d();
    Vector::new(v.x, v.y)
}

fn point(v: &PhysVec) -> Point<Real> {
    Point::from(vector(v))
}

fn from_vector(v: &Vector<Real>) -> PhysVec {
    PhysVec::xy(v.x, v.y)
}

fn from_point(p: &Point<Real>) -> PhysVec {
    from_vector(&p.coords)
}

fn rotation(r: &Rotation) -> NativeRotation<Real> {
    UnitComplex::new(r.to_angle())
}

fn from_rotation(r: &NativeRotation<Real>) -> Rotation {
    Rotation::Angle(r.angle())
}

fn angular(a: &AngularVec) -> AngVector<Real> {
    a.to_scalar()
}

fn read_angular(rb: &RigidBody) -> AngularVec {
    AngularVec::Scalar(rb.angvel())
}

fn shape(kind: &ShapeKind) -> Option<SharedShape> {
    match kind {
        ShapeKind::Ball { radius } => Some(SharedShape::ball(*radius)),
        ShapeKind::Cuboid { half_extents } => {
            let h = half_extents.to_2d();
            Some(SharedShape::cuboid(h.x.abs(), h.y.abs()))
        }
        ShapeKind::Capsule {
            half_height,
            radius,
        } => Some(SharedShape::capsule_y(*half_height, *radius)),
        ShapeKind::Cylinder { .. } | ShapeKind::Cone { .. } => None,
        ShapeKind::ConvexHull { points } => {
            let points: Vec<Point<Real>> = points.iter().map(point).collect();
            SharedShape::convex_hull(&points)
        }
    }
}

/// Planar hinges have no axis.
fn revolute_builder(_axis: Option<&PhysVec>) -> RevoluteJointBuilder {
    RevoluteJointBuilder::new()
}

/// Normalized axis, +X when absent or degenerate.
fn unit_axis(axis: Option<&PhysVec>) -> UnitVector<Real> {
    axis.and_then(|a| Unit::try_new(vector(a), 1.0e-6))
        .unwrap_or_else(Vector::x_axis)
}
