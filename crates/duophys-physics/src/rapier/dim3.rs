//! `rapier3d` kernel. Native space is world-like (+Y up, Z depth).

use duophys_core::prelude::*;
use rapier3d as rapier;
use rapier::na::{Quaternion, Unit, UnitQuaternion};
use rapier::prelude::{
    AngVector, Point, Real, RevoluteJointBuilder, RigidBody, Rotation as NativeRotation,
    SharedShape, UnitVector, Vector,
};

#[path = "kernel_impl.rs"]
mod kernel;

/// The 3-D rapier kernel.
pub type Rapier3d = kernel::RapierKernel;

const DIMENSION: Dimension = Dimension::Three;
const ENGINE: EngineType = EngineType::Rapier3d;

fn vector(v: &PhysVec) -> Vector<Real> {
    let v = v.to_3d();
    Vector::new(v.x, v.y, v.z)
}

fn point(v: &PhysVec) -> Point<Real> {
    Point::from(vector(v))
}

fn from_vector(v: &Vector<Real>) -> PhysVec {
    PhysVec::xyz(v.x, v.y, v.z)
}

fn from_point(p: &Point<Real>) -> PhysVec {
    from_vector(&p.coords)
}

fn rotation(r: &Rotation) -> NativeRotation<Real> {
    let q = r.to_quat();
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.i, q.j, q.k))
}

fn from_rotation(r: &NativeRotation<Real>) -> Rotation {
    Rotation::Quat(nalgebra::UnitQuaternion::new_normalize(
        nalgebra::Quaternion::new(r.w, r.i, r.j, r.k),
    ))
}

fn angular(a: &AngularVec) -> AngVector<Real> {
    let v = a.to_vector();
    Vector::new(v.x, v.y, v.z)
}

fn read_angular(rb: &RigidBody) -> AngularVec {
    let w = rb.angvel();
    AngularVec::Vector(nalgebra::Vector3::new(w.x, w.y, w.z))
}

fn shape(kind: &ShapeKind) -> Option<SharedShape> {
    match kind {
        ShapeKind::Ball { radius } => Some(SharedShape::ball(*radius)),
        ShapeKind::Cuboid { half_extents } => {
            let h = half_extents.to_3d();
            Some(SharedShape::cuboid(h.x.abs(), h.y.abs(), h.z.abs()))
        }
        ShapeKind::Capsule {
            half_height,
            radius,
        } => Some(SharedShape::capsule_y(*half_height, *radius)),
        ShapeKind::Cylinder {
            half_height,
            radius,
        } => Some(SharedShape::cylinder(*half_height, *radius)),
        ShapeKind::Cone {
            half_height,
            radius,
        } => Some(SharedShape::cone(*half_height, *radius)),
        ShapeKind::ConvexHull { points } => {
            let points: Vec<Point<Real>> = points.iter().map(point).collect();
            SharedShape::convex_hull(&points)
        }
    }
}

/// Hinge about `axis`, the depth axis +Z when absent.
fn revolute_builder(axis: Option<&PhysVec>) -> RevoluteJointBuilder {
    let axis = axis
        .and_then(|a| Unit::try_new(vector(a), 1.0e-6))
        .unwrap_or_else(Vector::z_axis);
    RevoluteJointBuilder::new(axis)
}

/// Normalized axis, +X when absent or degenerate.
fn unit_axis(axis: Option<&PhysVec>) -> UnitVector<Real> {
    axis.and_then(|a| Unit::try_new(vector(a), 1.0e-6))
        .unwrap_or_else(Vector::x_axis)
}
