//! Reading and writing world vectors in canonical 3-D space.

use duophys_core::prelude::*;
use duophys_physics::contract::PhysicsWorld;
use nalgebra::Vector3;

/// `v` in canonical space, whatever its dimension.
#[must_use]
pub fn canonical(v: PhysVec) -> Vector3<f32> {
    v.to_3d()
}

/// A canonical vector for the world. The world demotes it when it is 2-D.
#[must_use]
pub fn to_world(v: Vector3<f32>) -> PhysVec {
    PhysVec::from(v)
}

/// The body's bounds in canonical space as `(center, half_extents)`.
pub fn bounds<W: PhysicsWorld + ?Sized>(
    world: &W,
    body: BodyId,
) -> Result<(Vector3<f32>, Vector3<f32>), ResourceError> {
    let aabb = world.aabb(body)?.into_dimension(Dimension::Three);
    Ok((canonical(aabb.center()), canonical(aabb.half_extents())))
}

/// Depth component to carry into a point: the body's own in 3-D, none in 2-D.
#[must_use]
pub fn depth_of<W: PhysicsWorld + ?Sized>(world: &W, z: f32) -> f32 {
    match world.dimension() {
        Dimension::Two => 0.0,
        Dimension::Three => z,
    }
}

/// Nearest hit along a canonical segment that is not `body` itself.
pub fn first_hit_excluding<W: PhysicsWorld + ?Sized>(
    world: &W,
    body: BodyId,
    from: Vector3<f32>,
    to: Vector3<f32>,
    mask: Option<u32>,
) -> Option<RaycastHit> {
    world
        .raycast(to_world(from), to_world(to), mask)
        .into_iter()
        .find(|hit| hit.body != body)
}

/// Move `current` toward `target` by at most `max_delta`.
#[must_use]
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(target - current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn screen_vectors_become_y_up() {
        let v = canonical(PhysVec::xy(1.0, 2.0));
        assert_relative_eq!(v.y, -2.0);
        assert_relative_eq!(v.z, 0.0);
    }

    #[test]
    fn approach_clamps_at_target() {
        assert_relative_eq!(approach(0.0, 10.0, 3.0), 3.0);
        assert_relative_eq!(approach(9.0, 10.0, 3.0), 10.0);
        assert_relative_eq!(approach(0.0, -10.0, 4.0), -4.0);
    }
}
