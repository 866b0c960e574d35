//! Top-down character motion.
//!
//! The movement plane is canonical XY in a 2-D world and XZ in a 3-D world,
//! where the vertical velocity is left to gravity.

use duophys_core::prelude::*;
use duophys_physics::contract::PhysicsWorld;
use nalgebra::{UnitQuaternion, Vector2, Vector3};

use crate::canonical::{canonical, to_world};

/// Tuning for a [`TopDownController`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopDownSettings {
    pub max_speed: f32,
    /// Speed gained per second toward the input direction.
    pub acceleration: f32,
    /// Speed lost per second without input.
    pub friction: f32,
    /// Turn the body to face its planar velocity.
    pub face_movement: bool,
}

impl Default for TopDownSettings {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            acceleration: 30.0,
            friction: 20.0,
            face_movement: false,
        }
    }
}

pub struct TopDownController {
    body: BodyId,
    settings: TopDownSettings,
    input: Vector2<f32>,
}

impl TopDownController {
    #[must_use]
    pub fn new(body: BodyId, settings: TopDownSettings) -> Self {
        Self {
            body,
            settings,
            input: Vector2::zeros(),
        }
    }

    #[must_use]
    pub const fn body(&self) -> BodyId {
        self.body
    }

    /// Planar intent, clamped to unit length. `y` is canonical up in 2-D and
    /// depth in 3-D.
    pub fn set_input(&mut self, x: f32, y: f32) {
        let input = Vector2::new(x, y);
        self.input = if input.norm() > 1.0 {
            input.normalize()
        } else {
            input
        };
    }

    pub fn update<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        dt: f32,
    ) -> Result<(), ResourceError> {
        if dt <= 0.0 {
            return Ok(());
        }
        let dimension = world.dimension();
        let velocity = canonical(world.velocity(self.body)?);
        let planar = match dimension {
            Dimension::Two => Vector2::new(velocity.x, velocity.y),
            Dimension::Three => Vector2::new(velocity.x, velocity.z),
        };

        let next = if self.input.norm_squared() > 0.0 {
            let target = self.input * self.settings.max_speed;
            step_toward(planar, target, self.settings.acceleration * dt)
        } else {
            step_toward(planar, Vector2::zeros(), self.settings.friction * dt)
        };

        let velocity = match dimension {
            Dimension::Two => Vector3::new(next.x, next.y, 0.0),
            Dimension::Three => Vector3::new(next.x, velocity.y, next.y),
        };
        world.set_velocity(self.body, to_world(velocity))?;

        if self.settings.face_movement && next.norm() > 1e-3 {
            let facing = match dimension {
                Dimension::Two => {
                    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), next.y.atan2(next.x))
                }
                Dimension::Three => {
                    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), next.x.atan2(next.y))
                }
            };
            world.set_rotation(self.body, Rotation::Quat(facing))?;
        }
        Ok(())
    }
}

fn step_toward(current: Vector2<f32>, target: Vector2<f32>, max_delta: f32) -> Vector2<f32> {
    let delta = target - current;
    let distance = delta.norm();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + delta * (max_delta / distance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use duophys_physics::prelude::*;
    use duophys_test_utils::weightless_world;

    fn puck() -> BodyDesc {
        BodyDesc::dynamic([0.0, 0.0, 0.0]).with_shape(ShapeDesc::ball(0.5))
    }

    #[test]
    fn moves_in_xy_for_2d() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let body = world.create_body(puck()).unwrap();
        let mut controller = TopDownController::new(body, TopDownSettings::default());
        controller.set_input(0.0, 1.0);
        controller.update(world, 1.0).unwrap();
        // Canonical up is screen -Y.
        let v = world.velocity(body).unwrap();
        assert_relative_eq!(v.y(), -5.0, epsilon = 1e-4);
        assert_relative_eq!(v.x(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn moves_in_xz_for_3d() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let body = world.create_body(puck()).unwrap();
        world.set_velocity(body, [0.0, -3.0, 0.0].into()).unwrap();
        let mut controller = TopDownController::new(body, TopDownSettings::default());
        controller.set_input(0.0, 1.0);
        controller.update(world, 1.0).unwrap();
        let v = world.velocity(body).unwrap();
        assert_relative_eq!(v.z().unwrap(), 5.0, epsilon = 1e-4);
        assert_relative_eq!(v.y(), -3.0, epsilon = 1e-4);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let body = world.create_body(puck()).unwrap();
        let mut controller = TopDownController::new(body, TopDownSettings::default());
        controller.set_input(1.0, 1.0);
        controller.update(world, 1.0).unwrap();
        let v = world.velocity(body).unwrap().to_3d();
        assert_relative_eq!((v.x * v.x + v.z * v.z).sqrt(), 5.0, epsilon = 1e-3);
    }

    #[test]
    fn friction_stops_an_idle_body() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let body = world.create_body(puck()).unwrap();
        world.set_velocity(body, [4.0, 0.0].into()).unwrap();
        let mut controller = TopDownController::new(body, TopDownSettings::default());
        controller.update(world, 0.1).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().x(), 2.0, epsilon = 1e-4);
        controller.update(world, 0.5).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().x(), 0.0);
    }

    #[test]
    fn face_movement_turns_the_body() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let body = world.create_body(puck()).unwrap();
        let mut controller = TopDownController::new(
            body,
            TopDownSettings {
                face_movement: true,
                ..TopDownSettings::default()
            },
        );
        controller.set_input(0.0, -1.0);
        controller.update(world, 1.0).unwrap();
        // Canonical down is screen +Y, a quarter turn in screen space.
        assert_relative_eq!(
            world.rotation(body).unwrap().to_angle(),
            std::f32::consts::FRAC_PI_2,
            epsilon = 1e-4
        );
    }
}
