//! Side-scrolling character motion.
//!
//! Ground and wall contact come from short rays cast off the body's bounds.
//! Horizontal motion is along canonical X; jumping is along canonical +Y.

use duophys_core::prelude::*;
use duophys_physics::contract::PhysicsWorld;
use nalgebra::Vector3;
use tracing::trace;

use crate::canonical::{approach, bounds, canonical, depth_of, first_hit_excluding, to_world};

// ---------------------------------------------------------------------------
// PlatformerSettings
// ---------------------------------------------------------------------------

/// Tuning for a [`PlatformerController`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformerSettings {
    /// Target horizontal speed at full input.
    pub max_speed: f32,
    /// Horizontal speed gained per second while input is held.
    pub acceleration: f32,
    /// Horizontal speed lost per second without input.
    pub deceleration: f32,
    /// Upward speed set by a jump.
    pub jump_speed: f32,
    /// Seconds after leaving the ground during which a jump is still allowed.
    pub coyote_time: f32,
    /// Seconds a jump press is remembered before landing.
    pub jump_buffer: f32,
    /// Factor applied to upward speed when jump is released early.
    pub jump_cut: f32,
    /// Fastest fall while sliding down a wall.
    pub wall_slide_speed: f32,
    /// Ray length past the body's bounds.
    pub probe_distance: f32,
    /// Only bodies in these groups count as ground or wall.
    pub probe_mask: Option<u32>,
}

impl Default for PlatformerSettings {
    fn default() -> Self {
        Self {
            max_speed: 8.0,
            acceleration: 60.0,
            deceleration: 50.0,
            jump_speed: 12.0,
            coyote_time: 0.1,
            jump_buffer: 0.1,
            jump_cut: 0.5,
            wall_slide_speed: 2.0,
            probe_distance: 0.1,
            probe_mask: None,
        }
    }
}

/// Player intent for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformerInput {
    /// -1 (left) to 1 (right).
    pub horizontal: f32,
    /// Jump went down this frame.
    pub jump_pressed: bool,
    /// Jump is held.
    pub jump_held: bool,
}

/// Which side a wall was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// PlatformerController
// ---------------------------------------------------------------------------

pub struct PlatformerController {
    body: BodyId,
    settings: PlatformerSettings,
    input: PlatformerInput,
    grounded: bool,
    wall: Option<WallSide>,
    coyote_timer: f32,
    buffer_timer: f32,
    rising_from_jump: bool,
}

impl PlatformerController {
    #[must_use]
    pub fn new(body: BodyId, settings: PlatformerSettings) -> Self {
        Self {
            body,
            settings,
            input: PlatformerInput::default(),
            grounded: false,
            wall: None,
            coyote_timer: 0.0,
            buffer_timer: 0.0,
            rising_from_jump: false,
        }
    }

    #[must_use]
    pub const fn body(&self) -> BodyId {
        self.body
    }

    #[must_use]
    pub const fn settings(&self) -> &PlatformerSettings {
        &self.settings
    }

    /// Input for the next [`update`](Self::update). A press is latched into
    /// the jump buffer immediately.
    pub fn set_input(&mut self, input: PlatformerInput) {
        if input.jump_pressed {
            self.buffer_timer = self.settings.jump_buffer;
        }
        self.input = input;
    }

    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }

    #[must_use]
    pub const fn wall(&self) -> Option<WallSide> {
        self.wall
    }

    /// Whether a jump would start now if one were pressed.
    #[must_use]
    pub fn can_jump(&self) -> bool {
        self.grounded || self.coyote_timer > 0.0
    }

    /// Probe the surroundings and write the new velocity.
    pub fn update<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        dt: f32,
    ) -> Result<(), ResourceError> {
        if dt <= 0.0 {
            return Ok(());
        }
        self.probe(world)?;

        if self.grounded {
            self.coyote_timer = self.settings.coyote_time;
        } else {
            self.coyote_timer = (self.coyote_timer - dt).max(0.0);
        }

        let mut velocity = canonical(world.velocity(self.body)?);

        let input = self.input.horizontal.clamp(-1.0, 1.0);
        let target = input * self.settings.max_speed;
        let rate = if input == 0.0 {
            self.settings.deceleration
        } else {
            self.settings.acceleration
        };
        velocity.x = approach(velocity.x, target, rate * dt);

        if self.buffer_timer > 0.0 && self.can_jump() {
            velocity.y = self.settings.jump_speed;
            self.buffer_timer = 0.0;
            self.coyote_timer = 0.0;
            self.grounded = false;
            self.rising_from_jump = true;
            trace!("duophys: {} jumped", self.body);
        } else {
            self.buffer_timer = (self.buffer_timer - dt).max(0.0);
        }

        if self.rising_from_jump {
            if velocity.y <= 0.0 {
                self.rising_from_jump = false;
            } else if !self.input.jump_held {
                velocity.y *= self.settings.jump_cut;
                self.rising_from_jump = false;
            }
        }

        if self.wall.is_some() && !self.grounded && velocity.y < -self.settings.wall_slide_speed {
            velocity.y = -self.settings.wall_slide_speed;
        }

        world.set_velocity(self.body, to_world(velocity))
    }

    fn probe<W: PhysicsWorld + ?Sized>(&mut self, world: &W) -> Result<(), ResourceError> {
        let (center, half) = bounds(world, self.body)?;
        let z = depth_of(world, center.z);
        let reach = self.settings.probe_distance;
        let mask = self.settings.probe_mask;

        let feet = Vector3::new(center.x, center.y - half.y, z);
        let below = feet - Vector3::new(0.0, reach, 0.0);
        self.grounded = first_hit_excluding(world, self.body, feet, below, mask).is_some();

        let mid = Vector3::new(center.x, center.y, z);
        let side = half.x + reach;
        let left = first_hit_excluding(world, self.body, mid, mid - Vector3::new(side, 0.0, 0.0), mask);
        let right = first_hit_excluding(world, self.body, mid, mid + Vector3::new(side, 0.0, 0.0), mask);
        self.wall = match (left, right) {
            (Some(l), Some(r)) if r.distance < l.distance => Some(WallSide::Right),
            (Some(_), _) => Some(WallSide::Left),
            (None, Some(_)) => Some(WallSide::Right),
            (None, None) => None,
        };
        Ok(())
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
    use duophys_test_utils::{world_2d, world_3d};

    fn floor() -> BodyDesc {
        BodyDesc::fixed([0.0, 0.0, 0.0]).with_shape(ShapeDesc::cuboid([20.0, 0.5, 20.0]))
    }

    /// A character standing on the floor in canonical space.
    fn character() -> BodyDesc {
        BodyDesc::dynamic([0.0, 1.0, 0.0])
            .with_shape(ShapeDesc::cuboid([0.4, 0.5, 0.4]))
            .with_fixed_rotation(true)
    }

    fn settle(world: &mut dyn PhysicsWorld, frames: usize) {
        for _ in 0..frames {
            world.step(1.0 / 60.0).unwrap();
        }
    }

    #[test]
    fn detects_ground_in_both_dimensions() {
        let (mut engine, id) = world_2d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);
        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.update(world, 1.0 / 60.0).unwrap();
        assert!(controller.is_grounded());

        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);
        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.update(world, 1.0 / 60.0).unwrap();
        assert!(controller.is_grounded());
    }

    #[test]
    fn jump_moves_up_in_both_dimensions() {
        let (mut engine, id) = world_2d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);

        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.set_input(PlatformerInput {
            jump_pressed: true,
            jump_held: true,
            ..PlatformerInput::default()
        });
        controller.update(world, 1.0 / 60.0).unwrap();
        // Screen space: up is -Y.
        assert_relative_eq!(world.velocity(body).unwrap().y(), -12.0, epsilon = 1e-3);

        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);
        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.set_input(PlatformerInput {
            jump_pressed: true,
            jump_held: true,
            ..PlatformerInput::default()
        });
        controller.update(world, 1.0 / 60.0).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().y(), 12.0, epsilon = 1e-3);
    }

    #[test]
    fn releasing_jump_cuts_the_rise() {
        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);

        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.set_input(PlatformerInput {
            jump_pressed: true,
            jump_held: true,
            ..PlatformerInput::default()
        });
        controller.update(world, 1.0 / 60.0).unwrap();
        world.step(1.0 / 60.0).unwrap();
        let rising = world.velocity(body).unwrap().y();

        controller.set_input(PlatformerInput::default());
        controller.update(world, 1.0 / 60.0).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().y(), rising * 0.5, epsilon = 1e-3);
    }

    #[test]
    fn coyote_time_allows_a_late_jump() {
        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);

        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.update(world, 1.0 / 60.0).unwrap();
        assert!(controller.is_grounded());

        // Walk off a ledge: teleport into the air.
        world.set_position(body, [0.0, 5.0, 0.0].into()).unwrap();
        controller.update(world, 0.05).unwrap();
        assert!(!controller.is_grounded());
        assert!(controller.can_jump());

        controller.update(world, 0.1).unwrap();
        assert!(!controller.can_jump());
    }

    #[test]
    fn buffered_jump_fires_on_landing() {
        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        world.set_position(body, [0.0, 3.0, 0.0].into()).unwrap();

        let mut controller = PlatformerController::new(
            body,
            PlatformerSettings {
                jump_buffer: 10.0,
                ..PlatformerSettings::default()
            },
        );
        controller.set_input(PlatformerInput {
            jump_pressed: true,
            jump_held: true,
            ..PlatformerInput::default()
        });
        controller.update(world, 1.0 / 60.0).unwrap();
        assert!(world.velocity(body).unwrap().y() <= 0.0);

        let mut jumped = false;
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
            controller.set_input(PlatformerInput {
                jump_held: true,
                ..PlatformerInput::default()
            });
            controller.update(world, 1.0 / 60.0).unwrap();
            if world.velocity(body).unwrap().y() > 10.0 {
                jumped = true;
                break;
            }
        }
        assert!(jumped);
    }

    #[test]
    fn horizontal_speed_approaches_the_target() {
        let (mut engine, id) = world_2d();
        let world = engine.world_mut(id).unwrap();
        world.create_body(floor()).unwrap();
        let body = world.create_body(character()).unwrap();
        settle(world, 10);

        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.set_input(PlatformerInput {
            horizontal: 1.0,
            ..PlatformerInput::default()
        });
        controller.update(world, 0.05).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().x(), 3.0, epsilon = 1e-3);
        controller.update(world, 1.0).unwrap();
        assert_relative_eq!(world.velocity(body).unwrap().x(), 8.0, epsilon = 1e-3);
    }

    #[test]
    fn wall_slide_caps_the_fall() {
        let (mut engine, id) = world_3d();
        let world = engine.world_mut(id).unwrap();
        world
            .create_body(BodyDesc::fixed([0.95, 10.0, 0.0]).with_shape(ShapeDesc::cuboid([0.5, 10.0, 5.0])))
            .unwrap();
        let body = world.create_body(character()).unwrap();
        world.set_position(body, [0.0, 10.0, 0.0].into()).unwrap();
        world.set_velocity(body, [0.0, -9.0, 0.0].into()).unwrap();

        let mut controller = PlatformerController::new(body, PlatformerSettings::default());
        controller.update(world, 1.0 / 60.0).unwrap();
        assert_eq!(controller.wall(), Some(WallSide::Right));
        assert_relative_eq!(world.velocity(body).unwrap().y(), -2.0, epsilon = 1e-3);
    }
}
