//! Short-lived physical particles.
//!
//! Emission is seeded so a given emitter always produces the same spray.
//! Expired particles are removed from the world, which returns their native
//! bodies to the engine pool for the next emission.

use std::f32::consts::TAU;

use duophys_core::prelude::*;
use duophys_physics::contract::PhysicsWorld;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::canonical::to_world;

/// Tuning for a [`ParticleEmitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterSettings {
    /// Particles per second.
    pub rate: f32,
    /// Seconds a particle lives.
    pub lifetime: f32,
    /// Launch speed range.
    pub speed: (f32, f32),
    /// Canonical launch direction.
    pub direction: Vector3<f32>,
    /// Half-angle of the launch cone in radians.
    pub spread: f32,
    pub radius: f32,
    pub max_particles: usize,
    pub material: Option<String>,
    pub seed: u64,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            rate: 30.0,
            lifetime: 1.0,
            speed: (4.0, 6.0),
            direction: Vector3::y(),
            spread: 0.3,
            radius: 0.05,
            max_particles: 100,
            material: None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Particle {
    body: BodyId,
    age: f32,
}

pub struct ParticleEmitter {
    settings: EmitterSettings,
    origin: Vector3<f32>,
    rng: ChaCha8Rng,
    particles: Vec<Particle>,
    carry: f32,
    emitting: bool,
}

impl ParticleEmitter {
    /// An emitter at canonical `origin`.
    #[must_use]
    pub fn new(origin: Vector3<f32>, settings: EmitterSettings) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
            origin,
            particles: Vec::new(),
            carry: 0.0,
            emitting: true,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    pub fn set_origin(&mut self, origin: Vector3<f32>) {
        self.origin = origin;
    }

    /// Pause or resume continuous emission. Bursts and expiry still run.
    pub fn set_emitting(&mut self, emitting: bool) {
        self.emitting = emitting;
        if !emitting {
            self.carry = 0.0;
        }
    }

    #[must_use]
    pub const fn is_emitting(&self) -> bool {
        self.emitting
    }

    #[must_use]
    pub fn live(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.particles.iter().map(|p| p.body)
    }

    /// Age particles, retire the expired ones, then emit at the configured rate.
    /// Returns how many particles were emitted.
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt: f32) -> usize {
        if dt <= 0.0 {
            return 0;
        }
        self.expire(world, dt);
        if !self.emitting {
            return 0;
        }
        self.carry += self.settings.rate * dt;
        let due = self.carry.floor();
        self.carry -= due;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let due = due as usize;
        self.emit(world, due)
    }

    /// Emit `count` particles at once, up to the live limit.
    pub fn burst<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, count: usize) -> usize {
        self.emit(world, count)
    }

    /// Remove every live particle from the world.
    pub fn clear<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        for particle in self.particles.drain(..) {
            // Already gone when the world was cleared behind our back.
            let _ = world.remove_body(particle.body);
        }
        self.carry = 0.0;
    }

    fn expire<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt: f32) {
        let lifetime = self.settings.lifetime;
        self.particles.retain_mut(|particle| {
            particle.age += dt;
            if particle.age < lifetime && world.contains_body(particle.body) {
                return true;
            }
            let _ = world.remove_body(particle.body);
            false
        });
    }

    fn emit<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, count: usize) -> usize {
        let room = self.settings.max_particles.saturating_sub(self.particles.len());
        let mut emitted = 0;
        for _ in 0..count.min(room) {
            let velocity = self.launch_velocity(world.dimension());
            let mut desc = BodyDesc::dynamic(to_world(self.origin))
                .with_shape(ShapeDesc::ball(self.settings.radius))
                .with_velocity(to_world(velocity));
            if let Some(material) = &self.settings.material {
                desc = desc.with_material(material.clone());
            }
            match world.create_body(desc) {
                Ok(body) => {
                    self.particles.push(Particle { body, age: 0.0 });
                    emitted += 1;
                }
                Err(e) => {
                    warn!("duophys: particle emission stopped: {e}");
                    break;
                }
            }
        }
        emitted
    }

    /// A random velocity inside the launch cone. In 2-D the cone is the
    /// planar fan around the direction.
    fn launch_velocity(&mut self, dimension: Dimension) -> Vector3<f32> {
        let (low, high) = self.settings.speed;
        let speed = if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        };
        let spread = self.settings.spread.max(0.0);
        let mut direction = self.settings.direction;
        if dimension == Dimension::Two {
            direction.z = 0.0;
        }
        let Some(direction) = Unit::try_new(direction, 1e-6) else {
            return Vector3::zeros();
        };

        let offset = if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let turned = match dimension {
            Dimension::Two => UnitQuaternion::from_axis_angle(&Vector3::z_axis(), offset) * *direction,
            Dimension::Three => {
                let around: f32 = self.rng.gen_range(0.0..TAU);
                let side = Unit::new_normalize(perpendicular(&direction));
                let tilted = UnitQuaternion::from_axis_angle(&side, offset.abs()) * *direction;
                UnitQuaternion::from_axis_angle(&direction, around) * tilted
            }
        };
        turned * speed
    }
}

fn perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&helper)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duophys_physics::prelude::*;
    use duophys_test_utils::{weightless_world, world_2d};

    fn emitter(settings: EmitterSettings) -> ParticleEmitter {
        ParticleEmitter::new(Vector3::zeros(), settings)
    }

    #[test]
    fn emits_at_the_configured_rate() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let mut fountain = emitter(EmitterSettings {
            rate: 10.0,
            lifetime: 100.0,
            ..EmitterSettings::default()
        });
        let emitted: usize = (0..10).map(|_| fountain.update(world, 0.1)).sum();
        assert_eq!(emitted, 10);
        assert_eq!(fountain.live(), 10);
        assert_eq!(world.body_count(), 10);
    }

    #[test]
    fn burst_respects_the_live_limit() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let mut fountain = emitter(EmitterSettings {
            max_particles: 8,
            ..EmitterSettings::default()
        });
        assert_eq!(fountain.burst(world, 20), 8);
        assert_eq!(fountain.burst(world, 1), 0);
    }

    #[test]
    fn expired_particles_go_back_to_the_pool() {
        let (mut engine, id) = world_2d();
        {
            let world = engine.world_mut(id).unwrap();
            let mut fountain = emitter(EmitterSettings {
                lifetime: 0.5,
                ..EmitterSettings::default()
            });
            fountain.set_emitting(false);
            fountain.burst(world, 5);
            fountain.update(world, 0.6);
            assert_eq!(fountain.live(), 0);
            assert_eq!(world.body_count(), 0);
        }
        assert_eq!(engine.pooled_handles(), 5);
    }

    #[test]
    fn same_seed_same_spray() {
        let spray = |seed| {
            let (mut engine, id) = weightless_world::<Rapier3d>();
            let world = engine.world_mut(id).unwrap();
            let mut fountain = emitter(EmitterSettings {
                seed,
                ..EmitterSettings::default()
            });
            fountain.burst(world, 4);
            fountain
                .particles()
                .map(|body| world.velocity(body).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(spray(3), spray(3));
        assert_ne!(spray(3), spray(4));
    }

    #[test]
    fn launch_stays_inside_the_cone() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let mut fountain = emitter(EmitterSettings {
            spread: 0.2,
            ..EmitterSettings::default()
        });
        fountain.burst(world, 50);
        for body in fountain.particles() {
            let v = world.velocity(body).unwrap().to_3d();
            let angle = v.angle(&Vector3::y());
            assert!(angle <= 0.2 + 1e-4, "angle {angle}");
        }
    }

    #[test]
    fn upward_spray_goes_up_on_screen_in_2d() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let mut fountain = emitter(EmitterSettings::default());
        fountain.burst(world, 10);
        assert!(
            fountain
                .particles()
                .all(|body| world.velocity(body).unwrap().y() < 0.0)
        );
    }
}
