//! [`Engine`]: the worlds of one backend plus the context they share.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use duophys_core::pool::HandlePool;
use duophys_core::prelude::*;
use tracing::{debug, info, warn};

use crate::contract::PhysicsWorld;
use crate::kernel::Kernel;
use crate::world::World;

// ---------------------------------------------------------------------------
// EngineContext
// ---------------------------------------------------------------------------

/// State shared by an engine and every world it created.
pub struct EngineContext<K: Kernel> {
    pub(crate) pool: RefCell<HandlePool<K::NativeBody>>,
    pub(crate) materials: RefCell<MaterialRegistry>,
    pub(crate) config: PhysicsConfig,
}

impl<K: Kernel> EngineContext<K> {
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            pool: RefCell::new(HandlePool::new(
                config.pool.max_bodies,
                config.pool.enabled,
                K::reset_native,
            )),
            materials: RefCell::new(MaterialRegistry::with_presets()),
            config,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Every world of backend `K`.
///
/// Only [`initialize`](Self::initialize) is async; everything else fails
/// with [`ConfigError::NotInitialized`] until it has completed.
pub struct Engine<K: Kernel> {
    initialized: bool,
    context: Rc<EngineContext<K>>,
    worlds: BTreeMap<WorldId, World<K>>,
    next_world: u32,
    tier: DeviceTier,
    quality: Option<QualityLevel>,
}

impl<K: Kernel> Engine<K> {
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            initialized: false,
            context: Rc::new(EngineContext::new(config)),
            worlds: BTreeMap::new(),
            next_world: 0,
            tier: DeviceTier::Medium,
            quality: None,
        }
    }

    /// Validate the configuration and mark the backend ready.
    pub async fn initialize(&mut self) -> Result<(), InitError> {
        self.context.config.validate()?;
        self.initialized = true;
        info!("duophys: {} engine initialized", K::ENGINE);
        Ok(())
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        K::DIMENSION
    }

    #[must_use]
    pub const fn engine_type(&self) -> EngineType {
        K::ENGINE
    }

    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.context.config
    }

    #[must_use]
    pub const fn tier(&self) -> DeviceTier {
        self.tier
    }

    /// Active quality level, `None` until one was set.
    #[must_use]
    pub const fn quality(&self) -> Option<QualityLevel> {
        self.quality
    }

    fn ensure_initialized(&self) -> Result<(), ConfigError> {
        if self.initialized {
            Ok(())
        } else {
            Err(ConfigError::NotInitialized)
        }
    }

    // -- Worlds --

    /// Create a world. `None` uses the configured defaults.
    ///
    /// The world adopts the active quality preset.
    pub fn create_world(&mut self, config: Option<WorldConfig>) -> Result<WorldId, ConfigError> {
        self.ensure_initialized()?;
        let mut config =
            config.unwrap_or_else(|| self.context.config.world.world_config(K::DIMENSION));
        if config.dimension != K::DIMENSION {
            return Err(ConfigError::DimensionMismatch {
                expected: K::DIMENSION,
                got: config.dimension,
            });
        }
        if let Some(level) = self.quality {
            let preset = self.context.config.quality.preset(level);
            config.time_step = preset.time_step;
            config.solver_iterations = preset.solver_iterations;
        }

        let id = WorldId(self.next_world);
        self.next_world += 1;
        self.worlds
            .insert(id, World::new(id, config, Rc::clone(&self.context)));
        Ok(id)
    }

    pub fn world(&self, id: WorldId) -> Result<&World<K>, PhysicsError> {
        self.ensure_initialized()?;
        Ok(self.worlds.get(&id).ok_or(ResourceError::MissingWorld(id))?)
    }

    pub fn world_mut(&mut self, id: WorldId) -> Result<&mut World<K>, PhysicsError> {
        self.ensure_initialized()?;
        Ok(self
            .worlds
            .get_mut(&id)
            .ok_or(ResourceError::MissingWorld(id))?)
    }

    #[must_use]
    pub fn world_ids(&self) -> Vec<WorldId> {
        self.worlds.keys().copied().collect()
    }

    pub fn destroy_world(&mut self, id: WorldId) -> Result<(), PhysicsError> {
        self.ensure_initialized()?;
        let mut world = self
            .worlds
            .remove(&id)
            .ok_or(ResourceError::MissingWorld(id))?;
        world.destroy();
        Ok(())
    }

    // -- Tuning --

    /// Apply the discrete preset of `tier`: pool bound and solver iterations.
    pub fn optimize_for_device(&mut self, tier: DeviceTier) -> Result<(), ConfigError> {
        self.ensure_initialized()?;
        let preset = self.context.config.device.preset(tier);
        self.context.pool.borrow_mut().set_max(preset.max_bodies);
        for world in self.worlds.values_mut() {
            world.set_solver_iterations(preset.solver_iterations)?;
        }
        self.tier = tier;
        info!(
            "duophys: {} tuned for {tier} devices (iterations={}, max bodies={})",
            K::ENGINE,
            preset.solver_iterations,
            preset.max_bodies
        );
        Ok(())
    }

    /// Apply the time step and solver iterations of `level` to every world.
    pub fn set_quality(&mut self, level: QualityLevel) -> Result<(), ConfigError> {
        self.ensure_initialized()?;
        let preset = self.context.config.quality.preset(level);
        for world in self.worlds.values_mut() {
            world.set_time_step(preset.time_step)?;
            world.set_solver_iterations(preset.solver_iterations)?;
        }
        if self.quality != Some(level) {
            debug!("duophys: {} quality set to {level}", K::ENGINE);
        }
        self.quality = Some(level);
        Ok(())
    }

    pub fn set_sleep_thresholds(&mut self, thresholds: SleepThresholds) -> Result<(), ConfigError> {
        self.ensure_initialized()?;
        for world in self.worlds.values_mut() {
            world.set_sleep_thresholds(thresholds);
        }
        Ok(())
    }

    pub fn optimize_for_mobile(&mut self) -> Result<(), ConfigError> {
        self.ensure_initialized()?;
        for world in self.worlds.values_mut() {
            world.optimize_for_mobile();
        }
        Ok(())
    }

    // -- Materials --

    /// Register or replace a material. Bodies keep the one they were built with.
    pub fn register_material(
        &mut self,
        material: PhysicsMaterial,
    ) -> Result<Arc<PhysicsMaterial>, ConfigError> {
        self.ensure_initialized()?;
        Ok(self.context.materials.borrow_mut().register(material))
    }

    #[must_use]
    pub fn material(&self, id: &str) -> Option<Arc<PhysicsMaterial>> {
        self.context.materials.borrow().get(id)
    }

    // -- Pool --

    /// Take a reset native body from the pool, if one is available.
    pub fn pooled_body(&mut self) -> Result<Option<K::NativeBody>, ConfigError> {
        self.ensure_initialized()?;
        Ok(self.context.pool.borrow_mut().acquire())
    }

    /// Reset `body` and keep it for reuse. `false` when it was dropped.
    pub fn return_body_to_pool(&mut self, body: K::NativeBody) -> Result<bool, ConfigError> {
        self.ensure_initialized()?;
        Ok(self.context.pool.borrow_mut().release(body))
    }

    #[must_use]
    pub fn pooled_handles(&self) -> usize {
        self.context.pool.borrow().len()
    }

    pub fn set_pooling(&mut self, enabled: bool) {
        self.context.pool.borrow_mut().set_enabled(enabled);
    }

    // -- Frame --

    /// Sum over every world plus the pool size.
    pub fn performance_metrics(&self) -> Result<PerformanceMetrics, ConfigError> {
        self.ensure_initialized()?;
        let mut total = PerformanceMetrics::default();
        for world in self.worlds.values() {
            total += world.performance_metrics();
        }
        total.pooled_handles = self.pooled_handles();
        Ok(total)
    }

    /// Tick every running world. Returns how many stepped.
    pub fn tick(&mut self, dt: f32) -> Result<usize, ConfigError> {
        self.ensure_initialized()?;
        let mut stepped = 0;
        for world in self.worlds.values_mut() {
            match world.tick(dt) {
                Ok(true) => stepped += 1,
                Ok(false) => {}
                Err(e) => warn!("duophys: skipped world {}: {e}", world.id()),
            }
        }
        Ok(stepped)
    }

    /// Destroy every world and return to the uninitialized state.
    pub fn destroy(&mut self) {
        for (_, mut world) in std::mem::take(&mut self.worlds) {
            world.destroy();
        }
        self.context.pool.borrow_mut().clear();
        self.initialized = false;
        self.quality = None;
        info!("duophys: {} engine destroyed", K::ENGINE);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
