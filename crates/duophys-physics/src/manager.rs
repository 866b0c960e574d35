//! [`PhysicsManager`]: the single entry point game code talks to.
//!
//! Owns at most one engine, remembers which world is active, and closes the
//! adaptive loop: every [`update`](PhysicsManager::update) ticks the running
//! worlds first, then feeds the frame time to the optimizer and applies
//! whatever it decided.

use duophys_core::events::SubscriptionId;
use duophys_core::prelude::*;
use tracing::{error, info};

use crate::contract::PhysicsWorld;
use crate::engine::Engine;
use crate::optimizer::{AdaptiveOptimizer, OptimizerDecision};
#[cfg(feature = "dim2")]
use crate::rapier::Rapier2d;
#[cfg(feature = "dim3")]
use crate::rapier::Rapier3d;

// ---------------------------------------------------------------------------
// ActiveEngine
// ---------------------------------------------------------------------------

/// The engine of whichever dimension was initialized.
pub enum ActiveEngine {
    #[cfg(feature = "dim2")]
    TwoD(Engine<Rapier2d>),
    #[cfg(feature = "dim3")]
    ThreeD(Engine<Rapier3d>),
}

/// Run `$body` with `$e` bound to the inner engine.
macro_rules! with_engine {
    ($engine:expr, $e:ident => $body:expr) => {
        match $engine {
            #[cfg(feature = "dim2")]
            ActiveEngine::TwoD($e) => $body,
            #[cfg(feature = "dim3")]
            ActiveEngine::ThreeD($e) => $body,
        }
    };
}

impl ActiveEngine {
    fn for_type(engine: EngineType, config: PhysicsConfig) -> Result<Self, InitError> {
        match engine {
            #[cfg(feature = "dim2")]
            EngineType::Rapier2d => Ok(Self::TwoD(Engine::new(config))),
            #[cfg(feature = "dim3")]
            EngineType::Rapier3d => Ok(Self::ThreeD(Engine::new(config))),
            #[allow(unreachable_patterns)]
            other => Err(InitError::BackendUnavailable {
                engine: other.name().to_string(),
            }),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> Dimension {
        with_engine!(self, e => e.dimension())
    }

    #[must_use]
    pub fn engine_type(&self) -> EngineType {
        with_engine!(self, e => e.engine_type())
    }

    #[must_use]
    pub fn quality(&self) -> Option<QualityLevel> {
        with_engine!(self, e => e.quality())
    }

    #[must_use]
    pub fn world_ids(&self) -> Vec<WorldId> {
        with_engine!(self, e => e.world_ids())
    }

    pub fn world(&self, id: WorldId) -> Result<&dyn PhysicsWorld, PhysicsError> {
        with_engine!(self, e => e.world(id).map(|w| w as &dyn PhysicsWorld))
    }

    pub fn world_mut(&mut self, id: WorldId) -> Result<&mut dyn PhysicsWorld, PhysicsError> {
        with_engine!(self, e => e.world_mut(id).map(|w| w as &mut dyn PhysicsWorld))
    }

    pub fn create_world(&mut self, config: Option<WorldConfig>) -> Result<WorldId, ConfigError> {
        with_engine!(self, e => e.create_world(config))
    }

    pub fn destroy_world(&mut self, id: WorldId) -> Result<(), PhysicsError> {
        with_engine!(self, e => e.destroy_world(id))
    }

    pub fn optimize_for_device(&mut self, tier: DeviceTier) -> Result<(), ConfigError> {
        with_engine!(self, e => e.optimize_for_device(tier))
    }

    pub fn set_quality(&mut self, level: QualityLevel) -> Result<(), ConfigError> {
        with_engine!(self, e => e.set_quality(level))
    }

    pub fn set_sleep_thresholds(&mut self, thresholds: SleepThresholds) -> Result<(), ConfigError> {
        with_engine!(self, e => e.set_sleep_thresholds(thresholds))
    }

    pub fn optimize_for_mobile(&mut self) -> Result<(), ConfigError> {
        with_engine!(self, e => e.optimize_for_mobile())
    }

    pub fn register_material(
        &mut self,
        material: PhysicsMaterial,
    ) -> Result<std::sync::Arc<PhysicsMaterial>, ConfigError> {
        with_engine!(self, e => e.register_material(material))
    }

    pub fn performance_metrics(&self) -> Result<PerformanceMetrics, ConfigError> {
        with_engine!(self, e => e.performance_metrics())
    }

    pub fn tick(&mut self, dt: f32) -> Result<usize, ConfigError> {
        with_engine!(self, e => e.tick(dt))
    }

    pub fn destroy(&mut self) {
        with_engine!(self, e => e.destroy());
    }

    async fn initialize(&mut self) -> Result<(), InitError> {
        with_engine!(self, e => e.initialize().await)
    }
}

// ---------------------------------------------------------------------------
// PhysicsManager
// ---------------------------------------------------------------------------

pub struct PhysicsManager {
    config: PhysicsConfig,
    device: DeviceInfo,
    tier: DeviceTier,
    engine: Option<ActiveEngine>,
    active_world: Option<WorldId>,
    optimizer: AdaptiveOptimizer,
    events: EventBus<ManagerEvent>,
    mobile: bool,
}

impl PhysicsManager {
    /// A manager for `device`. Nothing is simulated until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(config: PhysicsConfig, device: DeviceInfo) -> Self {
        let tier = device.tier();
        Self {
            optimizer: AdaptiveOptimizer::new(config.optimizer.clone(), tier),
            config,
            device,
            tier,
            engine: None,
            active_world: None,
            events: EventBus::new(),
            mobile: false,
        }
    }

    /// Build and initialize the engine for `dimension`.
    ///
    /// `engine` is `None`, `"rapier"` or the exact backend name. On failure
    /// an `Error` event is published and the manager stays uninitialized.
    pub async fn initialize(
        &mut self,
        dimension: Dimension,
        engine: Option<&str>,
    ) -> Result<(), InitError> {
        if self.engine.is_some() {
            self.destroy();
        }
        match self.try_initialize(dimension, engine).await {
            Ok(engine_type) => {
                info!(
                    "duophys: initialized {engine_type} for {dimension} on a {} device",
                    self.tier
                );
                self.events.publish(
                    Topic::World,
                    &ManagerEvent::Initialized {
                        dimension,
                        engine: engine_type.name().to_string(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                error!("duophys: initialization failed: {e}");
                self.events.publish(
                    Topic::World,
                    &ManagerEvent::Error {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn try_initialize(
        &mut self,
        dimension: Dimension,
        engine: Option<&str>,
    ) -> Result<EngineType, InitError> {
        let engine_type = EngineType::resolve(dimension, engine)?;
        let mut active = ActiveEngine::for_type(engine_type, self.config.clone())?;
        active.initialize().await?;
        active.optimize_for_device(self.tier)?;
        active.set_quality(self.tier.initial_quality())?;
        self.optimizer.reset(self.tier);
        self.engine = Some(active);
        Ok(engine_type)
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    #[must_use]
    pub const fn engine(&self) -> Option<&ActiveEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut ActiveEngine> {
        self.engine.as_mut()
    }

    fn active(&self) -> Result<&ActiveEngine, ConfigError> {
        self.engine.as_ref().ok_or(ConfigError::NotInitialized)
    }

    fn active_mut(&mut self) -> Result<&mut ActiveEngine, ConfigError> {
        self.engine.as_mut().ok_or(ConfigError::NotInitialized)
    }

    /// Tear down the engine and every world.
    pub fn destroy(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            self.active_world = None;
            self.events.publish(Topic::World, &ManagerEvent::Destroyed);
            info!("duophys: manager destroyed");
        }
    }

    /// Destroy the current engine and initialize another.
    pub async fn switch_engine(
        &mut self,
        dimension: Dimension,
        engine: Option<&str>,
    ) -> Result<(), InitError> {
        self.destroy();
        self.initialize(dimension, engine).await
    }

    // -- Worlds --

    /// Create, start and activate a world.
    pub fn create_world(&mut self, config: Option<WorldConfig>) -> Result<WorldId, PhysicsError> {
        let mobile = self.mobile;
        let engine = self.active_mut()?;
        let id = engine.create_world(config)?;
        let world = engine.world_mut(id)?;
        if mobile {
            world.optimize_for_mobile();
        }
        world.start()?;
        self.active_world = Some(id);
        self.events
            .publish(Topic::World, &ManagerEvent::WorldCreated { world: id });
        Ok(id)
    }

    #[must_use]
    pub const fn active_world(&self) -> Option<WorldId> {
        self.active_world
    }

    fn active_world_id(&self) -> Result<WorldId, ConfigError> {
        self.active_world.ok_or_else(|| ConfigError::InvalidValue {
            field: "active_world".into(),
            message: "no world has been created".into(),
        })
    }

    pub fn set_active_world(&mut self, id: WorldId) -> Result<(), PhysicsError> {
        self.active()?.world(id)?;
        self.active_world = Some(id);
        Ok(())
    }

    /// The active world.
    pub fn world(&self) -> Result<&dyn PhysicsWorld, PhysicsError> {
        let id = self.active_world_id()?;
        self.active()?.world(id)
    }

    pub fn world_mut(&mut self) -> Result<&mut dyn PhysicsWorld, PhysicsError> {
        let id = self.active_world_id()?;
        self.active_mut()?.world_mut(id)
    }

    pub fn world_by_id(&self, id: WorldId) -> Result<&dyn PhysicsWorld, PhysicsError> {
        self.active()?.world(id)
    }

    pub fn world_by_id_mut(&mut self, id: WorldId) -> Result<&mut dyn PhysicsWorld, PhysicsError> {
        self.active_mut()?.world_mut(id)
    }

    pub fn destroy_world(&mut self, id: WorldId) -> Result<(), PhysicsError> {
        self.active_mut()?.destroy_world(id)?;
        if self.active_world == Some(id) {
            self.active_world = None;
        }
        Ok(())
    }

    /// Create a body in the active world.
    pub fn create_body(&mut self, desc: impl Into<BodyDesc>) -> Result<BodyId, PhysicsError> {
        self.world_mut()?.create_body(desc.into())
    }

    /// Create a constraint in the active world.
    pub fn create_constraint(&mut self, desc: ConstraintDesc) -> Result<ConstraintId, PhysicsError> {
        self.world_mut()?.create_constraint(desc)
    }

    pub fn register_material(
        &mut self,
        material: PhysicsMaterial,
    ) -> Result<std::sync::Arc<PhysicsMaterial>, ConfigError> {
        self.active_mut()?.register_material(material)
    }

    // -- Frame --

    /// Tick every running world by `dt` seconds, then let the optimizer react
    /// to the frame time.
    ///
    /// `dt` is the only frame time the optimizer sees; nothing is measured
    /// here. Pass the real host frame delta, not a fixed step, or adaptive
    /// quality has nothing to react to.
    pub fn update(&mut self, dt: f32) -> Result<OptimizerDecision, ConfigError> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(ConfigError::NotInitialized);
        };
        engine.tick(dt)?;

        let decision = self.optimizer.record_frame(f64::from(dt) * 1000.0);
        if let Some(level) = decision.quality {
            let from = engine.quality().unwrap_or(level);
            engine.set_quality(level)?;
            info!("duophys: quality {from} -> {level}");
            self.events
                .publish(Topic::World, &ManagerEvent::QualityChanged { from, to: level });
        }
        if let Some(thresholds) = decision.sleep_thresholds {
            engine.set_sleep_thresholds(thresholds)?;
        }
        Ok(decision)
    }

    pub fn performance_metrics(&self) -> Result<PerformanceMetrics, ConfigError> {
        self.active()?.performance_metrics()
    }

    // -- Device --

    #[must_use]
    pub const fn device(&self) -> &DeviceInfo {
        &self.device
    }

    #[must_use]
    pub const fn tier(&self) -> DeviceTier {
        self.tier
    }

    /// Current quality level, `None` before initialization.
    #[must_use]
    pub fn quality(&self) -> Option<QualityLevel> {
        self.engine.as_ref().and_then(ActiveEngine::quality)
    }

    #[must_use]
    pub const fn optimizer(&self) -> &AdaptiveOptimizer {
        &self.optimizer
    }

    pub fn optimizer_mut(&mut self) -> &mut AdaptiveOptimizer {
        &mut self.optimizer
    }

    /// Override the detected tier. The engine preset follows immediately.
    pub fn set_device_tier(&mut self, tier: DeviceTier) -> Result<(), ConfigError> {
        self.tier = tier;
        self.optimizer.set_tier(tier);
        if let Some(engine) = self.engine.as_mut() {
            engine.optimize_for_device(tier)?;
        }
        Ok(())
    }

    /// Apply the mobile bundle to every world, now and for worlds created later.
    pub fn enable_mobile_optimizations(&mut self) -> Result<(), ConfigError> {
        self.mobile = true;
        if let Some(engine) = self.engine.as_mut() {
            engine.optimize_for_mobile()?;
        }
        Ok(())
    }

    // -- Events --

    pub fn subscribe(&mut self, callback: impl FnMut(&ManagerEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(Topic::World, callback)
    }

    pub fn mailbox(&mut self) -> Mailbox<ManagerEvent> {
        self.events.mailbox(Topic::World)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "dim2", feature = "dim3"))]
mod tests {
    use super::*;

    fn desktop() -> DeviceInfo {
        DeviceInfo::new(Some(16.0), 8, "linux/x86_64")
    }

    #[test]
    fn operations_before_initialize_fail() {
        let mut manager = PhysicsManager::new(PhysicsConfig::default(), desktop());
        assert!(matches!(manager.update(0.016), Err(ConfigError::NotInitialized)));
        assert!(manager.create_world(None).is_err());
        assert!(manager.quality().is_none());
    }

    #[test]
    fn initialize_publishes_and_applies_the_tier() {
        let mut manager = PhysicsManager::new(PhysicsConfig::default(), desktop());
        let events = manager.mailbox();
        pollster::block_on(manager.initialize(Dimension::Three, None)).unwrap();
        assert_eq!(manager.quality(), Some(QualityLevel::High));
        assert_eq!(
            events.drain(),
            vec![ManagerEvent::Initialized {
                dimension: Dimension::Three,
                engine: "rapier3d".into(),
            }]
        );
    }

    #[test]
    fn created_world_becomes_active_and_runs() {
        let mut manager = PhysicsManager::new(PhysicsConfig::default(), desktop());
        pollster::block_on(manager.initialize(Dimension::Two, Some("rapier"))).unwrap();
        let id = manager.create_world(None).unwrap();
        assert_eq!(manager.active_world(), Some(id));
        assert!(manager.world().unwrap().is_running());
        assert_eq!(manager.world().unwrap().dimension(), Dimension::Two);
    }

    #[test]
    fn destroy_clears_everything() {
        let mut manager = PhysicsManager::new(PhysicsConfig::default(), desktop());
        pollster::block_on(manager.initialize(Dimension::Two, None)).unwrap();
        manager.create_world(None).unwrap();
        let events = manager.mailbox();
        manager.destroy();
        assert!(!manager.is_initialized());
        assert!(manager.active_world().is_none());
        assert_eq!(events.drain(), vec![ManagerEvent::Destroyed]);
    }
}
