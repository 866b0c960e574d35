use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::quality::{DevicePresets, QualityPresets};
use crate::types::{SleepThresholds, WorldConfig};
use crate::vector::{Dimension, PhysVec};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_gravity_2d() -> [f32; 2] {
    [0.0, 9.81]
}
const fn default_gravity_3d() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}
const fn default_time_step() -> f32 {
    1.0 / 60.0
}
const fn default_max_substeps() -> u32 {
    5
}
const fn default_solver_iterations() -> usize {
    6
}
const fn default_true() -> bool {
    true
}
const fn default_pool_max_bodies() -> usize {
    300
}
const fn default_target_fps() -> f32 {
    60.0
}
const fn default_sample_capacity() -> usize {
    60
}
const fn default_min_samples() -> usize {
    10
}
const fn default_downgrade_ratio() -> f32 {
    0.9
}
const fn default_upgrade_ratio() -> f32 {
    1.1
}
const fn default_widen_below() -> f32 {
    0.8
}
const fn default_narrow_above() -> f32 {
    1.2
}
const fn default_widen_factor() -> f32 {
    1.1
}
const fn default_narrow_factor() -> f32 {
    0.9
}
const fn default_sleep_min() -> f32 {
    0.05
}
const fn default_sleep_max() -> f32 {
    0.3
}
const fn default_sleep_thresholds() -> SleepThresholds {
    SleepThresholds::new(0.1, 0.1)
}
const fn default_mobile_sleep_thresholds() -> SleepThresholds {
    SleepThresholds::new(0.2, 0.2)
}
const fn default_mobile_time_until_sleep() -> f32 {
    0.5
}
const fn default_mobile_solver_iterations() -> usize {
    4
}
const fn default_mobile_ccd_substeps() -> usize {
    1
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// WorldSettings
// ---------------------------------------------------------------------------

/// Defaults for newly created worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// 2-D gravity in screen space (+Y down).
    #[serde(default = "default_gravity_2d")]
    pub gravity_2d: [f32; 2],

    /// 3-D gravity in world space (+Y up).
    #[serde(default = "default_gravity_3d")]
    pub gravity_3d: [f32; 3],

    /// Fixed substep in seconds (default: 1/60).
    #[serde(default = "default_time_step")]
    pub time_step: f32,

    /// Substeps per `step()` call before backlog is dropped.
    #[serde(default = "default_max_substeps")]
    pub max_substeps: u32,

    #[serde(default = "default_solver_iterations")]
    pub solver_iterations: usize,

    #[serde(default = "default_true")]
    pub sleeping: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity_2d: default_gravity_2d(),
            gravity_3d: default_gravity_3d(),
            time_step: default_time_step(),
            max_substeps: default_max_substeps(),
            solver_iterations: default_solver_iterations(),
            sleeping: true,
        }
    }
}

impl WorldSettings {
    /// A [`WorldConfig`] for `dimension` using these defaults.
    #[must_use]
    pub fn world_config(&self, dimension: Dimension) -> WorldConfig {
        let gravity = match dimension {
            Dimension::Two => PhysVec::from(self.gravity_2d),
            Dimension::Three => PhysVec::from(self.gravity_3d),
        };
        WorldConfig {
            dimension,
            gravity: Some(gravity),
            time_step: self.time_step,
            max_substeps: self.max_substeps,
            solver_iterations: self.solver_iterations,
            sleeping: self.sleeping,
            bounds: None,
            debug_draw: false,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step > 0.0) {
            return Err(invalid("world.time_step", format!("{} (must be > 0)", self.time_step)));
        }
        if self.max_substeps == 0 {
            return Err(invalid("world.max_substeps", "must be >= 1"));
        }
        if self.solver_iterations == 0 {
            return Err(invalid("world.solver_iterations", "must be >= 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PoolSettings
// ---------------------------------------------------------------------------

/// Native handle pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on pooled handles; replaced by the device preset.
    #[serde(default = "default_pool_max_bodies")]
    pub max_bodies: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bodies: default_pool_max_bodies(),
        }
    }
}

// ---------------------------------------------------------------------------
// OptimizerSettings
// ---------------------------------------------------------------------------

/// Adaptive quality controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_target_fps")]
    pub target_fps: f32,

    /// Frame-time ring buffer capacity.
    #[serde(default = "default_sample_capacity")]
    pub sample_capacity: usize,

    /// Samples required before any decision.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Quality drops below `target * downgrade_ratio`.
    #[serde(default = "default_downgrade_ratio")]
    pub downgrade_ratio: f32,

    /// Quality rises above `target * upgrade_ratio`.
    #[serde(default = "default_upgrade_ratio")]
    pub upgrade_ratio: f32,

    /// Sleep thresholds widen below `target * sleep_widen_below`.
    #[serde(default = "default_widen_below")]
    pub sleep_widen_below: f32,

    /// Sleep thresholds narrow above `target * sleep_narrow_above`.
    #[serde(default = "default_narrow_above")]
    pub sleep_narrow_above: f32,

    #[serde(default = "default_widen_factor")]
    pub sleep_widen_factor: f32,

    #[serde(default = "default_narrow_factor")]
    pub sleep_narrow_factor: f32,

    #[serde(default = "default_sleep_min")]
    pub sleep_min: f32,

    #[serde(default = "default_sleep_max")]
    pub sleep_max: f32,

    #[serde(default = "default_sleep_thresholds")]
    pub initial_sleep_thresholds: SleepThresholds,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_fps: default_target_fps(),
            sample_capacity: default_sample_capacity(),
            min_samples: default_min_samples(),
            downgrade_ratio: default_downgrade_ratio(),
            upgrade_ratio: default_upgrade_ratio(),
            sleep_widen_below: default_widen_below(),
            sleep_narrow_above: default_narrow_above(),
            sleep_widen_factor: default_widen_factor(),
            sleep_narrow_factor: default_narrow_factor(),
            sleep_min: default_sleep_min(),
            sleep_max: default_sleep_max(),
            initial_sleep_thresholds: default_sleep_thresholds(),
        }
    }
}

impl OptimizerSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_fps > 0.0) {
            return Err(invalid("optimizer.target_fps", format!("{} (must be > 0)", self.target_fps)));
        }
        if self.min_samples == 0 {
            return Err(invalid("optimizer.min_samples", "must be >= 1"));
        }
        if self.sample_capacity < self.min_samples {
            return Err(invalid(
                "optimizer.sample_capacity",
                format!(
                    "{} is smaller than min_samples {}",
                    self.sample_capacity, self.min_samples
                ),
            ));
        }
        if self.downgrade_ratio > self.upgrade_ratio {
            return Err(invalid(
                "optimizer.downgrade_ratio",
                "must not exceed upgrade_ratio",
            ));
        }
        if self.sleep_widen_below > self.sleep_narrow_above {
            return Err(invalid(
                "optimizer.sleep_widen_below",
                "must not exceed sleep_narrow_above",
            ));
        }
        if !(self.sleep_min > 0.0) || self.sleep_min > self.sleep_max {
            return Err(invalid(
                "optimizer.sleep_min",
                format!("need 0 < sleep_min <= sleep_max, got {} / {}", self.sleep_min, self.sleep_max),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MobileSettings
// ---------------------------------------------------------------------------

/// Bundle applied by `optimize_for_mobile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileSettings {
    #[serde(default = "default_mobile_sleep_thresholds")]
    pub sleep_thresholds: SleepThresholds,

    /// Seconds of rest before a body sleeps.
    #[serde(default = "default_mobile_time_until_sleep")]
    pub time_until_sleep: f32,

    #[serde(default = "default_mobile_solver_iterations")]
    pub solver_iterations: usize,

    #[serde(default = "default_mobile_ccd_substeps")]
    pub max_ccd_substeps: usize,
}

impl Default for MobileSettings {
    fn default() -> Self {
        Self {
            sleep_thresholds: default_mobile_sleep_thresholds(),
            time_until_sleep: default_mobile_time_until_sleep(),
            solver_iterations: default_mobile_solver_iterations(),
            max_ccd_substeps: default_mobile_ccd_substeps(),
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Top-level configuration, usually read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
    #[serde(default)]
    pub quality: QualityPresets,
    #[serde(default)]
    pub device: DevicePresets,
    #[serde(default)]
    pub mobile: MobileSettings,
}

impl PhysicsConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.optimizer.validate()?;
        self.quality.validate()?;
        self.device.validate()?;
        if self.mobile.solver_iterations == 0 {
            return Err(invalid("mobile.solver_iterations", "must be >= 1"));
        }
        Ok(())
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid("config", e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
