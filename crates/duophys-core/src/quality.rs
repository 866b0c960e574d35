//! Quality levels, device tiers and the presets they map to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// QualityLevel
// ---------------------------------------------------------------------------

/// Live simulation fidelity, walked up and down by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Low,
    Medium,
    High,
}

impl QualityLevel {
    /// One step lower, clamped at `Low`.
    #[must_use]
    pub const fn step_down(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// One step higher, clamped at `High`.
    #[must_use]
    pub const fn step_up(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeviceTier
// ---------------------------------------------------------------------------

/// Coarse hardware class. Sets the ceiling the optimizer may climb to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Low,
    Medium,
    High,
}

impl DeviceTier {
    /// Quality level a fresh engine starts at on this tier.
    #[must_use]
    pub const fn initial_quality(self) -> QualityLevel {
        match self {
            Self::Low => QualityLevel::Low,
            Self::Medium => QualityLevel::Medium,
            Self::High => QualityLevel::High,
        }
    }

    /// Whether the optimizer may raise quality to `level` on this tier.
    #[must_use]
    pub const fn allows(self, level: QualityLevel) -> bool {
        !matches!((self, level), (Self::Low, QualityLevel::High))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ConfigError::InvalidValue {
                field: "tier".into(),
                message: format!("unknown device tier '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Step parameters of one quality level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPreset {
    pub time_step: f32,
    pub solver_iterations: usize,
}

/// Presets for the three quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPresets {
    #[serde(default = "default_quality_low")]
    pub low: QualityPreset,
    #[serde(default = "default_quality_medium")]
    pub medium: QualityPreset,
    #[serde(default = "default_quality_high")]
    pub high: QualityPreset,
}

const fn default_quality_low() -> QualityPreset {
    QualityPreset {
        time_step: 1.0 / 30.0,
        solver_iterations: 4,
    }
}
const fn default_quality_medium() -> QualityPreset {
    QualityPreset {
        time_step: 1.0 / 60.0,
        solver_iterations: 6,
    }
}
const fn default_quality_high() -> QualityPreset {
    QualityPreset {
        time_step: 1.0 / 60.0,
        solver_iterations: 10,
    }
}

impl Default for QualityPresets {
    fn default() -> Self {
        Self {
            low: default_quality_low(),
            medium: default_quality_medium(),
            high: default_quality_high(),
        }
    }
}

impl QualityPresets {
    #[must_use]
    pub const fn preset(&self, level: QualityLevel) -> QualityPreset {
        match level {
            QualityLevel::Low => self.low,
            QualityLevel::Medium => self.medium,
            QualityLevel::High => self.high,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, preset) in [("low", self.low), ("medium", self.medium), ("high", self.high)] {
            if !(preset.time_step > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("quality.{name}.time_step"),
                    message: format!("{} (must be > 0)", preset.time_step),
                });
            }
            if preset.solver_iterations == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("quality.{name}.solver_iterations"),
                    message: "must be >= 1".into(),
                });
            }
        }
        Ok(())
    }
}

/// Discrete per-tier engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePreset {
    pub solver_iterations: usize,
    pub max_bodies: usize,
}

/// Presets for the three device tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePresets {
    #[serde(default = "default_device_low")]
    pub low: DevicePreset,
    #[serde(default = "default_device_medium")]
    pub medium: DevicePreset,
    #[serde(default = "default_device_high")]
    pub high: DevicePreset,
}

const fn default_device_low() -> DevicePreset {
    DevicePreset {
        solver_iterations: 4,
        max_bodies: 100,
    }
}
const fn default_device_medium() -> DevicePreset {
    DevicePreset {
        solver_iterations: 6,
        max_bodies: 300,
    }
}
const fn default_device_high() -> DevicePreset {
    DevicePreset {
        solver_iterations: 10,
        max_bodies: 1000,
    }
}

impl Default for DevicePresets {
    fn default() -> Self {
        Self {
            low: default_device_low(),
            medium: default_device_medium(),
            high: default_device_high(),
        }
    }
}

impl DevicePresets {
    #[must_use]
    pub const fn preset(&self, tier: DeviceTier) -> DevicePreset {
        match tier {
            DeviceTier::Low => self.low,
            DeviceTier::Medium => self.medium,
            DeviceTier::High => self.high,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, preset) in [("low", self.low), ("medium", self.medium), ("high", self.high)] {
            if preset.solver_iterations == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("device.{name}.solver_iterations"),
                    message: "must be >= 1".into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_steps_clamp() {
        assert_eq!(QualityLevel::High.step_down(), QualityLevel::Medium);
        assert_eq!(QualityLevel::Low.step_down(), QualityLevel::Low);
        assert_eq!(QualityLevel::Medium.step_up(), QualityLevel::High);
        assert_eq!(QualityLevel::High.step_up(), QualityLevel::High);
    }

    #[test]
    fn low_tier_never_allows_high() {
        assert!(!DeviceTier::Low.allows(QualityLevel::High));
        assert!(DeviceTier::Low.allows(QualityLevel::Medium));
        assert!(DeviceTier::Medium.allows(QualityLevel::High));
    }

    #[test]
    fn presets_increase_with_tier() {
        let presets = DevicePresets::default();
        let low = presets.preset(DeviceTier::Low);
        let high = presets.preset(DeviceTier::High);
        assert!(low.solver_iterations < high.solver_iterations);
        assert!(low.max_bodies < high.max_bodies);
    }

    #[test]
    fn quality_preset_values() {
        let presets = QualityPresets::default();
        assert_eq!(presets.preset(QualityLevel::Low).solver_iterations, 4);
        assert!((presets.preset(QualityLevel::High).time_step - 1.0 / 60.0).abs() < 1e-7);
        assert!(presets.validate().is_ok());
    }

    #[test]
    fn zero_time_step_is_rejected() {
        let mut presets = QualityPresets::default();
        presets.medium.time_step = 0.0;
        assert!(matches!(presets.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn tier_parses() {
        assert_eq!("High".parse::<DeviceTier>().ok(), Some(DeviceTier::High));
        assert!("ultra".parse::<DeviceTier>().is_err());
    }
}
