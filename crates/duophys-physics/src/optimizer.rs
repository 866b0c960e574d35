//! Frame-time driven quality and sleep-threshold controller.
//!
//! The optimizer only decides; the manager applies. Quality moves one level
//! per decision and the sample window restarts after every move, so a level
//! is always judged on frames simulated at that level. Sleep thresholds drift
//! from a separate window that quality moves never reset.

use duophys_core::config::OptimizerSettings;
use duophys_core::metrics::RollingAverage;
use duophys_core::prelude::*;
use tracing::debug;

/// What the manager should change after a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimizerDecision {
    pub quality: Option<QualityLevel>,
    pub sleep_thresholds: Option<SleepThresholds>,
}

impl OptimizerDecision {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quality.is_none() && self.sleep_thresholds.is_none()
    }
}

pub struct AdaptiveOptimizer {
    settings: OptimizerSettings,
    samples: RollingAverage,
    sleep_samples: RollingAverage,
    tier: DeviceTier,
    quality: QualityLevel,
    sleep_thresholds: SleepThresholds,
}

impl AdaptiveOptimizer {
    #[must_use]
    pub fn new(settings: OptimizerSettings, tier: DeviceTier) -> Self {
        Self {
            samples: RollingAverage::new(settings.sample_capacity),
            sleep_samples: RollingAverage::new(settings.sample_capacity),
            quality: tier.initial_quality(),
            sleep_thresholds: settings.initial_sleep_thresholds,
            tier,
            settings,
        }
    }

    /// Forget every sample and restart from the tier's initial quality.
    pub fn reset(&mut self, tier: DeviceTier) {
        self.samples.clear();
        self.sleep_samples.clear();
        self.tier = tier;
        self.quality = tier.initial_quality();
        self.sleep_thresholds = self.settings.initial_sleep_thresholds;
    }

    #[must_use]
    pub const fn quality(&self) -> QualityLevel {
        self.quality
    }

    #[must_use]
    pub const fn tier(&self) -> DeviceTier {
        self.tier
    }

    /// Change the ceiling. A level above it is brought down on the next decision.
    pub fn set_tier(&mut self, tier: DeviceTier) {
        self.tier = tier;
    }

    #[must_use]
    pub const fn sleep_thresholds(&self) -> SleepThresholds {
        self.sleep_thresholds
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    /// Frames per second over the quality window, once it holds enough samples.
    #[must_use]
    pub fn fps(&self) -> Option<f64> {
        self.window_fps(&self.samples)
    }

    fn window_fps(&self, window: &RollingAverage) -> Option<f64> {
        if window.len() < self.settings.min_samples {
            return None;
        }
        window.mean().filter(|ms| *ms > 0.0).map(|ms| 1000.0 / ms)
    }

    /// Feed one frame duration in milliseconds.
    pub fn record_frame(&mut self, frame_ms: f64) -> OptimizerDecision {
        if !self.settings.enabled || !frame_ms.is_finite() || frame_ms <= 0.0 {
            return OptimizerDecision::default();
        }
        self.samples.push(frame_ms);
        self.sleep_samples.push(frame_ms);
        OptimizerDecision {
            quality: self.decide_quality(),
            sleep_thresholds: self.decide_sleep(),
        }
    }

    fn decide_quality(&mut self) -> Option<QualityLevel> {
        let fps = self.fps()?;
        let target = f64::from(self.settings.target_fps);
        let next = if !self.tier.allows(self.quality) {
            self.quality.step_down()
        } else if fps < target * f64::from(self.settings.downgrade_ratio) {
            self.quality.step_down()
        } else if fps > target * f64::from(self.settings.upgrade_ratio)
            && self.tier.allows(self.quality.step_up())
        {
            self.quality.step_up()
        } else {
            self.quality
        };
        if next == self.quality {
            return None;
        }
        debug!(
            "duophys: optimizer {} -> {next} at {fps:.1} fps",
            self.quality
        );
        self.quality = next;
        self.samples.clear();
        Some(next)
    }

    fn decide_sleep(&mut self) -> Option<SleepThresholds> {
        let fps = self.window_fps(&self.sleep_samples)?;
        let target = f64::from(self.settings.target_fps);
        let factor = if fps < target * f64::from(self.settings.sleep_widen_below) {
            self.settings.sleep_widen_factor
        } else if fps > target * f64::from(self.settings.sleep_narrow_above) {
            self.settings.sleep_narrow_factor
        } else {
            return None;
        };
        let thresholds =
            self.sleep_thresholds
                .scaled(factor, self.settings.sleep_min, self.settings.sleep_max);
        if thresholds == self.sleep_thresholds {
            return None;
        }
        self.sleep_thresholds = thresholds;
        Some(thresholds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn optimizer(tier: DeviceTier) -> AdaptiveOptimizer {
        AdaptiveOptimizer::new(OptimizerSettings::default(), tier)
    }

    fn feed(opt: &mut AdaptiveOptimizer, ms: f64, frames: usize) -> Vec<OptimizerDecision> {
        (0..frames).map(|_| opt.record_frame(ms)).collect()
    }

    #[test]
    fn no_decision_before_min_samples() {
        let mut opt = optimizer(DeviceTier::High);
        let decisions = feed(&mut opt, 100.0, 9);
        assert!(decisions.iter().all(OptimizerDecision::is_empty));
        assert!(opt.fps().is_none());
    }

    #[test]
    fn slow_frames_step_down_once_per_window() {
        let mut opt = optimizer(DeviceTier::High);
        let decisions = feed(&mut opt, 1000.0 / 30.0, 10);
        assert_eq!(decisions[9].quality, Some(QualityLevel::Medium));
        // The window restarted, so the next nine frames decide nothing.
        let decisions = feed(&mut opt, 1000.0 / 30.0, 9);
        assert!(decisions.iter().all(|d| d.quality.is_none()));
        let decisions = feed(&mut opt, 1000.0 / 30.0, 1);
        assert_eq!(decisions[0].quality, Some(QualityLevel::Low));
    }

    #[test]
    fn fifteen_percent_slow_steps_down_without_bouncing() {
        let mut opt = optimizer(DeviceTier::High);
        let frame_ms = 1000.0 / (60.0 * 0.85);
        let changes: Vec<(usize, QualityLevel)> = feed(&mut opt, frame_ms, 40)
            .iter()
            .enumerate()
            .filter_map(|(frame, d)| d.quality.map(|q| (frame, q)))
            .collect();
        assert_eq!(
            changes,
            vec![(9, QualityLevel::Medium), (19, QualityLevel::Low)]
        );
        assert!(changes.windows(2).all(|w| w[1].1 < w[0].1));
        assert_eq!(opt.quality(), QualityLevel::Low);
    }

    #[test]
    fn sustained_load_widens_sleep_every_frame() {
        let mut opt = optimizer(DeviceTier::High);
        let widened: Vec<usize> = feed(&mut opt, 1000.0 / 30.0, 30)
            .iter()
            .enumerate()
            .filter_map(|(frame, d)| d.sleep_thresholds.map(|_| frame))
            .collect();
        // 0.1 * 1.1^12 passes the 0.3 cap on the twelfth widening.
        assert_eq!(widened, (9..=20).collect::<Vec<_>>());
        assert_relative_eq!(opt.sleep_thresholds().linear, 0.3);
        assert_eq!(opt.quality(), QualityLevel::Low);
    }

    #[test]
    fn steady_target_fps_holds_quality() {
        let mut opt = optimizer(DeviceTier::Medium);
        let decisions = feed(&mut opt, 1000.0 / 60.0, 40);
        assert!(decisions.iter().all(|d| d.quality.is_none()));
        assert_eq!(opt.quality(), QualityLevel::Medium);
    }

    #[test]
    fn low_tier_is_never_promoted_to_high() {
        let mut opt = optimizer(DeviceTier::Low);
        feed(&mut opt, 5.0, 100);
        assert_eq!(opt.quality(), QualityLevel::Medium);
    }

    #[test]
    fn sleep_thresholds_stay_within_bounds() {
        let mut opt = optimizer(DeviceTier::Low);
        feed(&mut opt, 200.0, 200);
        assert_relative_eq!(opt.sleep_thresholds().linear, 0.3);

        feed(&mut opt, 1.0, 400);
        assert_relative_eq!(opt.sleep_thresholds().linear, 0.05);
    }

    #[test]
    fn disabled_optimizer_ignores_frames() {
        let mut opt = optimizer(DeviceTier::High);
        opt.set_enabled(false);
        feed(&mut opt, 500.0, 50);
        assert_eq!(opt.quality(), QualityLevel::High);
        assert!(opt.fps().is_none());
    }
}
