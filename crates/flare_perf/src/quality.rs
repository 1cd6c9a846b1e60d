//! # Adaptive Quality
//!
//! A continuous quality scalar steered by the ratio of actual to budgeted
//! frame time. The ratio is smoothed with an exponential moving average;
//! above `decrease_above` the scalar steps down, below `increase_below` it
//! steps up. Changes smaller than the hysteresis threshold are not applied.

use crate::config::AdaptiveQualityConfig;

/// Continuous quality controller.
#[derive(Debug, Clone)]
pub struct AdaptiveQuality {
    config: AdaptiveQualityConfig,
    scalar: f32,
    smoothed_ratio: Option<f32>,
    adjustments: u64,
}

impl AdaptiveQuality {
    /// Controller starting at full quality.
    #[must_use]
    pub fn new(config: AdaptiveQualityConfig) -> Self {
        Self {
            scalar: config.max_quality,
            config,
            smoothed_ratio: None,
            adjustments: 0,
        }
    }

    /// Feeds one frame. Returns the new scalar when it changed.
    pub fn sample(&mut self, frame_ms: f32, budget_ms: f32) -> Option<f32> {
        if !frame_ms.is_finite() || !budget_ms.is_finite() || budget_ms <= 0.0 || frame_ms < 0.0 {
            return None;
        }

        let ratio = frame_ms / budget_ms;
        let smoothed = match self.smoothed_ratio {
            Some(prev) => prev + self.config.smoothing * (ratio - prev),
            None => ratio,
        };
        self.smoothed_ratio = Some(smoothed);

        let proposed = if smoothed > self.config.decrease_above {
            self.scalar - self.config.step
        } else if smoothed < self.config.increase_below {
            self.scalar + self.config.step
        } else {
            return None;
        };
        let proposed = proposed.clamp(self.config.min_quality, self.config.max_quality);

        if (proposed - self.scalar).abs() < self.config.hysteresis {
            return None;
        }
        self.scalar = proposed;
        self.adjustments += 1;
        Some(proposed)
    }

    /// Current scalar.
    #[must_use]
    pub const fn scalar(&self) -> f32 {
        self.scalar
    }

    /// Smoothed frame-time ratio, once a frame has been seen.
    #[must_use]
    pub const fn smoothed_ratio(&self) -> Option<f32> {
        self.smoothed_ratio
    }

    /// Changes applied so far.
    #[must_use]
    pub const fn adjustments(&self) -> u64 {
        self.adjustments
    }

    /// Back to full quality, smoothing forgotten.
    pub fn reset(&mut self) {
        self.scalar = self.config.max_quality;
        self.smoothed_ratio = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: f32 = 1000.0 / 60.0;

    fn controller() -> AdaptiveQuality {
        AdaptiveQuality::new(AdaptiveQualityConfig {
            smoothing: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_steps_down_when_slow() {
        let mut quality = controller();
        assert_eq!(quality.sample(BUDGET * 2.0, BUDGET), Some(0.95));
        assert_eq!(quality.adjustments(), 1);
    }

    #[test]
    fn test_no_change_inside_band() {
        let mut quality = controller();
        quality.sample(BUDGET * 2.0, BUDGET);
        let before = quality.scalar();
        for ratio in [0.81, 1.0, 1.19, 0.9] {
            assert_eq!(quality.sample(BUDGET * ratio, BUDGET), None);
        }
        assert!((quality.scalar() - before).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stays_in_bounds() {
        let config = AdaptiveQualityConfig::default();
        let mut quality = AdaptiveQuality::new(config.clone());
        let samples = [5.0, 0.1, 3.0, 3.0, 0.0, 9.0, 0.2, 4.0];
        for i in 0..500 {
            let ratio = samples[i % samples.len()] * if i % 97 < 50 { 1.0 } else { 0.1 };
            quality.sample(BUDGET * ratio, BUDGET);
            assert!(quality.scalar() >= config.min_quality);
            assert!(quality.scalar() <= config.max_quality);
        }
        for _ in 0..100 {
            quality.sample(BUDGET * 10.0, BUDGET);
        }
        assert!((quality.scalar() - config.min_quality).abs() < 1e-4);
    }

    #[test]
    fn test_hysteresis_blocks_tiny_steps() {
        let mut quality = AdaptiveQuality::new(AdaptiveQualityConfig {
            smoothing: 1.0,
            max_quality: 1.0,
            ..Default::default()
        });
        quality.sample(BUDGET * 2.0, BUDGET);
        quality.sample(BUDGET * 0.5, BUDGET);
        assert!((quality.scalar() - 1.0).abs() < 1e-6);
        // Already at the ceiling: the clamped step is zero.
        assert_eq!(quality.sample(BUDGET * 0.5, BUDGET), None);
    }

    #[test]
    fn test_smoothing_lags() {
        let mut quality = AdaptiveQuality::new(AdaptiveQualityConfig {
            smoothing: 0.25,
            ..Default::default()
        });
        quality.sample(BUDGET, BUDGET);
        // 1.0 + 0.25 * (2.0 - 1.0) = 1.25 crosses the band on the first slow frame.
        assert!(quality.sample(BUDGET * 2.0, BUDGET).is_some());
        assert!((quality.smoothed_ratio().unwrap() - 1.25).abs() < 1e-5);
    }

    #[test]
    fn test_ignores_bad_samples() {
        let mut quality = controller();
        assert_eq!(quality.sample(f32::NAN, BUDGET), None);
        assert_eq!(quality.sample(10.0, 0.0), None);
        assert!(quality.smoothed_ratio().is_none());
    }
}
