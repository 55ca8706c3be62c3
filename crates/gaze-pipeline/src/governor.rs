//! Adaptive working resolution
//!
//! Slow frames shrink the working image instead of being skipped.

use crate::config::ResolutionConfig;
use tracing::info;

/// Picks the downscale factor from recent processing times
#[derive(Debug, Clone)]
pub struct ResolutionGovernor {
    config: ResolutionConfig,
    scale: u32,
    over_budget: u32,
    under_budget: u32,
}

impl ResolutionGovernor {
    pub fn new(config: ResolutionConfig) -> Self {
        Self {
            config,
            scale: 1,
            over_budget: 0,
            under_budget: 0,
        }
    }

    /// Current downscale factor (1 = full resolution)
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Record one frame's processing time; returns the new factor when it changes
    pub fn record(&mut self, elapsed_ms: f64) -> Option<u32> {
        if !self.config.enabled {
            return None;
        }
        let budget = self.config.frame_budget_ms;

        if elapsed_ms > budget {
            self.under_budget = 0;
            self.over_budget += 1;
            if self.over_budget >= self.config.over_budget_frames && self.scale < self.config.max_scale {
                self.over_budget = 0;
                let previous = self.scale;
                self.scale = (self.scale * 2).min(self.config.max_scale);
                info!(
                    "Frame time {:.1}ms over {:.1}ms budget, working scale 1/{} -> 1/{}",
                    elapsed_ms, budget, previous, self.scale
                );
                return Some(self.scale);
            }
        } else if elapsed_ms < budget / 2.0 {
            self.over_budget = 0;
            self.under_budget += 1;
            if self.under_budget >= self.config.under_budget_frames && self.scale > 1 {
                self.under_budget = 0;
                let previous = self.scale;
                self.scale = (self.scale / 2).max(1);
                info!("Frame time recovered, working scale 1/{} -> 1/{}", previous, self.scale);
                return Some(self.scale);
            }
        } else {
            self.over_budget = 0;
            self.under_budget = 0;
        }
        None
    }

    pub fn reset(&mut self) {
        self.scale = 1;
        self.over_budget = 0;
        self.under_budget = 0;
    }
}

impl Default for ResolutionGovernor {
    fn default() -> Self {
        Self::new(ResolutionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scale_doubles_after_slow_frames() {
        let mut governor = ResolutionGovernor::default();
        assert_eq!(governor.record(40.0), None);
        assert_eq!(governor.record(40.0), None);
        assert_eq!(governor.record(40.0), Some(2));
        for _ in 0..2 {
            governor.record(50.0);
        }
        assert_eq!(governor.record(50.0), Some(4));
        // Capped at max_scale
        for _ in 0..10 {
            assert_eq!(governor.record(90.0), None);
        }
        assert_eq!(governor.scale(), 4);
    }

    #[test]
    fn test_single_slow_frame_ignored() {
        let mut governor = ResolutionGovernor::default();
        governor.record(40.0);
        governor.record(40.0);
        governor.record(20.0);
        assert_eq!(governor.record(40.0), None);
        assert_eq!(governor.scale(), 1);
    }

    #[test]
    fn test_scale_recovers_after_fast_frames() {
        let mut governor = ResolutionGovernor::default();
        for _ in 0..3 {
            governor.record(40.0);
        }
        assert_eq!(governor.scale(), 2);
        for _ in 0..29 {
            assert_eq!(governor.record(5.0), None);
        }
        assert_eq!(governor.record(5.0), Some(1));
        assert_eq!(governor.record(5.0), None);
    }

    #[test]
    fn test_disabled() {
        let mut governor = ResolutionGovernor::new(ResolutionConfig {
            enabled: false,
            ..Default::default()
        });
        for _ in 0..10 {
            assert_eq!(governor.record(100.0), None);
        }
        assert_eq!(governor.scale(), 1);
    }

    proptest! {
        #[test]
        fn test_scale_stays_within_limits(
            max_scale in 1u32..=8,
            over_budget_frames in 1u32..4,
            times in prop::collection::vec(0.0f64..100.0, 0..200),
        ) {
            let mut governor = ResolutionGovernor::new(ResolutionConfig {
                max_scale,
                over_budget_frames,
                under_budget_frames: 5,
                ..Default::default()
            });
            for elapsed in times {
                if let Some(scale) = governor.record(elapsed) {
                    prop_assert_eq!(scale, governor.scale());
                }
                prop_assert!(governor.scale() >= 1 && governor.scale() <= max_scale);
            }
        }
    }
}
