use crate::preprocessing::{mean, variance};
use crate::profile::{ConfidenceParams, NoisePolicy, NoiseStatistic, SignalProfile};
use log::debug;

/// Heuristic reliability in `[0, max_cap]` from a session's own statistics.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    params: ConfidenceParams,
    noise: Option<NoisePolicy>,
}

impl ConfidenceScorer {
    pub fn new(params: ConfidenceParams, noise: Option<NoisePolicy>) -> Self {
        Self { params, noise }
    }

    pub fn from_profile(profile: &SignalProfile) -> Self {
        Self::new(profile.confidence, profile.noise)
    }

    /// Ambient-noise baseline over the pre-roll (first samples) of the raw signal.
    pub fn noise_baseline(&self, raw: &[f64]) -> Option<f64> {
        let policy = self.noise?;
        if raw.is_empty() {
            return None;
        }
        let pre_roll = &raw[..policy.pre_roll_samples.min(raw.len())];
        Some(match policy.statistic {
            NoiseStatistic::Mean => mean(pre_roll),
            NoiseStatistic::Variance => variance(pre_roll),
        })
    }

    pub fn score(&self, accepted: u32, rejected: u32, noise_baseline: Option<f64>) -> f64 {
        let p = &self.params;
        let mut raw = p.base + accepted as f64 / p.scale;

        let total = accepted + rejected;
        if total > 0 {
            raw -= p.rejection_weight * rejected as f64 / total as f64;
        }

        if let (Some(policy), Some(baseline)) = (self.noise, noise_baseline) {
            if baseline > policy.threshold {
                debug!(
                    "Noise baseline {:.2} above {:.2}, confidence penalty {:.2}",
                    baseline, policy.threshold, policy.penalty
                );
                raw -= policy.penalty;
            }
        }

        raw.clamp(0.0, p.max_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn pulse_confidence_grows_then_caps() {
        let scorer = ConfidenceScorer::from_profile(&SignalProfile::pulse());
        assert_abs_diff_eq!(scorer.score(0, 0, None), 0.4);
        assert_abs_diff_eq!(scorer.score(10, 0, None), 0.9);
        assert_abs_diff_eq!(scorer.score(40, 0, None), 0.95);
    }

    #[test]
    fn rejected_intervals_cost_confidence() {
        let scorer = ConfidenceScorer::from_profile(&SignalProfile::pulse());
        // 4 accepted, 4 rejected: 0.4 + 0.2 - 0.1 * 0.5
        assert_abs_diff_eq!(scorer.score(4, 4, None), 0.55, epsilon = 1e-12);
    }

    #[test]
    fn noisy_pre_roll_is_penalised() {
        let scorer = ConfidenceScorer::from_profile(&SignalProfile::respiration());
        let quiet: Vec<f64> = vec![10.0; 60];
        let loud: Vec<f64> = vec![45.0; 60];
        let quiet_baseline = scorer.noise_baseline(&quiet);
        let loud_baseline = scorer.noise_baseline(&loud);
        assert_eq!(quiet_baseline, Some(10.0));
        assert_eq!(loud_baseline, Some(45.0));

        let clean = scorer.score(3, 0, quiet_baseline);
        let noisy = scorer.score(3, 0, loud_baseline);
        assert_abs_diff_eq!(clean - noisy, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn pre_roll_uses_only_leading_samples() {
        let scorer = ConfidenceScorer::from_profile(&SignalProfile::thermal());
        let mut raw = vec![30.0; 50];
        raw.extend(std::iter::repeat(36.0).take(200));
        assert_eq!(scorer.noise_baseline(&raw), Some(0.0));
        assert_eq!(scorer.noise_baseline(&[]), None);
    }

    #[test]
    fn pulse_profile_has_no_noise_baseline() {
        let scorer = ConfidenceScorer::from_profile(&SignalProfile::pulse());
        assert_eq!(scorer.noise_baseline(&[1.0, 2.0]), None);
    }

    #[test]
    fn never_leaves_unit_interval() {
        let params = ConfidenceParams {
            base: 0.0,
            scale: 8.0,
            max_cap: 0.9,
            rejection_weight: 1.0,
        };
        let noise = NoisePolicy {
            pre_roll_samples: 5,
            statistic: NoiseStatistic::Mean,
            threshold: 0.0,
            penalty: 0.5,
        };
        let scorer = ConfidenceScorer::new(params, Some(noise));
        assert_eq!(scorer.score(0, 10, Some(1.0)), 0.0);
    }

    proptest! {
        #[test]
        fn monotonic_in_accepted_intervals(
            accepted in 0u32..200,
            extra in 0u32..50,
            rejected in 0u32..50,
            baseline in prop::option::of(0.0f64..100.0),
        ) {
            for profile in [SignalProfile::pulse(), SignalProfile::respiration(), SignalProfile::thermal()] {
                let scorer = ConfidenceScorer::from_profile(&profile);
                let lower = scorer.score(accepted, rejected, baseline);
                let higher = scorer.score(accepted + extra, rejected, baseline);
                prop_assert!(higher >= lower);
                prop_assert!((0.0..=1.0).contains(&higher));
            }
        }
    }
}
