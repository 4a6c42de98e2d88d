//! Adaptive-threshold peak detection with refractory spacing.

use crate::preprocessing::calculate_stats;
use crate::profile::SignalProfile;
use log::{debug, trace};

/// Strictly increasing sample indices; neighbours are at least the
/// detector's refractory spacing apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakSet(Vec<usize>);

impl PeakSet {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PeakDetector {
    refractory_samples: usize,
    threshold_k: f64,
    noise_floor: f64,
}

impl PeakDetector {
    pub fn new(refractory_samples: usize, threshold_k: f64, noise_floor: f64) -> Self {
        Self {
            refractory_samples: refractory_samples.max(1),
            threshold_k,
            noise_floor,
        }
    }

    pub fn from_profile(profile: &SignalProfile) -> Self {
        Self::new(
            profile.refractory_samples,
            profile.threshold_k,
            profile.noise_floor,
        )
    }

    pub fn refractory_samples(&self) -> usize {
        self.refractory_samples
    }

    /// Find peaks above `mean + k * std` that dominate their refractory window.
    ///
    /// Equal values resolve to the earliest index. The first and last
    /// `refractory_samples` indices never qualify since their window is
    /// incomplete. A flat signal yields no peaks.
    pub fn detect(&self, signal: &[f64]) -> PeakSet {
        let r = self.refractory_samples;
        let window = r.checked_mul(2).and_then(|n| n.checked_add(1));
        if window.map_or(true, |w| signal.len() < w) {
            trace!("Signal of {} samples too short for window {}", signal.len(), r);
            return PeakSet::default();
        }

        let (mean, std) = calculate_stats(signal);
        if std < self.noise_floor {
            debug!("Signal std {:.2e} below noise floor {:.2e}", std, self.noise_floor);
            return PeakSet::default();
        }
        let threshold = mean + self.threshold_k * std;

        let peaks: Vec<usize> = (r..signal.len() - r)
            .filter(|&i| {
                let v = signal[i];
                v > threshold
                    && signal[i - r..i].iter().all(|&before| before < v)
                    && signal[i + 1..=i + r].iter().all(|&after| after <= v)
            })
            .collect();

        debug!(
            "Peak threshold {:.3} (mean {:.3}, std {:.3}): {} peaks",
            threshold,
            mean,
            std,
            peaks.len()
        );
        PeakSet(peaks)
    }
}
