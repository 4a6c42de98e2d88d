//! Batch analysis: filter → peaks → intervals → confidence.

use crate::buffer::{values, Sample};
use crate::confidence::ConfidenceScorer;
use crate::error::FailureKind;
use crate::filter::DigitalFilter;
use crate::intervals::{IntervalAnalyzer, IntervalResult};
use crate::peaks::{PeakDetector, PeakSet};
use crate::profile::SignalProfile;
use crate::MeasurementResult;
use log::{debug, info};

/// The full estimation chain for one profile.
///
/// Every [`Pipeline::run`] builds its filter output from zero state, so two
/// runs over the same samples give the same result.
#[derive(Debug)]
pub struct Pipeline {
    min_samples: usize,
    filter: DigitalFilter,
    detector: PeakDetector,
    analyzer: IntervalAnalyzer,
    scorer: ConfidenceScorer,
}

impl Pipeline {
    pub fn new(profile: &SignalProfile) -> Self {
        Self {
            min_samples: profile.min_samples_for_result,
            filter: DigitalFilter::from_profile(profile),
            detector: PeakDetector::from_profile(profile),
            analyzer: IntervalAnalyzer::from_profile(profile),
            scorer: ConfidenceScorer::from_profile(profile),
        }
    }

    /// Peaks and interval statistics of an already filtered signal.
    pub fn estimate(&self, filtered: &[f64]) -> (PeakSet, IntervalResult) {
        let peaks = self.detector.detect(filtered);
        let intervals = self.analyzer.analyze(&peaks);
        (peaks, intervals)
    }

    pub fn run(&self, samples: &[Sample]) -> Result<MeasurementResult, FailureKind> {
        if samples.is_empty() || samples.len() < self.min_samples {
            debug!(
                "Only {} samples, need {}",
                samples.len(),
                self.min_samples
            );
            return Err(FailureKind::InsufficientSignal);
        }

        let raw = values(samples);
        let filtered = self.filter.filter(&raw);
        let (peaks, intervals) = self.estimate(&filtered);

        if peaks.is_empty() {
            return Err(FailureKind::NoPeaksDetected);
        }
        let Some(rate) = intervals.rate else {
            debug!(
                "{} peaks but only {} accepted intervals",
                peaks.len(),
                intervals.accepted_intervals
            );
            return Err(FailureKind::InsufficientSignal);
        };

        let confidence = self.scorer.score(
            intervals.accepted_intervals,
            intervals.rejected_intervals,
            self.scorer.noise_baseline(&raw),
        );

        info!(
            "Rate {} from {} peaks ({} accepted / {} rejected intervals), variability {:?}, confidence {:.2}",
            rate,
            peaks.len(),
            intervals.accepted_intervals,
            intervals.rejected_intervals,
            intervals.variability,
            confidence
        );

        Ok(MeasurementResult {
            rate,
            variability: intervals.variability,
            confidence,
            sample_count: samples.len() as u32,
        })
    }
}

/// One-shot convenience over [`Pipeline::run`].
pub fn analyze(samples: &[Sample], profile: &SignalProfile) -> Result<MeasurementResult, FailureKind> {
    Pipeline::new(profile).run(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64], sample_rate_hz: f64) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                value,
                t_offset_ms: (i as f64 * 1000.0 / sample_rate_hz) as u32,
            })
            .collect()
    }

    #[test]
    fn too_few_samples_short_circuits() {
        let profile = SignalProfile::pulse();
        let short = samples(&[1.0; 14], 30.0);
        assert_eq!(analyze(&short, &profile), Err(FailureKind::InsufficientSignal));
    }

    #[test]
    fn empty_capture_is_insufficient_even_without_minimum() {
        let mut profile = SignalProfile::pulse();
        profile.min_samples_for_result = 0;
        assert_eq!(analyze(&[], &profile), Err(FailureKind::InsufficientSignal));
    }

    #[test]
    fn flat_signal_reports_no_peaks() {
        let profile = SignalProfile::pulse();
        let flat = samples(&[0.0; 100], 30.0);
        assert_eq!(analyze(&flat, &profile), Err(FailureKind::NoPeaksDetected));
    }

    #[test]
    fn single_peak_is_insufficient() {
        let profile = SignalProfile::respiration();
        let mut values = vec![0.0; 60];
        values[30] = 20.0;
        assert_eq!(
            analyze(&samples(&values, 10.0), &profile),
            Err(FailureKind::InsufficientSignal)
        );
    }
}
