//! Inter-peak intervals, outlier rejection, rate and variability.

use crate::peaks::PeakSet;
use crate::profile::SignalProfile;
use log::{debug, trace};
use serde::Serialize;

/// Represents the interval statistics of one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalResult {
    /// Events per minute, rounded; `None` with fewer than 2 accepted intervals.
    pub rate: Option<f64>,
    /// RMSSD in whole milliseconds (pulsatile profiles, 3+ accepted intervals).
    pub variability: Option<f64>,
    pub accepted_intervals: u32,
    pub rejected_intervals: u32,
    pub mean_interval_ms: Option<f64>,
    pub sdnn: Option<f64>,
    pub accepted_ms: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct IntervalAnalyzer {
    sample_rate_hz: f64,
    valid_interval_ms: (f64, f64),
    compute_variability: bool,
}

impl IntervalAnalyzer {
    pub fn new(sample_rate_hz: f64, valid_interval_ms: (f64, f64), compute_variability: bool) -> Self {
        Self {
            sample_rate_hz,
            valid_interval_ms,
            compute_variability,
        }
    }

    pub fn from_profile(profile: &SignalProfile) -> Self {
        Self::new(
            profile.sample_rate_hz,
            profile.valid_interval_ms,
            profile.compute_variability,
        )
    }

    pub fn analyze(&self, peaks: &PeakSet) -> IntervalResult {
        let intervals = calc_intervals(peaks.indices(), self.sample_rate_hz);
        self.analyze_intervals(&intervals)
    }

    /// Reject out-of-range intervals one by one and summarise the rest.
    pub fn analyze_intervals(&self, intervals_ms: &[f64]) -> IntervalResult {
        let (min_ms, max_ms) = self.valid_interval_ms;
        let (accepted, rejected): (Vec<f64>, Vec<f64>) = intervals_ms
            .iter()
            .copied()
            .partition(|&ms| ms >= min_ms && ms <= max_ms);

        if !rejected.is_empty() {
            debug!(
                "Rejected {} of {} intervals outside {:.0}-{:.0} ms: {:?}",
                rejected.len(),
                intervals_ms.len(),
                min_ms,
                max_ms,
                rejected
            );
        }

        let mean_interval_ms = if accepted.len() >= 2 {
            Some(accepted.iter().sum::<f64>() / accepted.len() as f64)
        } else {
            None
        };
        let rate = mean_interval_ms.map(|mean| (60_000.0 / mean).round());

        let (variability, sdnn) = if self.compute_variability {
            (rmssd(&accepted).map(f64::round), sdnn(&accepted))
        } else {
            (None, None)
        };

        trace!(
            "Intervals: accepted {:?}, rate {:?}, rmssd {:?}",
            accepted,
            rate,
            variability
        );

        IntervalResult {
            rate,
            variability,
            accepted_intervals: accepted.len() as u32,
            rejected_intervals: rejected.len() as u32,
            mean_interval_ms,
            sdnn,
            accepted_ms: accepted,
        }
    }
}

/// Convert consecutive peak indices to intervals in milliseconds.
pub fn calc_intervals(peaklist: &[usize], sample_rate_hz: f64) -> Vec<f64> {
    peaklist
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * 1000.0 / sample_rate_hz)
        .collect()
}

/// Root mean square of successive differences; needs at least 3 intervals.
pub fn rmssd(intervals_ms: &[f64]) -> Option<f64> {
    if intervals_ms.len() < 3 {
        return None;
    }
    let squared: Vec<f64> = intervals_ms
        .windows(2)
        .map(|w| (w[1] - w[0]).powi(2))
        .collect();
    Some((squared.iter().sum::<f64>() / squared.len() as f64).sqrt())
}

/// Standard deviation of the intervals themselves; needs at least 2.
pub fn sdnn(intervals_ms: &[f64]) -> Option<f64> {
    if intervals_ms.len() < 2 {
        return None;
    }
    Some(crate::preprocessing::calculate_stats(intervals_ms).1)
}
