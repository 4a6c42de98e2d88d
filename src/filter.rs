//! Causal filters applied ahead of peak detection.
//!
//! Both variants can be driven one sample at a time (live preview) or run
//! over a whole signal. A batch run always starts from zero state, so it never
//! sees what the incremental path has accumulated.

use crate::profile::{FilterKind, SignalProfile};
use log::debug;
use sci_rs::signal::filter::{design::Sos, sosfilt_dyn};
use std::collections::VecDeque;
use std::fmt;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Biquad coefficients in second-order-section layout `[b0, b1, b2, 1, a1, a2]`.
type Section = [f64; 6];

#[derive(Debug, Clone, Copy)]
enum Response {
    LowPass,
    HighPass,
}

/// 2nd-order Butterworth section (Q = 1/sqrt(2)) via the bilinear transform.
fn butterworth_section(response: Response, cutoff_hz: f64, sample_rate_hz: f64) -> Section {
    let w0 = 2.0 * PI * cutoff_hz / sample_rate_hz;
    let cos_w0 = w0.cos();
    let alpha = w0.sin() / (2.0 * FRAC_1_SQRT_2);
    let a0 = 1.0 + alpha;

    let (b0, b1, b2) = match response {
        Response::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
        Response::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
    };

    [
        b0 / a0,
        b1 / a0,
        b2 / a0,
        1.0,
        -2.0 * cos_w0 / a0,
        (1.0 - alpha) / a0,
    ]
}

fn to_sos(sections: &[Section]) -> Vec<Sos<f64>> {
    sections
        .iter()
        .map(|s| Sos::new([s[0], s[1], s[2]], [s[3], s[4], s[5]]))
        .collect()
}

/// High-pass at `low_hz` cascaded with low-pass at `high_hz`.
pub struct BandPass {
    sections: [Section; 2],
    state: Vec<Sos<f64>>,
    anchor: Option<f64>,
}

impl BandPass {
    pub fn new(low_hz: f64, high_hz: f64, sample_rate_hz: f64) -> Self {
        let sections = [
            butterworth_section(Response::HighPass, low_hz, sample_rate_hz),
            butterworth_section(Response::LowPass, high_hz, sample_rate_hz),
        ];
        debug!(
            "Band-pass {:.2}-{:.2} Hz at {:.1} Hz: sections {:?}",
            low_hz, high_hz, sample_rate_hz, sections
        );
        Self {
            state: to_sos(&sections),
            sections,
            anchor: None,
        }
    }

    /// Feed one sample. The first sample seen becomes the baseline anchor so
    /// a large DC level does not excite a start-up transient.
    pub fn process(&mut self, x: f64) -> f64 {
        let anchor = *self.anchor.get_or_insert(x);
        sosfilt_dyn(std::iter::once(x - anchor), &mut self.state)
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let Some(&anchor) = input.first() else {
            return Vec::new();
        };
        let mut fresh = to_sos(&self.sections);
        sosfilt_dyn(input.iter().map(|&x| x - anchor), &mut fresh)
    }

    pub fn reset(&mut self) {
        self.state = to_sos(&self.sections);
        self.anchor = None;
    }
}

impl fmt::Debug for BandPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandPass")
            .field("sections", &self.sections)
            .field("anchor", &self.anchor)
            .finish()
    }
}

/// Trailing moving average over the last `window_n` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window_n: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window_n: usize) -> Self {
        let window_n = window_n.max(1);
        Self {
            window_n,
            window: VecDeque::with_capacity(window_n),
            sum: 0.0,
        }
    }

    /// Edge samples average over whatever is available; nothing is zero padded.
    pub fn process(&mut self, x: f64) -> f64 {
        if self.window.len() == self.window_n {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(x);
        self.sum += x;
        self.sum / self.window.len() as f64
    }

    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut fresh = MovingAverage::new(self.window_n);
        input.iter().map(|&x| fresh.process(x)).collect()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
    }
}

/// Filter selected by a profile's [`FilterKind`].
#[derive(Debug)]
pub enum DigitalFilter {
    BandPass(BandPass),
    LowPass(MovingAverage),
}

impl DigitalFilter {
    pub fn from_profile(profile: &SignalProfile) -> Self {
        match profile.filter_kind {
            FilterKind::BandPass { low_hz, high_hz } => {
                DigitalFilter::BandPass(BandPass::new(low_hz, high_hz, profile.sample_rate_hz))
            }
            FilterKind::LowPass { window_n } => DigitalFilter::LowPass(MovingAverage::new(window_n)),
        }
    }

    /// Incremental path: advances this filter's own state.
    pub fn process(&mut self, x: f64) -> f64 {
        match self {
            DigitalFilter::BandPass(f) => f.process(x),
            DigitalFilter::LowPass(f) => f.process(x),
        }
    }

    /// Batch path: runs from zero state, output has the same length as `input`.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        match self {
            DigitalFilter::BandPass(f) => f.filter(input),
            DigitalFilter::LowPass(f) => f.filter(input),
        }
    }

    pub fn reset(&mut self) {
        match self {
            DigitalFilter::BandPass(f) => f.reset(),
            DigitalFilter::LowPass(f) => f.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq_hz: f64, sample_rate: f64, n: usize, offset: f64) -> Vec<f64> {
        (0..n)
            .map(|i| offset + (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt()
    }

    #[test]
    fn butterworth_sections_have_unity_gain_in_band() {
        // DC gain of the low-pass and Nyquist gain of the high-pass are 1.
        let lp = butterworth_section(Response::LowPass, 4.0, 30.0);
        assert_abs_diff_eq!(
            (lp[0] + lp[1] + lp[2]) / (1.0 + lp[4] + lp[5]),
            1.0,
            epsilon = 1e-12
        );
        let hp = butterworth_section(Response::HighPass, 0.5, 30.0);
        assert_abs_diff_eq!(
            (hp[0] - hp[1] + hp[2]) / (1.0 - hp[4] + hp[5]),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn band_pass_keeps_length_and_passes_heart_band() {
        let filter = BandPass::new(0.5, 4.0, 30.0);
        let input = sine(1.2, 30.0, 900, 200.0);
        let output = filter.filter(&input);
        assert_eq!(output.len(), input.len());

        // Past the start-up, the 1.2 Hz component survives almost unattenuated.
        let settled = &output[300..];
        assert!(rms(settled) > 0.6, "rms {}", rms(settled));
        assert!(rms(settled) < 0.8, "rms {}", rms(settled));
    }

    #[test]
    fn band_pass_rejects_dc_and_high_frequency() {
        let filter = BandPass::new(0.5, 4.0, 30.0);
        let flat = filter.filter(&vec![180.0; 300]);
        assert!(flat.iter().all(|&y| y.abs() < 1e-9));

        let hiss = filter.filter(&sine(12.0, 30.0, 600, 0.0));
        assert!(rms(&hiss[300..]) < 0.1);
    }

    #[test]
    fn band_pass_batch_matches_fresh_incremental_run() {
        let input = sine(1.2, 30.0, 200, 150.0);
        let mut incremental = BandPass::new(0.5, 4.0, 30.0);
        let streamed: Vec<f64> = input.iter().map(|&x| incremental.process(x)).collect();
        let batch = incremental.filter(&input);
        for (a, b) in streamed.iter().zip(&batch) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn batch_run_ignores_incremental_state() {
        let input = sine(1.0, 30.0, 120, 10.0);
        let mut dirty = DigitalFilter::from_profile(&SignalProfile::pulse());
        let clean = DigitalFilter::from_profile(&SignalProfile::pulse());
        for x in sine(3.0, 30.0, 50, 90.0) {
            dirty.process(x);
        }
        assert_eq!(dirty.filter(&input), clean.filter(&input));
    }

    #[test]
    fn reset_restores_zero_state() {
        let mut filter = DigitalFilter::from_profile(&SignalProfile::pulse());
        let first: Vec<f64> = sine(1.0, 30.0, 40, 5.0).into_iter().map(|x| filter.process(x)).collect();
        filter.reset();
        let second: Vec<f64> = sine(1.0, 30.0, 40, 5.0).into_iter().map(|x| filter.process(x)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn moving_average_averages_available_edge_samples() {
        let filter = MovingAverage::new(3);
        let output = filter.filter(&[3.0, 6.0, 9.0, 12.0]);
        assert_eq!(output.len(), 4);
        assert_abs_diff_eq!(output[0], 3.0);
        assert_abs_diff_eq!(output[1], 4.5);
        assert_abs_diff_eq!(output[2], 6.0);
        assert_abs_diff_eq!(output[3], 9.0);
    }

    #[test]
    fn filtering_leaves_input_untouched() {
        let input = vec![1.0, 5.0, 2.0, 8.0];
        let copy = input.clone();
        let filter = DigitalFilter::from_profile(&SignalProfile::respiration());
        let _ = filter.filter(&input);
        assert_eq!(input, copy);
        assert!(filter.filter(&[]).is_empty());
    }
}
