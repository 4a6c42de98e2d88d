//! Per-modality signal profiles.
//!
//! The three sensing modalities run through the same pipeline and differ only
//! in the constants collected here. Profiles can be overridden from a JSON
//! file; anything loaded that way goes through [`SignalProfile::validate`].

use crate::error::ProfileError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    /// Butterworth-derived IIR band-pass for pulsatile signals.
    BandPass { low_hz: f64, high_hz: f64 },
    /// Trailing moving average for slow respiration/thermal signals.
    LowPass { window_n: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceParams {
    pub base: f64,
    /// Accepted intervals needed to add 1.0 to the score.
    pub scale: f64,
    pub max_cap: f64,
    /// Weight applied to the rejected / total interval ratio.
    #[serde(default)]
    pub rejection_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStatistic {
    Mean,
    Variance,
}

/// Ambient-noise baseline measured over the first samples of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoisePolicy {
    pub pre_roll_samples: usize,
    pub statistic: NoiseStatistic,
    pub threshold: f64,
    /// Fixed amount subtracted from confidence when the baseline is above threshold.
    pub penalty: f64,
}

/// Cadence and window of the provisional estimate computed while acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Recompute every `cadence` new samples.
    pub cadence: usize,
    pub min_samples: usize,
    /// Analyse only the last `n` samples; `None` analyses everything buffered.
    pub tail_window: Option<usize>,
    /// Raw-tail variance divisor for the 0-100 signal strength indicator.
    pub strength_divisor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalProfile {
    pub name: String,
    pub sample_rate_hz: f64,
    pub filter_kind: FilterKind,
    pub refractory_samples: usize,
    /// Peak threshold is `mean + threshold_k * std`.
    pub threshold_k: f64,
    /// Standard deviation below which a signal counts as flat.
    pub noise_floor: f64,
    pub valid_interval_ms: (f64, f64),
    pub valid_rate_range: (f64, f64),
    pub min_samples_for_result: usize,
    /// RMSSD/SDNN are only meaningful for pulsatile signals.
    pub compute_variability: bool,
    pub confidence: ConfidenceParams,
    #[serde(default)]
    pub noise: Option<NoisePolicy>,
    pub live: LiveConfig,
    pub max_duration_ms: u32,
    pub min_duration_ms: u32,
}

impl SignalProfile {
    /// Camera redness under flash, finger on lens.
    pub fn pulse() -> Self {
        Self {
            name: "pulse".to_string(),
            sample_rate_hz: 30.0,
            filter_kind: FilterKind::BandPass {
                low_hz: 0.5,
                high_hz: 4.0,
            },
            refractory_samples: 10,
            threshold_k: 0.5,
            noise_floor: 1e-3,
            valid_interval_ms: (400.0, 1500.0),
            valid_rate_range: (40.0, 150.0),
            min_samples_for_result: 15,
            compute_variability: true,
            confidence: ConfidenceParams {
                base: 0.4,
                scale: 20.0,
                max_cap: 0.95,
                rejection_weight: 0.1,
            },
            noise: None,
            live: LiveConfig {
                cadence: 5,
                min_samples: 15,
                tail_window: Some(150),
                strength_divisor: 5.0,
            },
            max_duration_ms: 120_000,
            min_duration_ms: 10_000,
        }
    }

    /// Microphone RMS amplitude, 0-100 scale, one value every 100 ms.
    pub fn respiration() -> Self {
        Self {
            name: "respiration".to_string(),
            sample_rate_hz: 10.0,
            filter_kind: FilterKind::LowPass { window_n: 15 },
            refractory_samples: 8,
            threshold_k: 0.3,
            noise_floor: 1e-3,
            valid_interval_ms: (1200.0, 10_000.0),
            valid_rate_range: (6.0, 50.0),
            min_samples_for_result: 20,
            compute_variability: false,
            confidence: ConfidenceParams {
                base: 0.3,
                scale: 8.0,
                max_cap: 0.9,
                rejection_weight: 0.1,
            },
            noise: Some(NoisePolicy {
                pre_roll_samples: 50,
                statistic: NoiseStatistic::Mean,
                threshold: 30.0,
                penalty: 0.15,
            }),
            live: LiveConfig {
                cadence: 10,
                min_samples: 30,
                tail_window: None,
                strength_divisor: 5.0,
            },
            max_duration_ms: 120_000,
            min_duration_ms: 15_000,
        }
    }

    /// Battery thermistor temperature while the screen rests on the skin.
    pub fn thermal() -> Self {
        Self {
            name: "thermal".to_string(),
            sample_rate_hz: 10.0,
            filter_kind: FilterKind::LowPass { window_n: 50 },
            refractory_samples: 100,
            threshold_k: 0.3,
            noise_floor: 1e-3,
            valid_interval_ms: (10_000.0, 120_000.0),
            valid_rate_range: (0.5, 6.0),
            min_samples_for_result: 300,
            compute_variability: false,
            confidence: ConfidenceParams {
                base: 0.35,
                scale: 10.0,
                max_cap: 0.9,
                rejection_weight: 0.1,
            },
            noise: Some(NoisePolicy {
                pre_roll_samples: 50,
                statistic: NoiseStatistic::Variance,
                threshold: 0.25,
                penalty: 0.1,
            }),
            live: LiveConfig {
                cadence: 10,
                min_samples: 100,
                tail_window: None,
                strength_divisor: 0.01,
            },
            max_duration_ms: 120_000,
            min_duration_ms: 30_000,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "pulse" => Some(Self::pulse()),
            "respiration" => Some(Self::respiration()),
            "thermal" => Some(Self::thermal()),
            _ => None,
        }
    }

    /// Load a profile from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, ProfileError> {
        let raw = fs::read_to_string(path)?;
        let profile: SignalProfile = serde_json::from_str(&raw)?;
        profile.validate()?;
        debug!("Loaded profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Buffer capacity in samples, with 25% headroom for frame-rate jitter.
    pub fn capacity(&self) -> usize {
        let nominal = (self.max_duration_ms as f64 * self.sample_rate_hz / 1000.0).ceil() as usize;
        nominal + nominal / 4 + 1
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let fail = |reason: String| {
            Err(ProfileError::Validation {
                profile: self.name.clone(),
                reason,
            })
        };

        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return fail(format!("sample rate {} Hz must be positive", self.sample_rate_hz));
        }
        match self.filter_kind {
            FilterKind::BandPass { low_hz, high_hz } => {
                if !(low_hz > 0.0 && low_hz < high_hz && high_hz < self.nyquist_hz()) {
                    return fail(format!(
                        "band {low_hz}-{high_hz} Hz must satisfy 0 < low < high < {} Hz",
                        self.nyquist_hz()
                    ));
                }
            }
            FilterKind::LowPass { window_n } => {
                if window_n == 0 {
                    return fail("moving-average window must hold at least one sample".into());
                }
            }
        }
        if self.refractory_samples == 0 {
            return fail("refractory spacing must be at least one sample".into());
        }
        let window_fits = self
            .refractory_samples
            .checked_mul(2)
            .is_some_and(|n| n < self.capacity());
        if !window_fits {
            return fail(format!(
                "refractory spacing {} leaves no room for a peak in {} samples",
                self.refractory_samples,
                self.capacity()
            ));
        }
        if self.min_samples_for_result == 0 {
            return fail("min_samples_for_result must be at least one sample".into());
        }
        if self.threshold_k < 0.0 || self.noise_floor < 0.0 {
            return fail("threshold_k and noise_floor must be non-negative".into());
        }

        let (iv_min, iv_max) = self.valid_interval_ms;
        let (rate_min, rate_max) = self.valid_rate_range;
        if !(iv_min > 0.0 && iv_min < iv_max) {
            return fail(format!("interval range {iv_min}-{iv_max} ms is inverted or empty"));
        }
        if !(rate_min > 0.0 && rate_min < rate_max) {
            return fail(format!("rate range {rate_min}-{rate_max} is inverted or empty"));
        }
        // The interval window is the rate window expressed in milliseconds.
        if (60_000.0 / rate_max - iv_min).abs() > 1.0 || (60_000.0 / rate_min - iv_max).abs() > 1.0 {
            return fail(format!(
                "interval range {iv_min}-{iv_max} ms does not match rate range {rate_min}-{rate_max}"
            ));
        }

        let c = &self.confidence;
        if !(c.scale > 0.0 && (0.0..=1.0).contains(&c.max_cap) && c.rejection_weight >= 0.0) {
            return fail("confidence needs scale > 0, max_cap in [0, 1], rejection_weight >= 0".into());
        }
        if let Some(noise) = &self.noise {
            if noise.pre_roll_samples == 0 || noise.penalty < 0.0 {
                return fail("noise policy needs a pre-roll and a non-negative penalty".into());
            }
        }
        if self.live.cadence == 0 || self.live.strength_divisor <= 0.0 {
            return fail("live cadence and strength divisor must be positive".into());
        }
        if self.live.min_samples == 0 || self.live.tail_window == Some(0) {
            return fail("live passes need a non-empty sample minimum and tail window".into());
        }
        if self.min_duration_ms > self.max_duration_ms {
            return fail("minimum duration exceeds maximum duration".into());
        }
        Ok(())
    }
}
