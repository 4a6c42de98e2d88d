//! Inputs for the external body-temperature model.
//!
//! The calibration itself happens outside this crate. This module only turns
//! a thermistor trace into the `{ trend, contact time, ambient }` triple the
//! model consumes, and defines the interface the model is called through.

use crate::buffer::{span_ms, values, Sample};
use crate::error::FailureKind;
use crate::filter::DigitalFilter;
use crate::preprocessing::mean;
use crate::profile::{FilterKind, SignalProfile};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    /// Smoothed thermistor reading at the end of contact.
    pub trend_value: f64,
    pub contact_time_s: f64,
    /// Reading before skin contact warmed the sensor.
    pub ambient_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResponse {
    pub estimated_value: f64,
    pub confidence: f64,
    pub interpretation: String,
}

/// Implemented by whatever owns the calibration model (usually a remote service).
pub trait TemperatureCalibrator {
    type Error: std::error::Error;

    fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, Self::Error>;
}

/// Build the calibration request from a captured thermistor trace.
///
/// The ambient value is the mean of the profile's pre-roll window (or the
/// first filter window when the profile has no noise policy).
pub fn prepare_calibration(
    samples: &[Sample],
    profile: &SignalProfile,
) -> Result<CalibrationRequest, FailureKind> {
    if samples.is_empty() || samples.len() < profile.min_samples_for_result {
        return Err(FailureKind::InsufficientSignal);
    }

    let raw = values(samples);
    let filtered = DigitalFilter::from_profile(profile).filter(&raw);

    let pre_roll = profile
        .noise
        .map(|policy| policy.pre_roll_samples)
        .unwrap_or(match profile.filter_kind {
            FilterKind::LowPass { window_n } => window_n,
            FilterKind::BandPass { .. } => 1,
        })
        .clamp(1, raw.len());
    let ambient_value = mean(&raw[..pre_roll]);

    let Some(&trend_value) = filtered.last() else {
        return Err(FailureKind::InsufficientSignal);
    };
    let request = CalibrationRequest {
        trend_value,
        contact_time_s: span_ms(samples) as f64 / 1000.0,
        ambient_value,
    };
    debug!("Thermal calibration request: {:?}", request);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::fmt;

    /// Warm-up curve from ambient 28 °C towards 36 °C.
    fn warming_trace(seconds: u32) -> Vec<Sample> {
        (0..seconds * 10)
            .map(|i| {
                let t = i as f64 / 10.0;
                let value = if i < 50 {
                    28.0
                } else {
                    36.0 - 8.0 * (-(t - 5.0) / 20.0).exp()
                };
                Sample {
                    value,
                    t_offset_ms: i * 100,
                }
            })
            .collect()
    }

    #[test]
    fn request_from_warming_trace() {
        let samples = warming_trace(90);
        let request = prepare_calibration(&samples, &SignalProfile::thermal()).unwrap();
        assert_abs_diff_eq!(request.ambient_value, 28.0);
        assert_abs_diff_eq!(request.contact_time_s, 89.9);
        assert!(request.trend_value > 35.5 && request.trend_value < 36.0);
    }

    #[test]
    fn short_trace_is_insufficient() {
        let samples = warming_trace(10);
        assert_eq!(
            prepare_calibration(&samples, &SignalProfile::thermal()),
            Err(FailureKind::InsufficientSignal)
        );
        assert_eq!(
            prepare_calibration(&[], &SignalProfile::thermal()),
            Err(FailureKind::InsufficientSignal)
        );
    }

    #[derive(Debug)]
    struct Offline;

    impl fmt::Display for Offline {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "calibration service offline")
        }
    }

    impl std::error::Error for Offline {}

    struct FixedOffset(Option<f64>);

    impl TemperatureCalibrator for FixedOffset {
        type Error = Offline;

        fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, Offline> {
            let offset = self.0.ok_or(Offline)?;
            Ok(CalibrationResponse {
                estimated_value: request.trend_value + offset,
                confidence: 0.5,
                interpretation: "normal".to_string(),
            })
        }
    }

    #[test]
    fn calibrator_errors_are_surfaced() {
        let request = CalibrationRequest {
            trend_value: 35.0,
            contact_time_s: 90.0,
            ambient_value: 25.0,
        };
        let response = FixedOffset(Some(1.5)).calibrate(&request).unwrap();
        assert_abs_diff_eq!(response.estimated_value, 36.5);
        assert!(FixedOffset(None).calibrate(&request).is_err());
    }
}
