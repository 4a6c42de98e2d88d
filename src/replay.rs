//! Drives a [`MeasurementSession`] over a recorded trace.

use crate::data_loading::Trace;
use crate::error::{FailureKind, SessionError};
use crate::output::Report;
use crate::profile::SignalProfile;
use crate::session::{MeasurementSession, SessionState};
use crate::thermal::prepare_calibration;
use chrono::Utc;
use log::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Log each new live estimate.
    pub live: bool,
    /// Stop feeding at this offset and force-end instead of finishing.
    pub force_end_ms: Option<u32>,
}

pub fn replay(trace: &Trace, profile: &SignalProfile, options: ReplayOptions) -> Report {
    let mut session = MeasurementSession::new(profile.clone());
    let mut last_live = 0;

    for sample in &trace.samples {
        if options.force_end_ms.is_some_and(|end| sample.t_offset_ms > end) {
            break;
        }
        match session.push_sample(sample.value, sample.t_offset_ms) {
            Ok(()) => {}
            Err(SessionError::Sample(e)) => {
                warn!("{}: skipping sample: {}", trace.path.display(), e);
                continue;
            }
            Err(e) => {
                warn!("{}: {}", trace.path.display(), e);
                break;
            }
        }

        if options.live {
            if let Some(live) = session.request_live_estimate() {
                if live.sample_count != last_live {
                    last_live = live.sample_count;
                    info!(
                        "[live {} ms] rate {:?}, strength {}, {} peaks",
                        sample.t_offset_ms, live.rate, live.signal_strength, live.peaks
                    );
                }
            }
        }
    }

    let outcome = if options.force_end_ms.is_some() {
        session.force_end()
    } else {
        session.finish()
    };
    let mut detail = None;
    let (result, failure) = match outcome {
        Ok(result) => (Some(result), None),
        Err(SessionError::Failed(kind)) => (None, Some(kind)),
        Err(SessionError::Terminated) => match session.state() {
            SessionState::Failed(kind) => (None, Some(*kind)),
            _ => (None, None),
        },
        Err(e @ SessionError::TooEarly { .. }) => {
            warn!("{}: force-end too early: {}", trace.path.display(), e);
            detail = Some(format!("too early: {}", e));
            session.cancel();
            (None, Some(FailureKind::Cancelled))
        }
        Err(e) => {
            warn!("{}: {}", trace.path.display(), e);
            detail = Some(e.to_string());
            session.cancel();
            (None, Some(FailureKind::Cancelled))
        }
    };

    let calibration = if profile.name == "thermal" {
        match prepare_calibration(session.snapshot(), profile) {
            Ok(request) => Some(request),
            Err(kind) => {
                warn!("{}: no calibration request: {}", trace.path.display(), kind);
                None
            }
        }
    } else {
        None
    };

    Report {
        recorded_at: Utc::now(),
        source: trace.path.display().to_string(),
        profile: profile.name.clone(),
        sample_count: session.snapshot().len(),
        result,
        failure,
        detail,
        calibration,
    }
}
